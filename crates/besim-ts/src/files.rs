//! File-level aggregation driver.
//!
//! Filenames encode provenance: a base semi-wide table
//! `base_<scope>_<freq>.parquet` aggregates to
//! `base_<scope>_<target>_from_<source>.parquet`; a comparison table
//! `var_<name>_<units>_<freq>_b<id>.parquet` aggregates to
//! `var_<name>_<units>_<target>_from_<source>_b<id>.parquet`. Outputs are
//! written to a temporary file and renamed on completion, so a cancelled
//! run leaves no partial output, and `skip_existing` makes re-runs no-ops.

use anyhow::{anyhow, bail, Context, Result};
use besim_core::Frequency;
use polars::prelude::*;
use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::freq::detect_frequency;
use crate::longpath::aggregate_comparison;
use crate::rules::{AggregationRules, VariableSelection};
use crate::semiwide::aggregate_semi_wide;

pub fn read_frame(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    match extension.as_str() {
        #[cfg(feature = "parquet")]
        "parquet" => ParquetReader::new(&mut file)
            .finish()
            .context("reading Parquet file"),
        #[cfg(not(feature = "parquet"))]
        "parquet" => Err(anyhow!(
            "parquet support is disabled; rebuild with the 'parquet' feature"
        )),
        "csv" => CsvReader::new(&mut file)
            .has_header(true)
            .finish()
            .context("reading CSV file"),
        _ => Err(anyhow!(
            "unsupported file extension '{}'; use .csv or .parquet",
            extension
        )),
    }
}

/// Write via `<name>.tmp` and atomic rename.
pub fn write_frame_atomic(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating '{}'", parent.display()))?;
    }
    let staged = path.with_extension("tmp");
    {
        let mut file = File::create(&staged)
            .with_context(|| format!("creating {}", staged.display()))?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            #[cfg(feature = "parquet")]
            "parquet" => {
                ParquetWriter::new(&mut file)
                    .finish(df)
                    .map(|_| ())
                    .context("writing Parquet file")?;
            }
            #[cfg(not(feature = "parquet"))]
            "parquet" => {
                bail!("parquet support is disabled; rebuild with the 'parquet' feature")
            }
            "csv" => {
                CsvWriter::new(&mut file)
                    .finish(df)
                    .context("writing CSV file")?;
            }
            _ => bail!(
                "unsupported output extension for {}; use .csv or .parquet",
                path.display()
            ),
        }
    }
    fs::rename(&staged, path)
        .with_context(|| format!("renaming {} into place", staged.display()))?;
    Ok(())
}

/// Aggregate one base semi-wide file to `target`. Returns the output path,
/// or `None` when skipped (derived input, existing output, or no rows
/// selected).
pub fn process_base_file(
    path: &Path,
    target: Frequency,
    rules: &AggregationRules,
    selection: &VariableSelection,
    skip_existing: bool,
) -> Result<Option<PathBuf>> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("bad base file name '{}'", path.display()))?;
    if stem.contains("_from_") {
        debug!("skipping derived base file {stem}");
        return Ok(None);
    }
    let scope = if stem.contains("selected") { "selected" } else { "all" };

    let df = read_frame(path)?;
    let source = stem_frequency(stem)
        .or_else(|| detect_frequency(&df))
        .ok_or_else(|| anyhow!("cannot detect source frequency of '{}'", path.display()))?;
    if !target.is_strictly_coarser_than(source) {
        return Ok(None);
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("parquet");
    let output = path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!("base_{scope}_{target}_from_{source}.{extension}"));
    if skip_existing && output.exists() {
        info!("skipping existing {}", output.display());
        return Ok(None);
    }

    let mut aggregated = aggregate_semi_wide(&df, source, target, rules, selection)?;
    if aggregated.height() == 0 {
        debug!("no variables selected in {}", path.display());
        return Ok(None);
    }
    write_frame_atomic(&mut aggregated, &output)?;
    info!("created {}", output.display());
    Ok(Some(output))
}

fn stem_frequency(stem: &str) -> Option<Frequency> {
    for frequency in [
        Frequency::Timestep,
        Frequency::Hourly,
        Frequency::Daily,
        Frequency::Monthly,
        Frequency::Yearly,
    ] {
        if stem.ends_with(&format!("_{frequency}")) {
            return Some(frequency);
        }
    }
    None
}

/// Parsed comparison file name.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonName {
    pub variable: String,
    pub units: String,
    pub frequency: Frequency,
    pub building_id: u64,
}

/// Parse `var_<name>_<units>_<freq>_b<id>` (derived files with `_from_`
/// return `None`).
pub fn parse_comparison_name(stem: &str) -> Option<ComparisonName> {
    let rest = stem.strip_prefix("var_")?;
    if rest.contains("_from_") {
        return None;
    }
    let (rest, building) = rest.rsplit_once("_b")?;
    let building_id: u64 = building.parse().ok()?;
    let (rest, freq_token) = rest.rsplit_once('_')?;
    let frequency: Frequency = freq_token.parse().ok()?;
    let (variable, units) = rest.rsplit_once('_')?;
    Some(ComparisonName {
        variable: variable.to_string(),
        units: units.to_string(),
        frequency,
        building_id,
    })
}

/// Aggregate one comparison file to `target`. Returns the output path or
/// `None` when skipped.
pub fn process_comparison_file(
    path: &Path,
    target: Frequency,
    rules: &AggregationRules,
    selection: &VariableSelection,
    skip_existing: bool,
) -> Result<Option<PathBuf>> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| anyhow!("bad comparison file name '{}'", path.display()))?;
    let Some(name) = parse_comparison_name(stem) else {
        return Ok(None);
    };
    if !target.is_strictly_coarser_than(name.frequency) {
        return Ok(None);
    }

    let df = read_frame(path)?;
    let actual_variable = df
        .column("variable_name")
        .ok()
        .and_then(|series| series.utf8().ok())
        .and_then(|chunked| chunked.get(0))
        .unwrap_or(name.variable.as_str())
        .to_string();
    if !selection.should_process(&actual_variable) {
        debug!("skipping {actual_variable} per selection");
        return Ok(None);
    }

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("parquet");
    let output = path.parent().unwrap_or_else(|| Path::new(".")).join(format!(
        "var_{}_{}_{target}_from_{}_b{}.{extension}",
        name.variable, name.units, name.frequency, name.building_id
    ));
    if skip_existing && output.exists() {
        info!("skipping existing {}", output.display());
        return Ok(None);
    }

    let mut aggregated = aggregate_comparison(&df, name.frequency, target, rules)?;
    write_frame_atomic(&mut aggregated, &output)?;
    info!("created {}", output.display());
    Ok(Some(output))
}

/// Summary of one aggregation sweep.
#[derive(Debug, Default)]
pub struct AggregationSummary {
    pub base_files_created: Vec<PathBuf>,
    pub comparison_files_created: Vec<PathBuf>,
    pub errors: Vec<String>,
}

/// Sweep a timeseries directory (base files) and an optional comparisons
/// directory, producing every requested target frequency.
pub fn run_aggregation(
    timeseries_dir: &Path,
    comparisons_dir: Option<&Path>,
    targets: &[Frequency],
    rules: &AggregationRules,
    selection: &VariableSelection,
    skip_existing: bool,
) -> Result<AggregationSummary> {
    let mut summary = AggregationSummary::default();

    if timeseries_dir.exists() {
        let mut base_files: Vec<PathBuf> = fs::read_dir(timeseries_dir)
            .with_context(|| format!("listing '{}'", timeseries_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("base_"))
            })
            .collect();
        base_files.sort();
        for path in base_files {
            for target in targets {
                match process_base_file(&path, *target, rules, selection, skip_existing) {
                    Ok(Some(output)) => summary.base_files_created.push(output),
                    Ok(None) => {}
                    Err(err) => {
                        if err
                            .downcast_ref::<besim_core::BesimError>()
                            .is_some_and(|e| {
                                matches!(e, besim_core::BesimError::AggregationRefused(_))
                            })
                        {
                            return Err(err);
                        }
                        summary
                            .errors
                            .push(format!("{}: {err}", path.display()));
                    }
                }
            }
        }
    }

    if let Some(dir) = comparisons_dir.filter(|dir| dir.exists()) {
        let mut comparison_files: Vec<PathBuf> = fs::read_dir(dir)
            .with_context(|| format!("listing '{}'", dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("var_"))
            })
            .collect();
        comparison_files.sort();
        for path in comparison_files {
            for target in targets {
                match process_comparison_file(&path, *target, rules, selection, skip_existing) {
                    Ok(Some(output)) => summary.comparison_files_created.push(output),
                    Ok(None) => {}
                    Err(err) => summary.errors.push(format!("{}: {err}", path.display())),
                }
            }
        }
    }
    Ok(summary)
}

#[cfg(all(test, feature = "parquet"))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_base_daily(dir: &Path) -> PathBuf {
        let mut df = df![
            "VariableName" => &["Heating Energy"],
            "Zone" => &["Z1"],
            "2013-01-01" => &[10.0],
            "2013-01-02" => &[30.0],
            "2013-02-01" => &[50.0],
        ]
        .unwrap();
        let path = dir.join("base_all_daily.parquet");
        write_frame_atomic(&mut df, &path).unwrap();
        path
    }

    #[test]
    fn base_file_aggregates_with_provenance_name() {
        let dir = tempdir().unwrap();
        let base = write_base_daily(dir.path());
        let output = process_base_file(
            &base,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
            true,
        )
        .unwrap()
        .unwrap();
        assert_eq!(
            output.file_name().unwrap().to_str().unwrap(),
            "base_all_monthly_from_daily.parquet"
        );
        let df = read_frame(&output).unwrap();
        let january = df.column("2013-01").unwrap().f64().unwrap();
        assert_eq!(january.get(0), Some(40.0));
        // no leftover staging file
        assert!(!output.with_extension("tmp").exists());
    }

    #[test]
    fn skip_existing_makes_rerun_a_noop() {
        let dir = tempdir().unwrap();
        let base = write_base_daily(dir.path());
        let first = process_base_file(
            &base,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
            true,
        )
        .unwrap();
        assert!(first.is_some());
        let second = process_base_file(
            &base,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
            true,
        )
        .unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn reruns_are_byte_identical() {
        let dir = tempdir().unwrap();
        let base = write_base_daily(dir.path());
        let output = process_base_file(
            &base,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
            false,
        )
        .unwrap()
        .unwrap();
        let first = fs::read(&output).unwrap();
        process_base_file(
            &base,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
            false,
        )
        .unwrap()
        .unwrap();
        let second = fs::read(&output).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn derived_files_are_never_reaggregated() {
        let dir = tempdir().unwrap();
        let mut df = df![
            "VariableName" => &["Heating Energy"],
            "2013-01" => &[40.0],
        ]
        .unwrap();
        let derived = dir.path().join("base_all_monthly_from_daily.parquet");
        write_frame_atomic(&mut df, &derived).unwrap();
        let result = process_base_file(
            &derived,
            Frequency::Yearly,
            &AggregationRules::default(),
            &VariableSelection::default(),
            true,
        )
        .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn comparison_names_parse_and_rebuild() {
        let name = parse_comparison_name("var_heating_energy_J_hourly_b413673000").unwrap();
        assert_eq!(name.variable, "heating_energy");
        assert_eq!(name.units, "J");
        assert_eq!(name.frequency, Frequency::Hourly);
        assert_eq!(name.building_id, 413673000);
        assert!(parse_comparison_name("var_x_J_daily_from_hourly_b1").is_none());
        assert!(parse_comparison_name("not_a_var_file").is_none());
    }

    #[test]
    fn sweep_produces_all_targets() {
        let dir = tempdir().unwrap();
        write_base_daily(dir.path());
        let summary = run_aggregation(
            dir.path(),
            None,
            &[Frequency::Monthly, Frequency::Yearly],
            &AggregationRules::default(),
            &VariableSelection::default(),
            true,
        )
        .unwrap();
        assert_eq!(summary.base_files_created.len(), 2);
        assert!(summary.errors.is_empty());
    }
}
