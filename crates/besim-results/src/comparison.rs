//! Per-variable comparison tables across variants.
//!
//! For each (variable, units) the base run emitted, one long table keyed by
//! (timestamp, zone) with a `base_value` column and one `variant_K_value`
//! column per variant; null where a variant did not emit the variable at
//! that key. Files are named
//! `var_<safe_name>_<units>_<freq>_b<building>.parquet`.

use anyhow::{Context, Result};
use besim_core::Frequency;
use besim_ts::write_frame_atomic;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::extract::categorize_variable;
use crate::store::TimeSeriesRow;

/// Sanitized variable-name token for comparison file names.
pub fn safe_variable_name(variable_name: &str) -> String {
    variable_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Build one comparison frame for a single (variable, units).
fn comparison_frame(
    variable_name: &str,
    units: &str,
    building_id: u64,
    base: &[&TimeSeriesRow],
    variants: &[(usize, Vec<&TimeSeriesRow>)],
) -> Result<DataFrame> {
    type Key = (i64, String);
    let mut keys: BTreeSet<Key> = BTreeSet::new();
    let mut base_values: BTreeMap<Key, f64> = BTreeMap::new();
    for row in base {
        let key = (row.timestamp_ms, row.zone.clone());
        keys.insert(key.clone());
        base_values.insert(key, row.value);
    }
    let mut variant_values: Vec<(usize, BTreeMap<Key, f64>)> = Vec::new();
    for (variant_id, rows) in variants {
        let mut values = BTreeMap::new();
        for row in rows {
            let key = (row.timestamp_ms, row.zone.clone());
            keys.insert(key.clone());
            values.insert(key, row.value);
        }
        variant_values.push((*variant_id, values));
    }

    let ordered: Vec<Key> = keys.into_iter().collect();
    let mut columns = vec![
        Series::new(
            "timestamp",
            ordered.iter().map(|(ts, _)| *ts).collect::<Vec<_>>(),
        ),
        Series::new("building_id", vec![building_id as i64; ordered.len()]),
        Series::new(
            "Zone",
            ordered.iter().map(|(_, zone)| zone.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("variable_name", vec![variable_name; ordered.len()]),
        Series::new(
            "category",
            vec![categorize_variable(variable_name); ordered.len()],
        ),
        Series::new("Units", vec![units; ordered.len()]),
        Series::new(
            "base_value",
            ordered
                .iter()
                .map(|key| base_values.get(key).copied())
                .collect::<Vec<Option<f64>>>(),
        ),
    ];
    for (variant_id, values) in &variant_values {
        columns.push(Series::new(
            &format!("variant_{variant_id}_value"),
            ordered
                .iter()
                .map(|key| values.get(key).copied())
                .collect::<Vec<Option<f64>>>(),
        ));
    }
    DataFrame::new(columns).context("assembling comparison frame")
}

/// Write comparison files for every variable the base run emitted.
pub fn write_comparisons(
    base: &[TimeSeriesRow],
    variants: &[(usize, Vec<TimeSeriesRow>)],
    building_id: u64,
    frequency: Frequency,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    type VarKey = (String, String);
    let mut by_variable: BTreeMap<VarKey, Vec<&TimeSeriesRow>> = BTreeMap::new();
    for row in base {
        by_variable
            .entry((row.variable_name.clone(), row.units.clone()))
            .or_default()
            .push(row);
    }

    let mut written = Vec::with_capacity(by_variable.len());
    for ((variable_name, units), base_rows) in by_variable {
        let variant_rows: Vec<(usize, Vec<&TimeSeriesRow>)> = variants
            .iter()
            .map(|(variant_id, rows)| {
                (
                    *variant_id,
                    rows.iter()
                        .filter(|row| {
                            row.variable_name == variable_name && row.units == units
                        })
                        .collect(),
                )
            })
            .collect();
        let mut df = comparison_frame(
            &variable_name,
            &units,
            building_id,
            &base_rows,
            &variant_rows,
        )?;
        let file = out_dir.join(format!(
            "var_{}_{}_{frequency}_b{building_id}.parquet",
            safe_variable_name(&variable_name),
            units
        ));
        write_frame_atomic(&mut df, &file)?;
        written.push(file);
    }
    Ok(written)
}
