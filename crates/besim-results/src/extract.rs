//! Result extraction: one relational result store in, a columnar directory
//! tree out.
//!
//! Extraction order matches the warehouse contract: zone mapping, nominal
//! loads, sizing, time-series facts (per reporting frequency, long and
//! semi-wide), tabular summaries (raw and pivoted), then error counts and
//! the validation report. Partial stores still produce whatever exists; the
//! gaps land in the validation report instead of failing the run. All files
//! are staged and renamed so a cancelled extraction leaves nothing behind.

use anyhow::{Context, Result};
use besim_core::Frequency;
use besim_ts::write_frame_atomic;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::store::{
    NominalLoadRow, QualityReport, ResultStore, SizingRow, TabularCell, TimeSeriesRow, ZoneRow,
};

/// Nominal tables extracted, with the coverage-report category each feeds.
const NOMINAL_TABLES: [(&str, &str); 6] = [
    ("NominalLighting", "Lighting"),
    ("NominalElectricEquipment", "Electric Equipment"),
    ("NominalGasEquipment", "Gas Equipment"),
    ("NominalPeople", "People"),
    ("NominalInfiltration", "Infiltration"),
    ("NominalVentilation", "Ventilation"),
];

const FREQUENCIES: [Frequency; 5] = [
    Frequency::Timestep,
    Frequency::Hourly,
    Frequency::Daily,
    Frequency::Monthly,
    Frequency::Yearly,
];

/// Coverage of one zone-level category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageLine {
    pub category: String,
    pub zones_found: usize,
    pub total_zones: usize,
    pub coverage_pct: f64,
}

impl CoverageLine {
    pub fn new(category: &str, zones_found: usize, total_zones: usize) -> CoverageLine {
        let coverage_pct = if total_zones > 0 {
            zones_found as f64 / total_zones as f64 * 100.0
        } else {
            0.0
        };
        CoverageLine {
            category: category.to_string(),
            zones_found,
            total_zones,
            coverage_pct,
        }
    }

    /// The report line format, e.g. `Lighting: 6/7 (85.7%)`.
    pub fn report_line(&self) -> String {
        format!(
            "{}: {}/{} ({:.1}%)",
            self.category, self.zones_found, self.total_zones, self.coverage_pct
        )
    }

    pub fn is_complete(&self) -> bool {
        self.zones_found >= self.total_zones
    }
}

/// What one extraction produced, persisted as the validation report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub building_id: u64,
    pub variant_id: usize,
    pub extracted_at: DateTime<Utc>,
    pub extraction_log: Vec<String>,
    pub missing_data: Vec<String>,
    pub zone_coverage: Vec<CoverageLine>,
    pub quality: QualityReport,
    pub file_inventory: BTreeMap<String, Vec<String>>,
}

/// Extract everything from one result store into `output_dir`.
pub fn extract_all(
    store_path: &Path,
    output_dir: &Path,
    building_id: u64,
    variant_id: usize,
) -> Result<ExtractionReport> {
    let store = ResultStore::open(store_path)?;
    let dirs = OutputDirs::create(output_dir)?;
    let mut log: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();

    // 1) zone mapping
    let zones = store.zone_mapping()?;
    if zones.is_empty() {
        missing.push("Zones".into());
    } else {
        let mut df = zones_dataframe(&zones)?;
        write_frame_atomic(&mut df, &dirs.zones.join("zone_mapping.parquet"))?;
        log.push(format!("Zones: {} records", zones.len()));
    }

    // 2) nominal loads
    let mut nominal_by_category: BTreeMap<String, Vec<NominalLoadRow>> = BTreeMap::new();
    for (table, category) in NOMINAL_TABLES {
        let rows = store.nominal_loads(table)?;
        if rows.is_empty() {
            missing.push(table.to_string());
            continue;
        }
        let mut df = nominal_dataframe(&rows)?;
        let file = dirs
            .equipment
            .join(format!("{}.parquet", table.to_ascii_lowercase()));
        write_frame_atomic(&mut df, &file)?;
        log.push(format!("{table}: {} records", rows.len()));
        nominal_by_category.insert(category.to_string(), rows);
    }

    // 3) sizing
    let sizing = store.sizing()?;
    if sizing.is_empty() {
        missing.push("sizing".into());
    } else {
        let mut df = sizing_dataframe(&sizing)?;
        write_frame_atomic(&mut df, &dirs.sizing.join("sizing_results.parquet"))?;
        log.push(format!("sizing: {} records", sizing.len()));
    }

    // 4) time-series, long per frequency plus the semi-wide view
    for frequency in FREQUENCIES {
        let rows = store.timeseries(frequency)?;
        if rows.is_empty() {
            continue;
        }
        let frequency_dir = dirs.timeseries.join(frequency.as_str());
        let mut long = long_dataframe(&rows, building_id, variant_id)?;
        write_frame_atomic(
            &mut long,
            &frequency_dir.join(format!("base_all_{frequency}_long.parquet")),
        )?;
        if frequency != Frequency::Timestep {
            let mut semi_wide = semi_wide_dataframe(&rows, building_id, variant_id, frequency)?;
            write_frame_atomic(
                &mut semi_wide,
                &dirs.timeseries.join(format!("base_all_{frequency}.parquet")),
            )?;
        }
        log.push(format!("timeseries {frequency}: {} rows", rows.len()));
    }

    // 5) tabular summaries, raw and pivoted
    let cells = store.tabular()?;
    if cells.is_empty() {
        missing.push("TabularDataWithStrings".into());
    } else {
        let mut raw = tabular_dataframe(&cells)?;
        write_frame_atomic(&mut raw, &dirs.metadata.join("tabular_raw.parquet"))?;
        for ((report, table), mut pivoted) in pivot_tabular(&cells)? {
            let file = dirs.metadata.join("tabular_pivoted").join(format!(
                "{}__{}.parquet",
                sanitize_file_name(&report),
                sanitize_file_name(&table)
            ));
            write_frame_atomic(&mut pivoted, &file)?;
        }
        log.push(format!("tabular: {} cells", cells.len()));
    }

    // 6) errors and validation
    let quality = store.quality()?;
    let zone_coverage = coverage_lines(&zones, &nominal_by_category);
    for line in &zone_coverage {
        if !line.is_complete() {
            info!("zone coverage shortfall - {}", line.report_line());
        }
    }

    let report = ExtractionReport {
        building_id,
        variant_id,
        extracted_at: Utc::now(),
        extraction_log: log,
        missing_data: missing,
        zone_coverage,
        quality,
        file_inventory: file_inventory(&dirs)?,
    };
    let report_json =
        serde_json::to_string_pretty(&report).context("serializing extraction report")?;
    fs::write(dirs.validation.join("extraction_report.json"), report_json)
        .context("writing extraction report")?;
    Ok(report)
}

struct OutputDirs {
    timeseries: PathBuf,
    zones: PathBuf,
    sizing: PathBuf,
    equipment: PathBuf,
    characteristics: PathBuf,
    metadata: PathBuf,
    validation: PathBuf,
}

impl OutputDirs {
    fn create(root: &Path) -> Result<OutputDirs> {
        let dirs = OutputDirs {
            timeseries: root.join("timeseries"),
            zones: root.join("zones"),
            sizing: root.join("sizing"),
            equipment: root.join("equipment"),
            characteristics: root.join("characteristics"),
            metadata: root.join("metadata"),
            validation: root.join("validation"),
        };
        for dir in [
            &dirs.timeseries,
            &dirs.zones,
            &dirs.sizing,
            &dirs.equipment,
            &dirs.characteristics,
            &dirs.metadata,
            &dirs.validation,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating '{}'", dir.display()))?;
        }
        Ok(dirs)
    }
}

/// Category a variable belongs to, from its name.
pub fn categorize_variable(variable_name: &str) -> &'static str {
    let lower = variable_name.to_ascii_lowercase();
    if lower.contains("energy") || lower.contains("electricity") || lower.contains("gas") {
        "energy"
    } else if lower.contains("temperature") {
        "comfort"
    } else if lower.contains("infiltration") || lower.contains("ventilation") {
        "airflow"
    } else if lower.contains("humidity") {
        "moisture"
    } else if lower.contains("rate") || lower.contains("power") {
        "demand"
    } else {
        "other"
    }
}

fn zones_dataframe(zones: &[ZoneRow]) -> Result<DataFrame> {
    DataFrame::new(vec![
        Series::new("zone_index", zones.iter().map(|z| z.zone_index).collect::<Vec<_>>()),
        Series::new(
            "zone_name",
            zones.iter().map(|z| z.zone_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("floor_area", zones.iter().map(|z| z.floor_area).collect::<Vec<_>>()),
        Series::new("volume", zones.iter().map(|z| z.volume).collect::<Vec<_>>()),
        Series::new(
            "multiplier",
            zones.iter().map(|z| z.multiplier).collect::<Vec<_>>(),
        ),
    ])
    .context("assembling zone mapping frame")
}

fn nominal_dataframe(rows: &[NominalLoadRow]) -> Result<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            "object_name",
            rows.iter().map(|r| r.object_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "zone_name",
            rows.iter().map(|r| r.zone_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "design_level",
            rows.iter().map(|r| r.design_level).collect::<Vec<_>>(),
        ),
        Series::new(
            "zone_floor_area",
            rows.iter().map(|r| r.zone_floor_area).collect::<Vec<_>>(),
        ),
        Series::new(
            "watts_per_m2",
            rows.iter().map(|r| r.watts_per_m2).collect::<Vec<_>>(),
        ),
    ])
    .context("assembling nominal loads frame")
}

fn sizing_dataframe(rows: &[SizingRow]) -> Result<DataFrame> {
    DataFrame::new(vec![
        Series::new("table", rows.iter().map(|r| r.table.as_str()).collect::<Vec<_>>()),
        Series::new("name", rows.iter().map(|r| r.name.as_str()).collect::<Vec<_>>()),
        Series::new(
            "description",
            rows.iter().map(|r| r.description.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("value", rows.iter().map(|r| r.value).collect::<Vec<_>>()),
        Series::new("units", rows.iter().map(|r| r.units.as_str()).collect::<Vec<_>>()),
    ])
    .context("assembling sizing frame")
}

/// Long facts: one row per (timestamp, zone, variable).
pub fn long_dataframe(
    rows: &[TimeSeriesRow],
    building_id: u64,
    variant_id: usize,
) -> Result<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            "timestamp",
            rows.iter().map(|r| r.timestamp_ms).collect::<Vec<_>>(),
        ),
        Series::new("building_id", vec![building_id as i64; rows.len()]),
        Series::new("variant_id", vec![variant_id as i64; rows.len()]),
        Series::new("Zone", rows.iter().map(|r| r.zone.as_str()).collect::<Vec<_>>()),
        Series::new(
            "VariableName",
            rows.iter().map(|r| r.variable_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "category",
            rows.iter()
                .map(|r| categorize_variable(&r.variable_name))
                .collect::<Vec<_>>(),
        ),
        Series::new("Units", rows.iter().map(|r| r.units.as_str()).collect::<Vec<_>>()),
        Series::new("value", rows.iter().map(|r| r.value).collect::<Vec<_>>()),
    ])
    .context("assembling long time-series frame")
}

/// Period column key for a timestamp at a reporting frequency.
pub fn period_column(timestamp_ms: i64, frequency: Frequency) -> Option<String> {
    let datetime = chrono::TimeZone::timestamp_millis_opt(&Utc, timestamp_ms).single()?;
    let formatted = match frequency {
        Frequency::Timestep => return None,
        Frequency::Hourly => datetime.format("%Y-%m-%d_%H").to_string(),
        Frequency::Daily => datetime.format("%Y-%m-%d").to_string(),
        Frequency::Monthly => datetime.format("%Y-%m").to_string(),
        Frequency::Yearly => datetime.format("%Y").to_string(),
    };
    Some(formatted)
}

/// Semi-wide view: group by (building, variant, variable, category, zone,
/// units), one column per period.
pub fn semi_wide_dataframe(
    rows: &[TimeSeriesRow],
    building_id: u64,
    variant_id: usize,
    frequency: Frequency,
) -> Result<DataFrame> {
    type GroupKey = (String, String, String);
    let mut group_order: Vec<GroupKey> = Vec::new();
    let mut period_order: Vec<String> = Vec::new();
    let mut cells: BTreeMap<(usize, String), f64> = BTreeMap::new();
    let mut group_index: BTreeMap<GroupKey, usize> = BTreeMap::new();

    for row in rows {
        let Some(period) = period_column(row.timestamp_ms, frequency) else {
            continue;
        };
        let key: GroupKey = (
            row.variable_name.clone(),
            row.zone.clone(),
            row.units.clone(),
        );
        let index = *group_index.entry(key.clone()).or_insert_with(|| {
            group_order.push(key.clone());
            group_order.len() - 1
        });
        if !period_order.contains(&period) {
            period_order.push(period.clone());
        }
        cells.insert((index, period), row.value);
    }

    let mut columns = vec![
        Series::new("building_id", vec![building_id as i64; group_order.len()]),
        Series::new("variant_id", vec![variant_id as i64; group_order.len()]),
        Series::new(
            "VariableName",
            group_order.iter().map(|(v, _, _)| v.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "category",
            group_order
                .iter()
                .map(|(v, _, _)| categorize_variable(v))
                .collect::<Vec<_>>(),
        ),
        Series::new(
            "Zone",
            group_order.iter().map(|(_, z, _)| z.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "Units",
            group_order.iter().map(|(_, _, u)| u.as_str()).collect::<Vec<_>>(),
        ),
    ];
    for period in &period_order {
        let values: Vec<Option<f64>> = (0..group_order.len())
            .map(|index| cells.get(&(index, period.clone())).copied())
            .collect();
        columns.push(Series::new(period, values));
    }
    DataFrame::new(columns).context("assembling semi-wide frame")
}

fn tabular_dataframe(cells: &[TabularCell]) -> Result<DataFrame> {
    DataFrame::new(vec![
        Series::new(
            "report_name",
            cells.iter().map(|c| c.report_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "table_name",
            cells.iter().map(|c| c.table_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "row_name",
            cells.iter().map(|c| c.row_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new(
            "column_name",
            cells.iter().map(|c| c.column_name.as_str()).collect::<Vec<_>>(),
        ),
        Series::new("units", cells.iter().map(|c| c.units.as_str()).collect::<Vec<_>>()),
        Series::new("value", cells.iter().map(|c| c.value.as_str()).collect::<Vec<_>>()),
    ])
    .context("assembling tabular frame")
}

/// Pivot tabular cells: one frame per (report, table) with rows by row-name
/// and a column per column-name.
pub fn pivot_tabular(
    cells: &[TabularCell],
) -> Result<Vec<((String, String), DataFrame)>> {
    let mut grouped: BTreeMap<(String, String), Vec<&TabularCell>> = BTreeMap::new();
    for cell in cells {
        grouped
            .entry((cell.report_name.clone(), cell.table_name.clone()))
            .or_default()
            .push(cell);
    }
    let mut out = Vec::with_capacity(grouped.len());
    for (key, cells) in grouped {
        let mut row_order: Vec<String> = Vec::new();
        let mut column_order: Vec<String> = Vec::new();
        let mut values: BTreeMap<(String, String), String> = BTreeMap::new();
        for cell in cells {
            if !row_order.contains(&cell.row_name) {
                row_order.push(cell.row_name.clone());
            }
            if !column_order.contains(&cell.column_name) {
                column_order.push(cell.column_name.clone());
            }
            values.insert(
                (cell.row_name.clone(), cell.column_name.clone()),
                cell.value.clone(),
            );
        }
        let mut columns = vec![Series::new(
            "row_name",
            row_order.iter().map(String::as_str).collect::<Vec<_>>(),
        )];
        for column in &column_order {
            let cells: Vec<Option<String>> = row_order
                .iter()
                .map(|row| values.get(&(row.clone(), column.clone())).cloned())
                .collect();
            columns.push(Series::new(column, cells));
        }
        out.push((key, DataFrame::new(columns).context("pivoting tabular data")?));
    }
    Ok(out)
}

fn coverage_lines(
    zones: &[ZoneRow],
    nominal_by_category: &BTreeMap<String, Vec<NominalLoadRow>>,
) -> Vec<CoverageLine> {
    let total = zones.len();
    NOMINAL_TABLES
        .iter()
        .map(|(_, category)| {
            let found = nominal_by_category
                .get(*category)
                .map(|rows| {
                    let mut zone_names: Vec<&str> =
                        rows.iter().map(|r| r.zone_name.as_str()).collect();
                    zone_names.sort_unstable();
                    zone_names.dedup();
                    zone_names.len()
                })
                .unwrap_or(0);
            CoverageLine::new(category, found, total)
        })
        .collect()
}

fn file_inventory(dirs: &OutputDirs) -> Result<BTreeMap<String, Vec<String>>> {
    let mut inventory = BTreeMap::new();
    for (label, dir) in [
        ("timeseries", &dirs.timeseries),
        ("zones", &dirs.zones),
        ("sizing", &dirs.sizing),
        ("equipment", &dirs.equipment),
        ("characteristics", &dirs.characteristics),
        ("metadata", &dirs.metadata),
        ("validation", &dirs.validation),
    ] {
        let mut files = Vec::new();
        collect_files(dir, &mut files)?;
        files.sort();
        inventory.insert(label.to_string(), files);
    }
    Ok(inventory)
}

fn collect_files(dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("listing '{}'", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            out.push(name.to_string());
        }
    }
    Ok(())
}

fn sanitize_file_name(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(all(test, feature = "parquet"))]
mod tests {
    use super::*;
    use crate::store::fixtures::{add_hourly_series, populate_minimal};
    use besim_ts::read_frame;
    use tempfile::tempdir;

    fn seven_zone_store(dir: &Path) -> PathBuf {
        let path = dir.join("results.sql");
        let store = ResultStore::create(&path).unwrap();
        let zones: Vec<(String, f64)> = (1..=6)
            .map(|i| (format!("ZONE_PERIM_{i}"), 50.0))
            .chain(std::iter::once(("ZONE_CORE".to_string(), 40.0)))
            .collect();
        let refs: Vec<(&str, f64)> = zones.iter().map(|(n, a)| (n.as_str(), *a)).collect();
        populate_minimal(&store, &refs);
        // lighting in only six of the seven zones
        for index in 1..=6i64 {
            store
                .connection()
                .execute(
                    "INSERT INTO NominalLighting VALUES (?1, ?2, 500.0)",
                    rusqlite::params![format!("LIGHTS_{index}"), index],
                )
                .unwrap();
        }
        add_hourly_series(
            &store,
            10,
            "Zone Air Temperature",
            "ZONE_PERIM_1",
            "C",
            &[20.0, 21.0, 22.0],
        );
        store
            .connection()
            .execute(
                "INSERT INTO TabularDataWithStrings VALUES \
                 ('AnnualBuildingUtilityPerformanceSummary', 'End Uses', 'Heating', \
                  'Electricity', 'GJ', '12.5')",
                [],
            )
            .unwrap();
        path
    }

    #[test]
    fn extraction_builds_the_directory_tree() {
        let dir = tempdir().unwrap();
        let store_path = seven_zone_store(dir.path());
        let out = dir.path().join("parsed_data");
        let report = extract_all(&store_path, &out, 413673000, 0).unwrap();

        assert!(out.join("zones/zone_mapping.parquet").exists());
        assert!(out.join("equipment/nominallighting.parquet").exists());
        assert!(out.join("timeseries/hourly/base_all_hourly_long.parquet").exists());
        assert!(out.join("timeseries/base_all_hourly.parquet").exists());
        assert!(out.join("metadata/tabular_raw.parquet").exists());
        assert!(out.join("validation/extraction_report.json").exists());
        assert_eq!(report.building_id, 413673000);
        assert!(report.file_inventory["zones"].contains(&"zone_mapping.parquet".to_string()));
    }

    #[test]
    fn coverage_shortfall_is_reported_exactly() {
        let dir = tempdir().unwrap();
        let store_path = seven_zone_store(dir.path());
        let out = dir.path().join("parsed_data");
        let report = extract_all(&store_path, &out, 1, 0).unwrap();
        let lighting = report
            .zone_coverage
            .iter()
            .find(|line| line.category == "Lighting")
            .unwrap();
        assert_eq!(lighting.report_line(), "Lighting: 6/7 (85.7%)");
        assert!(!lighting.is_complete());
    }

    #[test]
    fn long_frame_has_fact_table_columns() {
        let rows = vec![TimeSeriesRow {
            timestamp_ms: 1_357_002_000_000,
            zone: "Z1".into(),
            variable_name: "Zone Total Heating Energy".into(),
            units: "J".into(),
            value: 5.0,
        }];
        let df = long_dataframe(&rows, 1, 2).unwrap();
        for column in [
            "timestamp",
            "building_id",
            "variant_id",
            "Zone",
            "VariableName",
            "category",
            "Units",
            "value",
        ] {
            assert!(df.get_column_names().contains(&column), "missing {column}");
        }
        let category = df.column("category").unwrap().utf8().unwrap();
        assert_eq!(category.get(0), Some("energy"));
    }

    #[test]
    fn semi_wide_pivots_periods_to_columns() {
        let base = chrono::NaiveDate::from_ymd_opt(2013, 1, 1)
            .unwrap()
            .and_hms_opt(1, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        let rows: Vec<TimeSeriesRow> = (0..3)
            .map(|hour| TimeSeriesRow {
                timestamp_ms: base + hour * 3_600_000,
                zone: "Z1".into(),
                variable_name: "Zone Air Temperature".into(),
                units: "C".into(),
                value: 20.0 + hour as f64,
            })
            .collect();
        let df = semi_wide_dataframe(&rows, 1, 0, Frequency::Hourly).unwrap();
        assert_eq!(df.height(), 1);
        assert!(df.get_column_names().contains(&"2013-01-01_01"));
        assert!(df.get_column_names().contains(&"2013-01-01_03"));
    }

    #[test]
    fn semi_wide_files_round_trip_into_the_aggregator() {
        let dir = tempdir().unwrap();
        let store_path = seven_zone_store(dir.path());
        let out = dir.path().join("parsed_data");
        extract_all(&store_path, &out, 1, 0).unwrap();
        let df = read_frame(&out.join("timeseries/base_all_hourly.parquet")).unwrap();
        assert_eq!(besim_ts::detect_frequency(&df), Some(Frequency::Hourly));
    }

    #[test]
    fn pivoted_tabular_rows_by_row_name() {
        let cells = vec![
            TabularCell {
                report_name: "Summary".into(),
                table_name: "End Uses".into(),
                row_name: "Heating".into(),
                column_name: "Electricity".into(),
                units: "GJ".into(),
                value: "12.5".into(),
            },
            TabularCell {
                report_name: "Summary".into(),
                table_name: "End Uses".into(),
                row_name: "Cooling".into(),
                column_name: "Electricity".into(),
                units: "GJ".into(),
                value: "3.25".into(),
            },
        ];
        let pivoted = pivot_tabular(&cells).unwrap();
        assert_eq!(pivoted.len(), 1);
        let (_, df) = &pivoted[0];
        assert_eq!(df.height(), 2);
        assert!(df.get_column_names().contains(&"Electricity"));
    }
}
