//! Connector for the engine's relational result store.
//!
//! Read-only access with a busy timeout; every reader tolerates missing
//! tables (the engine omits tables for features a run did not exercise) by
//! returning empty data and letting the validation report record the gap.

use anyhow::{Context, Result};
use besim_core::Frequency;
use chrono::{Duration as ChronoDuration, NaiveDate};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

/// One zone row from the store's zone table.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRow {
    pub zone_index: i64,
    pub zone_name: String,
    pub floor_area: f64,
    pub volume: f64,
    pub multiplier: f64,
}

/// One nominal-load row joined with its zone.
#[derive(Debug, Clone, PartialEq)]
pub struct NominalLoadRow {
    pub object_name: String,
    pub zone_name: String,
    pub design_level: Option<f64>,
    pub zone_floor_area: f64,
    /// design level normalized to W/m² where the zone has area.
    pub watts_per_m2: Option<f64>,
}

/// One long time-series fact.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    pub timestamp_ms: i64,
    pub zone: String,
    pub variable_name: String,
    pub units: String,
    pub value: f64,
}

/// One tabular-summary cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TabularCell {
    pub report_name: String,
    pub table_name: String,
    pub row_name: String,
    pub column_name: String,
    pub units: String,
    pub value: String,
}

/// Error counts and the derived quality score.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct QualityReport {
    pub warnings: u64,
    pub severe: u64,
    pub fatal: u64,
    pub convergence_issues: bool,
    pub quality_score: f64,
}

impl QualityReport {
    /// Start at 100; -0.1 per warning, -1 per severe, -10 per fatal,
    /// -5 when convergence issues were reported; floored at 0.
    pub fn score(warnings: u64, severe: u64, fatal: u64, convergence_issues: bool) -> f64 {
        let mut score = 100.0
            - 0.1 * warnings as f64
            - 1.0 * severe as f64
            - 10.0 * fatal as f64;
        if convergence_issues {
            score -= 5.0;
        }
        score.max(0.0)
    }
}

/// A sizing row (zone, system, or component sizing).
#[derive(Debug, Clone, PartialEq)]
pub struct SizingRow {
    pub table: String,
    pub name: String,
    pub description: String,
    pub value: f64,
    pub units: String,
}

pub struct ResultStore {
    conn: Connection,
}

impl ResultStore {
    /// Open read-only with a 30 s busy timeout.
    pub fn open(path: &Path) -> Result<ResultStore> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("opening result store '{}'", path.display()))?;
        conn.busy_timeout(Duration::from_secs(30))
            .context("setting result store busy timeout")?;
        Ok(ResultStore { conn })
    }

    /// Writable store, only for building test fixtures.
    pub fn create(path: &Path) -> Result<ResultStore> {
        let conn = Connection::open(path)
            .with_context(|| format!("creating result store '{}'", path.display()))?;
        Ok(ResultStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn has_table(&self, name: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("querying sqlite_master")?;
        Ok(count > 0)
    }

    /// Zone mapping table; empty when the store has no zone table.
    pub fn zone_mapping(&self) -> Result<Vec<ZoneRow>> {
        if !self.has_table("Zones")? {
            return Ok(Vec::new());
        }
        let mut statement = self.conn.prepare(
            "SELECT ZoneIndex, ZoneName, FloorArea, Volume, Multiplier FROM Zones \
             ORDER BY ZoneIndex",
        )?;
        let rows = statement
            .query_map([], |row| {
                Ok(ZoneRow {
                    zone_index: row.get(0)?,
                    zone_name: row.get(1)?,
                    floor_area: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    volume: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    multiplier: row.get::<_, Option<f64>>(4)?.unwrap_or(1.0),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("reading zone mapping")?;
        Ok(rows)
    }

    /// Nominal equipment/load rows for one table (NominalLighting,
    /// NominalElectricEquipment, NominalGasEquipment, NominalPeople,
    /// NominalInfiltration, NominalVentilation), joined with the zone
    /// mapping and normalized per m².
    pub fn nominal_loads(&self, table: &str) -> Result<Vec<NominalLoadRow>> {
        if !self.has_table(table)? {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT t.ObjectName, z.ZoneName, t.DesignLevel, z.FloorArea \
             FROM {table} t LEFT JOIN Zones z ON t.ZoneIndex = z.ZoneIndex \
             ORDER BY z.ZoneIndex"
        );
        let mut statement = self.conn.prepare(&query)?;
        let rows = statement
            .query_map([], |row| {
                let design_level: Option<f64> = row.get(2)?;
                let floor_area: f64 = row.get::<_, Option<f64>>(3)?.unwrap_or(0.0);
                Ok(NominalLoadRow {
                    object_name: row.get(0)?,
                    zone_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    design_level,
                    zone_floor_area: floor_area,
                    watts_per_m2: match (design_level, floor_area) {
                        (Some(level), area) if area > 0.0 => Some(level / area),
                        _ => None,
                    },
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("reading {table}"))?;
        Ok(rows)
    }

    /// Sizing rows from ZoneSizes / SystemSizes / ComponentSizes.
    pub fn sizing(&self) -> Result<Vec<SizingRow>> {
        let mut out = Vec::new();
        for (table, name_col, desc_col, value_col, units_col) in [
            ("ZoneSizes", "ZoneName", "LoadType", "CalcDesLoad", "''"),
            ("SystemSizes", "SystemName", "LoadType", "UserDesCap", "''"),
            ("ComponentSizes", "CompName", "Description", "Value", "Units"),
        ] {
            if !self.has_table(table)? {
                continue;
            }
            let query = format!(
                "SELECT {name_col}, {desc_col}, {value_col}, {units_col} FROM {table}"
            );
            let mut statement = self.conn.prepare(&query)?;
            let rows = statement
                .query_map([], |row| {
                    Ok(SizingRow {
                        table: table.to_string(),
                        name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                        description: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        value: row
                            .get::<_, Option<f64>>(2)
                            .or_else(|_| Ok::<_, rusqlite::Error>(None))?
                            .unwrap_or(0.0),
                        units: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()
                .with_context(|| format!("reading {table}"))?;
            out.extend(rows);
        }
        Ok(out)
    }

    /// Long time-series facts for one reporting frequency.
    pub fn timeseries(&self, frequency: Frequency) -> Result<Vec<TimeSeriesRow>> {
        for table in ["ReportData", "ReportDataDictionary", "Time"] {
            if !self.has_table(table)? {
                return Ok(Vec::new());
            }
        }
        let mut statement = self.conn.prepare(
            "SELECT t.Year, t.Month, t.Day, t.Hour, t.Minute, \
                    d.KeyValue, d.Name, d.Units, r.Value \
             FROM ReportData r \
             JOIN ReportDataDictionary d \
               ON r.ReportDataDictionaryIndex = d.ReportDataDictionaryIndex \
             JOIN Time t ON r.TimeIndex = t.TimeIndex \
             WHERE d.ReportingFrequency = ?1 \
             ORDER BY t.TimeIndex",
        )?;
        let frequency_label = reporting_frequency_label(frequency);
        let rows = statement
            .query_map([frequency_label], |row| {
                let year: Option<i64> = row.get(0)?;
                let month: Option<i64> = row.get(1)?;
                let day: Option<i64> = row.get(2)?;
                let hour: Option<i64> = row.get(3)?;
                let minute: Option<i64> = row.get(4)?;
                Ok((
                    (year, month, day, hour, minute),
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, Option<String>>(7)?,
                    row.get::<_, f64>(8)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("reading report data")?;

        let mut out = Vec::with_capacity(rows.len());
        for ((year, month, day, hour, minute), key_value, name, units, value) in rows {
            let Some(timestamp_ms) = engine_timestamp_ms(year, month, day, hour, minute) else {
                continue;
            };
            out.push(TimeSeriesRow {
                timestamp_ms,
                zone: key_value.unwrap_or_default(),
                variable_name: name,
                units: units.unwrap_or_default(),
                value,
            });
        }
        Ok(out)
    }

    /// Raw tabular-summary cells.
    pub fn tabular(&self) -> Result<Vec<TabularCell>> {
        if !self.has_table("TabularDataWithStrings")? {
            return Ok(Vec::new());
        }
        let mut statement = self.conn.prepare(
            "SELECT ReportName, TableName, RowName, ColumnName, Units, Value \
             FROM TabularDataWithStrings",
        )?;
        let rows = statement
            .query_map([], |row| {
                Ok(TabularCell {
                    report_name: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    table_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    row_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    column_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    units: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
                    value: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("reading tabular data")?;
        Ok(rows)
    }

    /// Error counts and the derived quality score.
    pub fn quality(&self) -> Result<QualityReport> {
        if !self.has_table("Errors")? {
            return Ok(QualityReport {
                warnings: 0,
                severe: 0,
                fatal: 0,
                convergence_issues: false,
                quality_score: 100.0,
            });
        }
        let mut statement = self
            .conn
            .prepare("SELECT ErrorType, ErrorMessage FROM Errors")?;
        let rows = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("reading errors")?;

        let mut warnings = 0u64;
        let mut severe = 0u64;
        let mut fatal = 0u64;
        let mut convergence_issues = false;
        for (error_type, message) in rows {
            match error_type {
                1 => warnings += 1,
                2 => severe += 1,
                3 => fatal += 1,
                _ => {}
            }
            if message.to_ascii_lowercase().contains("convergence") {
                convergence_issues = true;
            }
        }
        Ok(QualityReport {
            warnings,
            severe,
            fatal,
            convergence_issues,
            quality_score: QualityReport::score(warnings, severe, fatal, convergence_issues),
        })
    }
}

/// The reporting-frequency label the engine writes for each frequency.
pub fn reporting_frequency_label(frequency: Frequency) -> &'static str {
    match frequency {
        Frequency::Timestep => "Zone Timestep",
        Frequency::Hourly => "Hourly",
        Frequency::Daily => "Daily",
        Frequency::Monthly => "Monthly",
        Frequency::Yearly => "Annual",
    }
}

/// Epoch milliseconds from the engine's time row. The engine reports
/// end-of-interval with hours 1..=24; hour 24 rolls into the next day.
fn engine_timestamp_ms(
    year: Option<i64>,
    month: Option<i64>,
    day: Option<i64>,
    hour: Option<i64>,
    minute: Option<i64>,
) -> Option<i64> {
    let year = year.filter(|y| *y > 0).unwrap_or(2013) as i32;
    let month = month.unwrap_or(1).clamp(1, 12) as u32;
    let day = day.unwrap_or(1).clamp(1, 31) as u32;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let base = date.and_hms_opt(0, 0, 0)?;
    let datetime = base
        + ChronoDuration::hours(hour.unwrap_or(0))
        + ChronoDuration::minutes(minute.unwrap_or(0));
    Some(datetime.and_utc().timestamp_millis())
}
