//! The long aggregation path: comparison tables keyed by a millisecond
//! `timestamp` column, with one value column per variant.
//!
//! Timestamps are floored to the target period, groups are reduced with the
//! file's variable method, and the output re-encodes `timestamp` as
//! period-start milliseconds. Metadata columns are constant per comparison
//! file and are carried from the first row.

use anyhow::{Context, Result};
use besim_core::{BesimError, Frequency};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Timelike, Utc};
use polars::prelude::*;
use std::collections::BTreeMap;

use crate::rules::AggregationRules;
use crate::semiwide::check_direction;

/// Metadata columns carried through unchanged (first row wins).
const META_COLUMNS: [&str; 5] = ["building_id", "Zone", "variable_name", "category", "Units"];

/// Floor an epoch-millisecond timestamp to its period start.
pub fn floor_timestamp_ms(timestamp_ms: i64, target: Frequency) -> Result<i64> {
    let datetime: DateTime<Utc> = Utc
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .ok_or_else(|| BesimError::Parse(format!("bad timestamp {timestamp_ms} ms")))?;
    let floored = match target {
        Frequency::Timestep => datetime,
        Frequency::Hourly => datetime
            .with_minute(0)
            .and_then(|dt| dt.with_second(0))
            .and_then(|dt| dt.with_nanosecond(0))
            .expect("valid truncation"),
        Frequency::Daily => start_of_day(datetime.date_naive()),
        Frequency::Monthly => start_of_day(
            NaiveDate::from_ymd_opt(datetime.year(), datetime.month(), 1)
                .expect("first of month exists"),
        ),
        Frequency::Yearly => start_of_day(
            NaiveDate::from_ymd_opt(datetime.year(), 1, 1).expect("january first exists"),
        ),
    };
    Ok(floored.timestamp_millis())
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight exists"))
}

/// Aggregate a long comparison frame from `source` to `target` frequency.
pub fn aggregate_comparison(
    df: &DataFrame,
    source: Frequency,
    target: Frequency,
    rules: &AggregationRules,
) -> Result<DataFrame> {
    check_direction(source, target)?;

    let timestamps = df
        .column("timestamp")
        .context("comparison frame has no timestamp column")?
        .cast(&DataType::Int64)
        .context("casting timestamp column to Int64")?;
    let timestamps = timestamps.i64()?;

    let variable_name = df
        .column("variable_name")
        .ok()
        .and_then(|series| series.utf8().ok())
        .and_then(|chunked| chunked.get(0))
        .unwrap_or_default()
        .to_string();
    let method = rules.method_for(&variable_name);

    let value_columns: Vec<String> = df
        .get_column_names()
        .iter()
        .filter(|name| name.ends_with("_value"))
        .map(|name| name.to_string())
        .collect();
    if value_columns.is_empty() {
        return Err(BesimError::AggregationRefused(
            "comparison frame has no *_value columns".into(),
        )
        .into());
    }

    // Bucket rows by period start, preserving chronological order through
    // the BTreeMap key.
    let mut buckets: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (row, timestamp) in timestamps.into_iter().enumerate() {
        let Some(timestamp) = timestamp else { continue };
        let bucket = floor_timestamp_ms(timestamp, target)?;
        buckets.entry(bucket).or_default().push(row);
    }

    let mut out_columns: Vec<Series> = Vec::new();
    let bucket_starts: Vec<i64> = buckets.keys().copied().collect();
    out_columns.push(Series::new("timestamp", bucket_starts));

    for meta in META_COLUMNS {
        if let Ok(column) = df.column(meta) {
            let first = column.get(0).context("metadata column is empty")?;
            let values: Vec<AnyValue> = buckets.iter().map(|_| first.clone()).collect();
            let series = Series::from_any_values_and_dtype(meta, &values, column.dtype(), true)
                .context("carrying metadata column")?;
            out_columns.push(series);
        }
    }

    for value_column in &value_columns {
        let chunked = df
            .column(value_column)?
            .cast(&DataType::Float64)
            .context("casting value column to Float64")?;
        let chunked = chunked.f64()?;
        let reduced: Vec<Option<f64>> = buckets
            .values()
            .map(|rows| {
                let values: Vec<f64> =
                    rows.iter().filter_map(|row| chunked.get(*row)).collect();
                let value = method.reduce(&values);
                if value.is_nan() {
                    None
                } else {
                    Some(value)
                }
            })
            .collect();
        out_columns.push(Series::new(value_column, reduced));
    }

    DataFrame::new(out_columns).context("assembling aggregated comparison frame")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(date: &str, hour: u32) -> i64 {
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap();
        Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
            .timestamp_millis()
    }

    fn comparison_frame() -> DataFrame {
        df![
            "timestamp" => &[
                ms("2013-01-01", 0),
                ms("2013-01-01", 12),
                ms("2013-01-02", 6),
            ],
            "building_id" => &[1i64, 1, 1],
            "Zone" => &["Z1", "Z1", "Z1"],
            "variable_name" => &["Heating Energy", "Heating Energy", "Heating Energy"],
            "category" => &["energy", "energy", "energy"],
            "Units" => &["J", "J", "J"],
            "base_value" => &[10.0, 20.0, 40.0],
            "variant_1_value" => &[5.0, 15.0, 35.0],
        ]
        .unwrap()
    }

    #[test]
    fn floors_follow_target_period() {
        let noon = ms("2013-05-17", 12);
        assert_eq!(
            floor_timestamp_ms(noon, Frequency::Daily).unwrap(),
            ms("2013-05-17", 0)
        );
        assert_eq!(
            floor_timestamp_ms(noon, Frequency::Monthly).unwrap(),
            ms("2013-05-01", 0)
        );
        assert_eq!(
            floor_timestamp_ms(noon, Frequency::Yearly).unwrap(),
            ms("2013-01-01", 0)
        );
    }

    #[test]
    fn hourly_to_daily_sums_per_variant_column() {
        let out = aggregate_comparison(
            &comparison_frame(),
            Frequency::Hourly,
            Frequency::Daily,
            &AggregationRules::default(),
        )
        .unwrap();
        assert_eq!(out.height(), 2);
        let timestamps = out.column("timestamp").unwrap().i64().unwrap();
        assert_eq!(timestamps.get(0), Some(ms("2013-01-01", 0)));
        let base = out.column("base_value").unwrap().f64().unwrap();
        assert_eq!(base.get(0), Some(30.0));
        assert_eq!(base.get(1), Some(40.0));
        let variant = out.column("variant_1_value").unwrap().f64().unwrap();
        assert_eq!(variant.get(0), Some(20.0));
        // metadata carried from the first row
        let zone = out.column("Zone").unwrap().utf8().unwrap();
        assert_eq!(zone.get(0), Some("Z1"));
    }

    #[test]
    fn refuses_wrong_direction() {
        let err = aggregate_comparison(
            &comparison_frame(),
            Frequency::Daily,
            Frequency::Hourly,
            &AggregationRules::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BesimError>(),
            Some(BesimError::AggregationRefused(_))
        ));
    }

    #[test]
    fn null_variant_cells_survive_as_null() {
        let df = df![
            "timestamp" => &[ms("2013-01-01", 0), ms("2013-01-01", 12)],
            "variable_name" => &["Heating Energy", "Heating Energy"],
            "base_value" => &[10.0, 20.0],
            "variant_1_value" => &[None::<f64>, None::<f64>],
        ]
        .unwrap();
        let out = aggregate_comparison(
            &df,
            Frequency::Hourly,
            Frequency::Daily,
            &AggregationRules::default(),
        )
        .unwrap();
        let variant = out.column("variant_1_value").unwrap().f64().unwrap();
        assert_eq!(variant.get(0), None);
        let base = out.column("base_value").unwrap().f64().unwrap();
        assert_eq!(base.get(0), Some(30.0));
    }
}
