//! The semi-wide aggregation path: group source date columns by target
//! period and reduce each group per row with the row's variable method.

use anyhow::{Context, Result};
use besim_core::{BesimError, Frequency};
use polars::prelude::*;
use std::collections::BTreeMap;

use crate::freq::{date_columns, period_key};
use crate::rules::{AggregationRules, VariableSelection};

/// Metadata columns preserved through aggregation, in output order.
const META_COLUMNS: [&str; 6] = [
    "building_id",
    "variant_id",
    "VariableName",
    "category",
    "Zone",
    "Units",
];

/// Refuse any aggregation that is not strictly finer-to-coarser.
pub fn check_direction(source: Frequency, target: Frequency) -> Result<()> {
    if !target.is_strictly_coarser_than(source) {
        return Err(BesimError::AggregationRefused(format!(
            "cannot aggregate {source} to {target}; target must be strictly coarser"
        ))
        .into());
    }
    Ok(())
}

/// Aggregate a semi-wide frame from `source` to `target` frequency.
///
/// Rows whose `VariableName` the selection rejects are dropped. Output
/// columns are the preserved metadata followed by one column per target
/// period, in source order. NaNs are dropped inside each group; an all-NaN
/// group yields null.
pub fn aggregate_semi_wide(
    df: &DataFrame,
    source: Frequency,
    target: Frequency,
    rules: &AggregationRules,
    selection: &VariableSelection,
) -> Result<DataFrame> {
    check_direction(source, target)?;

    let source_columns = date_columns(df, source);
    if source_columns.is_empty() {
        return Err(BesimError::AggregationRefused(format!(
            "frame has no {source} date columns"
        ))
        .into());
    }

    // Keep only selected variables.
    let df = filter_by_selection(df, selection)?;

    // Group source columns by target period, preserving order.
    let mut group_order: Vec<String> = Vec::new();
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for column in &source_columns {
        let key = period_key(column, target)
            .ok_or_else(|| BesimError::Parse(format!("bad date column '{column}'")))?;
        if !groups.contains_key(&key) {
            group_order.push(key.clone());
        }
        groups.entry(key).or_default().push(column.clone());
    }

    let variable_names = df
        .column("VariableName")
        .context("semi-wide frame has no VariableName column")?
        .utf8()?;
    let methods: Vec<_> = variable_names
        .into_iter()
        .map(|name| rules.method_for(name.unwrap_or_default()))
        .collect();

    let mut out_columns: Vec<Series> = Vec::new();
    for meta in META_COLUMNS {
        if let Ok(column) = df.column(meta) {
            out_columns.push(column.clone());
        }
    }

    for key in group_order {
        let members = &groups[&key];
        let member_values: Vec<&Float64Chunked> = members
            .iter()
            .map(|name| {
                df.column(name)
                    .and_then(|series| series.f64())
                    .with_context(|| format!("date column '{name}' is not numeric"))
            })
            .collect::<Result<_>>()?;
        let mut cells: Vec<Option<f64>> = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let values: Vec<f64> = member_values
                .iter()
                .filter_map(|chunked| chunked.get(row))
                .collect();
            let reduced = methods[row].reduce(&values);
            cells.push(if reduced.is_nan() { None } else { Some(reduced) });
        }
        out_columns.push(Series::new(&key, cells));
    }

    DataFrame::new(out_columns).context("assembling aggregated semi-wide frame")
}

fn filter_by_selection(df: &DataFrame, selection: &VariableSelection) -> Result<DataFrame> {
    let names = df
        .column("VariableName")
        .context("semi-wide frame has no VariableName column")?
        .utf8()?;
    let mask: BooleanChunked = names
        .into_iter()
        .map(|name| Some(selection.should_process(name.unwrap_or_default())))
        .collect();
    df.filter(&mask).context("filtering variables")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::SelectionMode;

    fn daily_frame() -> DataFrame {
        df![
            "building_id" => &[1i64, 1],
            "variant_id" => &[0i64, 0],
            "VariableName" => &["Heating Energy", "Zone Air Temperature"],
            "category" => &["energy", "comfort"],
            "Zone" => &["Z1", "Z1"],
            "Units" => &["J", "C"],
            "2013-01-01" => &[10.0, 20.0],
            "2013-01-02" => &[30.0, 22.0],
            "2013-02-01" => &[50.0, 18.0],
        ]
        .unwrap()
    }

    #[test]
    fn daily_to_monthly_groups_by_prefix() {
        let out = aggregate_semi_wide(
            &daily_frame(),
            Frequency::Daily,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
        )
        .unwrap();
        assert!(out.get_column_names().contains(&"2013-01"));
        assert!(out.get_column_names().contains(&"2013-02"));
        let january = out.column("2013-01").unwrap().f64().unwrap();
        // energy sums, temperature means
        assert_eq!(january.get(0), Some(40.0));
        assert_eq!(january.get(1), Some(21.0));
    }

    #[test]
    fn yearly_sum_conserves_total() {
        // 365 daily columns of 6.4e6 must sum to 2.336e9
        let mut columns: Vec<Series> = vec![
            Series::new("VariableName", &["Heating Energy"]),
            Series::new("Zone", &["Z1"]),
        ];
        let mut day = chrono::NaiveDate::from_ymd_opt(2013, 1, 1).unwrap();
        for _ in 0..365 {
            columns.push(Series::new(&day.format("%Y-%m-%d").to_string(), &[6.4e6]));
            day = day.succ_opt().unwrap();
        }
        let df = DataFrame::new(columns).unwrap();
        let out = aggregate_semi_wide(
            &df,
            Frequency::Daily,
            Frequency::Yearly,
            &AggregationRules::default(),
            &VariableSelection::default(),
        )
        .unwrap();
        let year = out.column("2013").unwrap().f64().unwrap();
        assert!((year.get(0).unwrap() - 2.336e9).abs() < 1.0);
    }

    #[test]
    fn refuses_equal_or_finer_target() {
        let df = daily_frame();
        for target in [Frequency::Daily, Frequency::Hourly] {
            let err = aggregate_semi_wide(
                &df,
                Frequency::Daily,
                target,
                &AggregationRules::default(),
                &VariableSelection::default(),
            )
            .unwrap_err();
            assert!(matches!(
                err.downcast_ref::<BesimError>(),
                Some(BesimError::AggregationRefused(_))
            ));
        }
    }

    #[test]
    fn nulls_drop_out_of_groups() {
        let df = df![
            "VariableName" => &["Heating Energy"],
            "2013-01-01" => &[Some(10.0)],
            "2013-01-02" => &[None::<f64>],
        ]
        .unwrap();
        let out = aggregate_semi_wide(
            &df,
            Frequency::Daily,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
        )
        .unwrap();
        let january = out.column("2013-01").unwrap().f64().unwrap();
        assert_eq!(january.get(0), Some(10.0));
    }

    #[test]
    fn selection_drops_rows_before_aggregation() {
        let selection = VariableSelection {
            mode: SelectionMode::Include,
            variables: vec![],
            patterns: vec!["*Energy*".into()],
        };
        let out = aggregate_semi_wide(
            &daily_frame(),
            Frequency::Daily,
            Frequency::Monthly,
            &AggregationRules::default(),
            &selection,
        )
        .unwrap();
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn aggregation_is_idempotent_in_value() {
        let once = aggregate_semi_wide(
            &daily_frame(),
            Frequency::Daily,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
        )
        .unwrap();
        let twice = aggregate_semi_wide(
            &daily_frame(),
            Frequency::Daily,
            Frequency::Monthly,
            &AggregationRules::default(),
            &VariableSelection::default(),
        )
        .unwrap();
        assert_eq!(format!("{once:?}"), format!("{twice:?}"));
    }
}
