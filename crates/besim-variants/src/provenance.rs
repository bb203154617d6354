//! Variant provenance: the modification relation and its two views.
//!
//! The record list is the source of truth; long format (one row per edit)
//! and wide format (one row per edited field, one column per variant) are
//! derived views that reconstruct each other losslessly. Variant 0 is the
//! baseline everywhere; the converters never shift indices.

use anyhow::{Context, Result};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

use crate::apply::ModificationRecord;
use crate::plan::EditValue;

/// One variant's cell in a wide row.
#[derive(Debug, Clone, PartialEq)]
pub struct WideCell {
    pub new_value: Option<EditValue>,
    pub success: bool,
    pub rule_applied: Option<String>,
    pub message: Option<String>,
}

/// One wide row: a (building, field) key with per-variant cells.
#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub building_id: u64,
    pub category: String,
    pub object_type: String,
    pub object_name: String,
    pub field: String,
    pub change_type: String,
    pub original_value: Option<EditValue>,
    pub cells: BTreeMap<usize, WideCell>,
}

impl WideRow {
    pub fn parameter_key(&self) -> String {
        format!(
            "{}*{}*{}*{}",
            self.category, self.object_type, self.object_name, self.field
        )
    }

    /// Object scope used in exports: zone-level object types carry their
    /// zone in the object name suffix, building-level ones do not.
    pub fn parameter_scope(&self) -> &'static str {
        match self.object_type.to_ascii_uppercase().as_str() {
            "LIGHTS" | "ELECTRICEQUIPMENT" | "PEOPLE" | "ZONEINFILTRATION:DESIGNFLOWRATE"
            | "ZONEVENTILATION:DESIGNFLOWRATE" | "ZONEHVAC:IDEALLOADSAIRSYSTEM" => "zone",
            _ => "building",
        }
    }
}

type WideKey = (u64, String, String, String, String, String);

fn wide_key(record: &ModificationRecord) -> WideKey {
    (
        record.building_id,
        record.category.clone(),
        record.object_type.clone(),
        record.object_name.clone(),
        record.field.clone(),
        record.change_type.clone(),
    )
}

/// Pivot the relation into wide rows.
pub fn long_to_wide(records: &[ModificationRecord]) -> Vec<WideRow> {
    let mut rows: BTreeMap<WideKey, WideRow> = BTreeMap::new();
    for record in records {
        let row = rows.entry(wide_key(record)).or_insert_with(|| WideRow {
            building_id: record.building_id,
            category: record.category.clone(),
            object_type: record.object_type.clone(),
            object_name: record.object_name.clone(),
            field: record.field.clone(),
            change_type: record.change_type.clone(),
            original_value: record.original_value.clone(),
            cells: BTreeMap::new(),
        });
        if row.original_value != record.original_value {
            warn!(
                "inconsistent original value for {} across variants",
                record.parameter_key()
            );
        }
        if row
            .cells
            .insert(
                record.variant_id,
                WideCell {
                    new_value: record.new_value.clone(),
                    success: record.success,
                    rule_applied: record.rule_applied.clone(),
                    message: record.message.clone(),
                },
            )
            .is_some()
        {
            warn!(
                "duplicate record for {} variant {}",
                record.parameter_key(),
                record.variant_id
            );
        }
    }
    rows.into_values().collect()
}

/// Unpivot wide rows back into the relation.
pub fn wide_to_long(rows: &[WideRow]) -> Vec<ModificationRecord> {
    let mut records = Vec::new();
    for row in rows {
        for (variant_id, cell) in &row.cells {
            records.push(ModificationRecord {
                building_id: row.building_id,
                variant_id: *variant_id,
                category: row.category.clone(),
                object_type: row.object_type.clone(),
                object_name: row.object_name.clone(),
                field: row.field.clone(),
                original_value: row.original_value.clone(),
                new_value: cell.new_value.clone(),
                change_type: row.change_type.clone(),
                rule_applied: cell.rule_applied.clone(),
                success: cell.success,
                message: cell.message.clone(),
            });
        }
    }
    records
}

fn value_to_string(value: &Option<EditValue>) -> Option<String> {
    value.as_ref().map(|v| v.to_string())
}

/// The long view as a dataframe.
pub fn long_dataframe(records: &[ModificationRecord]) -> Result<DataFrame> {
    let building_ids: Vec<i64> = records.iter().map(|r| r.building_id as i64).collect();
    let variant_ids: Vec<i64> = records.iter().map(|r| r.variant_id as i64).collect();
    let parameter_keys: Vec<String> = records.iter().map(|r| r.parameter_key()).collect();
    let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
    let object_types: Vec<&str> = records.iter().map(|r| r.object_type.as_str()).collect();
    let object_names: Vec<&str> = records.iter().map(|r| r.object_name.as_str()).collect();
    let fields: Vec<&str> = records.iter().map(|r| r.field.as_str()).collect();
    let change_types: Vec<&str> = records.iter().map(|r| r.change_type.as_str()).collect();
    let originals: Vec<Option<String>> =
        records.iter().map(|r| value_to_string(&r.original_value)).collect();
    let new_values: Vec<Option<String>> =
        records.iter().map(|r| value_to_string(&r.new_value)).collect();
    let rules: Vec<Option<String>> = records.iter().map(|r| r.rule_applied.clone()).collect();
    let successes: Vec<bool> = records.iter().map(|r| r.success).collect();
    let messages: Vec<Option<String>> = records.iter().map(|r| r.message.clone()).collect();

    DataFrame::new(vec![
        Series::new("building_id", building_ids),
        Series::new("variant_id", variant_ids),
        Series::new("parameter_key", parameter_keys),
        Series::new("category", categories),
        Series::new("object_type", object_types),
        Series::new("object_name", object_names),
        Series::new("field", fields),
        Series::new("change_type", change_types),
        Series::new("original", originals),
        Series::new("new_value", new_values),
        Series::new("rule_applied", rules),
        Series::new("success", successes),
        Series::new("message", messages),
    ])
    .context("assembling long modification dataframe")
}

/// The wide view as a dataframe, one `variant_K` column per variant id seen.
pub fn wide_dataframe(rows: &[WideRow]) -> Result<DataFrame> {
    let mut variant_ids: Vec<usize> = rows
        .iter()
        .flat_map(|row| row.cells.keys().copied())
        .collect();
    variant_ids.sort_unstable();
    variant_ids.dedup();

    let building_ids: Vec<i64> = rows.iter().map(|r| r.building_id as i64).collect();
    let parameter_scopes: Vec<&str> = rows.iter().map(|r| r.parameter_scope()).collect();
    let parameter_keys: Vec<String> = rows.iter().map(|r| r.parameter_key()).collect();
    let categories: Vec<&str> = rows.iter().map(|r| r.category.as_str()).collect();
    let object_types: Vec<&str> = rows.iter().map(|r| r.object_type.as_str()).collect();
    let object_names: Vec<&str> = rows.iter().map(|r| r.object_name.as_str()).collect();
    let fields: Vec<&str> = rows.iter().map(|r| r.field.as_str()).collect();
    let change_types: Vec<&str> = rows.iter().map(|r| r.change_type.as_str()).collect();
    let originals: Vec<Option<String>> =
        rows.iter().map(|r| value_to_string(&r.original_value)).collect();

    let mut columns = vec![
        Series::new("building_id", building_ids),
        Series::new("parameter_scope", parameter_scopes),
        Series::new("parameter_key", parameter_keys),
        Series::new("category", categories),
        Series::new("object_type", object_types),
        Series::new("object_name", object_names),
        Series::new("field", fields),
        Series::new("change_type", change_types),
        Series::new("original", originals),
    ];
    for variant_id in variant_ids {
        let values: Vec<Option<String>> = rows
            .iter()
            .map(|row| {
                row.cells
                    .get(&variant_id)
                    .and_then(|cell| value_to_string(&cell.new_value))
            })
            .collect();
        columns.push(Series::new(&format!("variant_{variant_id}"), values));
    }
    DataFrame::new(columns).context("assembling wide modification dataframe")
}

#[cfg(feature = "parquet")]
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating '{}'", parent.display()))?;
    }
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("creating '{}'", path.display()))?;
    ParquetWriter::new(&mut file)
        .finish(df)
        .map(|_| ())
        .with_context(|| format!("writing parquet '{}'", path.display()))
}

#[cfg(not(feature = "parquet"))]
pub fn write_parquet(_df: &mut DataFrame, _path: &Path) -> Result<()> {
    anyhow::bail!("parquet support is disabled; rebuild with the 'parquet' feature")
}

/// Write both provenance exports next to the variant decks.
pub fn export_modification_details(
    records: &[ModificationRecord],
    out_dir: &Path,
) -> Result<(std::path::PathBuf, std::path::PathBuf)> {
    let long_path = out_dir.join("modifications_detail_long.parquet");
    let wide_path = out_dir.join("modifications_detail_wide.parquet");
    let mut long_df = long_dataframe(records)?;
    write_parquet(&mut long_df, &long_path)?;
    let mut wide_df = wide_dataframe(&long_to_wide(records))?;
    write_parquet(&mut wide_df, &wide_path)?;
    Ok((long_path, wide_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        variant_id: usize,
        field: &str,
        original: f64,
        new: f64,
        success: bool,
    ) -> ModificationRecord {
        ModificationRecord {
            building_id: 4136730,
            variant_id,
            category: "equipment".into(),
            object_type: "ELECTRICEQUIPMENT".into(),
            object_name: "Equip_ALL_ZONES".into(),
            field: field.into(),
            original_value: Some(EditValue::Number(original)),
            new_value: Some(EditValue::Number(new)),
            change_type: "absolute".into(),
            rule_applied: None,
            success,
            message: if success { None } else { Some("rejected".into()) },
        }
    }

    #[test]
    fn wide_row_matches_spec_example() {
        let records = vec![
            record(0, "Watts_per_Zone_Floor_Area", 10.0, 5.0, true),
            record(1, "Watts_per_Zone_Floor_Area", 10.0, 15.0, true),
            record(2, "Watts_per_Zone_Floor_Area", 10.0, 20.0, true),
        ];
        let rows = long_to_wide(&records);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(
            row.parameter_key(),
            "equipment*ELECTRICEQUIPMENT*Equip_ALL_ZONES*Watts_per_Zone_Floor_Area"
        );
        assert_eq!(row.original_value, Some(EditValue::Number(10.0)));
        assert_eq!(row.cells[&0].new_value, Some(EditValue::Number(5.0)));
        assert_eq!(row.cells[&1].new_value, Some(EditValue::Number(15.0)));
        assert_eq!(row.cells[&2].new_value, Some(EditValue::Number(20.0)));
    }

    #[test]
    fn round_trip_is_lossless_as_multisets() {
        let mut records = vec![
            record(0, "Watts_per_Zone_Floor_Area", 10.0, 5.0, true),
            record(1, "Watts_per_Zone_Floor_Area", 10.0, 15.0, true),
            record(2, "Watts_per_Zone_Floor_Area", 10.0, 20.0, false),
            record(1, "Design_Level", 100.0, 90.0, true),
        ];
        let mut back = wide_to_long(&long_to_wide(&records));
        let sort_key = |r: &ModificationRecord| (r.parameter_key(), r.variant_id);
        records.sort_by_key(sort_key);
        back.sort_by_key(sort_key);
        assert_eq!(records, back);
    }

    #[test]
    fn change_type_survives_round_trip() {
        let mut multiplier = record(1, "Watts_per_Zone_Floor_Area", 10.0, 15.0, true);
        multiplier.change_type = "multiplier".into();
        let back = wide_to_long(&long_to_wide(&[multiplier.clone()]));
        assert_eq!(back[0].change_type, "multiplier");
    }

    #[test]
    fn wide_dataframe_has_variant_columns() {
        let records = vec![
            record(0, "Watts_per_Zone_Floor_Area", 10.0, 5.0, true),
            record(2, "Watts_per_Zone_Floor_Area", 10.0, 20.0, true),
        ];
        let df = wide_dataframe(&long_to_wide(&records)).unwrap();
        let names = df.get_column_names();
        assert!(names.contains(&"variant_0"));
        assert!(names.contains(&"variant_2"));
        assert!(names.contains(&"parameter_key"));
        assert_eq!(df.height(), 1);
    }

    #[test]
    fn long_dataframe_columns_and_rows() {
        let records = vec![
            record(0, "Watts_per_Zone_Floor_Area", 10.0, 5.0, true),
            record(1, "Watts_per_Zone_Floor_Area", 10.0, 15.0, true),
        ];
        let df = long_dataframe(&records).unwrap();
        assert_eq!(df.height(), 2);
        assert!(df.get_column_names().contains(&"change_type"));
        let success = df.column("success").unwrap().bool().unwrap();
        assert_eq!(success.get(0), Some(true));
    }

    #[cfg(feature = "parquet")]
    #[test]
    fn exports_write_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            record(0, "Watts_per_Zone_Floor_Area", 10.0, 5.0, true),
            record(1, "Watts_per_Zone_Floor_Area", 10.0, 15.0, true),
        ];
        let (long_path, wide_path) =
            export_modification_details(&records, dir.path()).unwrap();
        assert!(long_path.exists());
        assert!(wide_path.exists());
    }
}
