//! Applying a variant scenario's edits to a cloned deck.
//!
//! Every attempted edit produces one [`ModificationRecord`], successful or
//! not: edits that violate registry bounds or types are skipped and marked
//! `success = false` with the validator's message. Conflicting edits abort
//! the variant before anything is written.

use anyhow::Result;
use besim_deck::{Deck, FieldValue};
use besim_registry::{ParamValue, ParameterRegistry};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::plan::{EditMethod, EditValue, ParameterEdit, VariantScenario};
use crate::rules::DependencyRuleEngine;

/// One edit applied (or refused) on one object. Doubles as the provenance
/// relation row; the long and wide exports are views over it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModificationRecord {
    pub building_id: u64,
    pub variant_id: usize,
    pub category: String,
    pub object_type: String,
    pub object_name: String,
    pub field: String,
    pub original_value: Option<EditValue>,
    pub new_value: Option<EditValue>,
    pub change_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_applied: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ModificationRecord {
    /// `<category>*<object_type>*<object_name>*<field>`; components never
    /// contain the delimiter.
    pub fn parameter_key(&self) -> String {
        format!(
            "{}*{}*{}*{}",
            self.category, self.object_type, self.object_name, self.field
        )
    }
}

fn field_to_edit_value(value: &FieldValue) -> Option<EditValue> {
    match value {
        FieldValue::Empty => None,
        FieldValue::Number(n) => Some(EditValue::Number(*n)),
        FieldValue::Text(t) => Some(EditValue::Text(t.clone())),
    }
}

fn edit_to_field_value(value: &EditValue) -> FieldValue {
    match value {
        EditValue::Number(n) => FieldValue::Number(*n),
        EditValue::Text(t) => FieldValue::Text(t.clone()),
    }
}

fn edit_to_param_value(value: &EditValue) -> ParamValue {
    match value {
        EditValue::Number(n) => ParamValue::Number(*n),
        EditValue::Text(t) => ParamValue::Text(t.clone()),
    }
}

/// Apply one scenario to a deck, appending a record per attempted edit.
///
/// Dependency rules run first: injected companions are appended to the edit
/// list with their rule name; exclusions abort the variant with
/// `ConflictingMods` before any write.
pub fn apply_scenario(
    deck: &mut Deck,
    scenario: &VariantScenario,
    registry: &ParameterRegistry,
    rules: &DependencyRuleEngine,
    building_id: u64,
    variant_id: usize,
) -> Result<Vec<ModificationRecord>> {
    let injected = rules.check(&scenario.edits)?;
    let mut edits = scenario.edits.clone();
    edits.extend(injected);

    let mut records = Vec::new();
    for edit in &edits {
        apply_edit(deck, edit, registry, building_id, variant_id, &mut records)?;
    }
    Ok(records)
}

fn apply_edit(
    deck: &mut Deck,
    edit: &ParameterEdit,
    registry: &ParameterRegistry,
    building_id: u64,
    variant_id: usize,
    records: &mut Vec<ModificationRecord>,
) -> Result<()> {
    let (category, object_type, field) = edit.key_parts()?;
    let record_stub = |object_name: String| ModificationRecord {
        building_id,
        variant_id,
        category: category.to_string(),
        object_type: object_type.to_string(),
        object_name,
        field: field.to_string(),
        original_value: None,
        new_value: None,
        change_type: edit.method.change_type().to_string(),
        rule_applied: edit.rule_applied.clone(),
        success: false,
        message: None,
    };

    let object_names: Vec<String> = deck
        .objects_of_type(object_type)
        .filter_map(|obj| obj.name().map(str::to_string))
        .collect();
    if object_names.is_empty() {
        let mut record = record_stub(String::new());
        let message = format!("deck has no {object_type} objects");
        warn!("edit '{}' skipped: {message}", edit.key);
        record.message = Some(message);
        records.push(record);
        return Ok(());
    }

    for object_name in object_names {
        let mut record = record_stub(object_name.clone());
        let original = deck
            .get(object_type, &object_name)
            .and_then(|obj| obj.get_field(field))
            .map(field_to_edit_value)
            .unwrap_or(None);
        record.original_value = original.clone();

        let candidate = match (&edit.method, &original) {
            (EditMethod::Absolute { value }, _) => value.clone(),
            (EditMethod::Multiplier { factor }, Some(EditValue::Number(current))) => {
                EditValue::Number(current * factor)
            }
            (EditMethod::Percentage { percent }, Some(EditValue::Number(current))) => {
                EditValue::Number(current * (1.0 + percent / 100.0))
            }
            (method, _) => {
                let message = format!(
                    "{} edit needs a numeric current value on '{object_name}.{field}'",
                    method.change_type()
                );
                warn!("edit '{}' skipped: {message}", edit.key);
                record.message = Some(message);
                records.push(record);
                continue;
            }
        };

        if registry.contains(&edit.key) {
            if let Err(err) = registry.validate_value(&edit.key, &edit_to_param_value(&candidate)) {
                record.message = Some(err.to_string());
                warn!("edit '{}' rejected on '{object_name}': {err}", edit.key);
                records.push(record);
                continue;
            }
        }

        let write = deck
            .get_mut(object_type, &object_name)
            .expect("object listed above still present")
            .set_field(field, edit_to_field_value(&candidate));
        match write {
            Ok(()) => {
                record.new_value = Some(candidate);
                record.success = true;
            }
            Err(err) => {
                record.message = Some(err.to_string());
                warn!("edit '{}' failed on '{object_name}': {err}", edit.key);
            }
        }
        records.push(record);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::ParameterEdit;
    use besim_deck::{parse_deck, DeckObject};

    const LIGHTS_KEY: &str = "lighting*LIGHTS*Watts_per_Zone_Floor_Area";

    fn deck_with_lights(watts: f64) -> Deck {
        let mut deck = parse_deck("Zone,\n  Z1, 0, 0, 0, 0, 1, 1, 2.7, 270, 100;\n").unwrap();
        let lights = DeckObject::named("Lights", "Lights_Z1")
            .with_field("Zone_or_ZoneList_Name", FieldValue::text("Z1"))
            .with_field("Schedule_Name", FieldValue::text("Sched"))
            .with_field("Design_Level_Calculation_Method", FieldValue::text("Watts/Area"))
            .with_field("Lighting_Level", FieldValue::Empty)
            .with_field("Watts_per_Zone_Floor_Area", FieldValue::Number(watts));
        deck.upsert(lights).unwrap();
        deck
    }

    fn scenario(edits: Vec<ParameterEdit>) -> VariantScenario {
        VariantScenario {
            id: "test".into(),
            name: "Test".into(),
            description: String::new(),
            strategy: "test".into(),
            edits,
            metadata: Default::default(),
        }
    }

    #[test]
    fn multiplier_edit_writes_and_records() {
        let mut deck = deck_with_lights(10.0);
        let registry = ParameterRegistry::with_defaults();
        let rules = DependencyRuleEngine::with_defaults();
        let records = apply_scenario(
            &mut deck,
            &scenario(vec![ParameterEdit::multiplier(LIGHTS_KEY, 0.5)]),
            &registry,
            &rules,
            7,
            1,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert!(record.success);
        assert_eq!(record.original_value, Some(EditValue::Number(10.0)));
        assert_eq!(record.new_value, Some(EditValue::Number(5.0)));
        assert_eq!(record.change_type, "multiplier");
        assert_eq!(
            record.parameter_key(),
            "lighting*LIGHTS*Lights_Z1*Watts_per_Zone_Floor_Area"
        );
        let lights = deck.get("LIGHTS", "Lights_Z1").unwrap();
        assert_eq!(lights.number("Watts_per_Zone_Floor_Area"), Some(5.0));
    }

    #[test]
    fn out_of_bounds_edit_is_skipped_and_marked() {
        let mut deck = deck_with_lights(25.0);
        let registry = ParameterRegistry::with_defaults();
        let rules = DependencyRuleEngine::with_defaults();
        // 25 * 2 = 50 exceeds the registry max of 30 W/m2
        let records = apply_scenario(
            &mut deck,
            &scenario(vec![ParameterEdit::multiplier(LIGHTS_KEY, 2.0)]),
            &registry,
            &rules,
            7,
            1,
        )
        .unwrap();
        assert!(!records[0].success);
        assert!(records[0].message.as_deref().unwrap().contains("maximum"));
        // field untouched
        let lights = deck.get("LIGHTS", "Lights_Z1").unwrap();
        assert_eq!(lights.number("Watts_per_Zone_Floor_Area"), Some(25.0));
    }

    #[test]
    fn percentage_edit_adds_signed_percent() {
        let mut deck = deck_with_lights(10.0);
        let registry = ParameterRegistry::with_defaults();
        let rules = DependencyRuleEngine::with_defaults();
        let records = apply_scenario(
            &mut deck,
            &scenario(vec![ParameterEdit::percentage(LIGHTS_KEY, -10.0)]),
            &registry,
            &rules,
            7,
            2,
        )
        .unwrap();
        assert_eq!(records[0].new_value, Some(EditValue::Number(9.0)));
    }

    #[test]
    fn missing_object_type_records_failure() {
        let mut deck = deck_with_lights(10.0);
        let registry = ParameterRegistry::with_defaults();
        let rules = DependencyRuleEngine::with_defaults();
        let records = apply_scenario(
            &mut deck,
            &scenario(vec![ParameterEdit::multiplier(
                "hvac*COIL:COOLING:DX:SINGLESPEED*Gross_Rated_COP",
                1.2,
            )]),
            &registry,
            &rules,
            7,
            1,
        )
        .unwrap();
        assert!(!records[0].success);
        assert!(records[0].message.as_deref().unwrap().contains("no"));
    }

    #[test]
    fn conflicting_edits_abort_before_any_write() {
        let mut deck = deck_with_lights(10.0);
        let registry = ParameterRegistry::with_defaults();
        let rules = DependencyRuleEngine::with_defaults();
        let result = apply_scenario(
            &mut deck,
            &scenario(vec![
                ParameterEdit::multiplier(LIGHTS_KEY, 0.5),
                ParameterEdit::multiplier(
                    "ventilation*ZONEVENTILATION:DESIGNFLOWRATE*Design_Flow_Rate",
                    1.5,
                ),
                ParameterEdit::absolute_text(
                    "ventilation*ZONEHVAC:IDEALLOADSAIRSYSTEM*Demand_Controlled_Ventilation_Type",
                    "CO2Setpoint",
                ),
            ]),
            &registry,
            &rules,
            7,
            1,
        );
        assert!(result.is_err());
        // nothing written
        let lights = deck.get("LIGHTS", "Lights_Z1").unwrap();
        assert_eq!(lights.number("Watts_per_Zone_Floor_Area"), Some(10.0));
    }
}
