//! Dependency rules between variant edits.
//!
//! Two relationship kinds survive mechanical application: `requires` (a
//! trigger edit must be accompanied by a companion; the engine injects the
//! companion with its default and notes the insertion) and `excludes`
//! (editing both sides of a pair in one variant is a hard validation error
//! raised before any edit is written).

use anyhow::Result;
use besim_core::BesimError;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::plan::{EditMethod, EditValue, ParameterEdit};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRule {
    pub name: String,
    pub description: String,
    /// Registry key whose presence in an edit list triggers the rule.
    pub trigger: String,
    /// Companions injected when missing: (registry key, default value).
    #[serde(default)]
    pub requires: Vec<(String, EditValue)>,
    /// Registry keys that may not be edited together with the trigger.
    #[serde(default)]
    pub excludes: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DependencyRuleEngine {
    rules: Vec<DependencyRule>,
}

impl DependencyRuleEngine {
    pub fn new(rules: Vec<DependencyRule>) -> Self {
        DependencyRuleEngine { rules }
    }

    /// The built-in rule set.
    pub fn with_defaults() -> Self {
        DependencyRuleEngine::new(vec![
            DependencyRule {
                name: "dcv_requires_co2_setpoint".into(),
                description: "Demand-controlled ventilation requires a CO2 setpoint schedule"
                    .into(),
                trigger: "ventilation*ZONEHVAC:IDEALLOADSAIRSYSTEM*Demand_Controlled_Ventilation_Type"
                    .into(),
                requires: vec![(
                    "hvac*ZONECONTROL:CONTAMINANTCONTROLLER*Carbon_Dioxide_Setpoint_Schedule_Name"
                        .into(),
                    EditValue::Text("CO2_Setpoint_Sched".into()),
                )],
                excludes: vec![],
            },
            DependencyRule {
                name: "glazing_u_tracks_shgc".into(),
                description: "A glazing U-factor change must pin the solar heat gain coefficient"
                    .into(),
                trigger: "fenestration*WINDOWMATERIAL:SIMPLEGLAZINGSYSTEM*UFactor".into(),
                requires: vec![(
                    "fenestration*WINDOWMATERIAL:SIMPLEGLAZINGSYSTEM*Solar_Heat_Gain_Coefficient"
                        .into(),
                    EditValue::Number(0.6),
                )],
                excludes: vec![],
            },
            DependencyRule {
                name: "natural_vent_excludes_demand_control".into(),
                description:
                    "Boosting zone natural/mechanical ventilation conflicts with tight \
                     demand-controlled ventilation"
                        .into(),
                trigger: "ventilation*ZONEVENTILATION:DESIGNFLOWRATE*Design_Flow_Rate".into(),
                requires: vec![],
                excludes: vec![
                    "ventilation*ZONEHVAC:IDEALLOADSAIRSYSTEM*Demand_Controlled_Ventilation_Type"
                        .into(),
                ],
            },
        ])
    }

    pub fn rules(&self) -> &[DependencyRule] {
        &self.rules
    }

    /// Check an edit list: returns the edits to append (injected
    /// companions), or a [`BesimError::ConflictingMods`] when an exclusion
    /// fires. Nothing is written on error.
    pub fn check(&self, edits: &[ParameterEdit]) -> Result<Vec<ParameterEdit>> {
        let edited: Vec<&str> = edits.iter().map(|edit| edit.key.as_str()).collect();
        let mut injected: Vec<ParameterEdit> = Vec::new();
        for rule in &self.rules {
            if !edited.contains(&rule.trigger.as_str()) {
                continue;
            }
            for excluded in &rule.excludes {
                if edited.contains(&excluded.as_str()) {
                    return Err(BesimError::ConflictingMods(format!(
                        "rule '{}': '{}' and '{}' may not be edited together",
                        rule.name, rule.trigger, excluded
                    ))
                    .into());
                }
            }
            for (companion, default) in &rule.requires {
                let already_present = edited.contains(&companion.as_str())
                    || injected.iter().any(|edit| &edit.key == companion);
                if already_present {
                    continue;
                }
                info!(
                    "rule '{}' injecting companion edit '{companion}'",
                    rule.name
                );
                injected.push(ParameterEdit {
                    key: companion.clone(),
                    method: EditMethod::Absolute {
                        value: default.clone(),
                    },
                    rule_applied: Some(rule.name.clone()),
                });
            }
        }
        Ok(injected)
    }
}
