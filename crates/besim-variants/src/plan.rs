//! Scenario plans: the five ways a variant batch can be specified, and
//! their expansion into concrete per-variant edit lists.

use anyhow::{anyhow, bail, Context, Result};
use besim_registry::ParameterRegistry;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::sampling::{sample, SampledParameter, SamplingMethod};

/// A value an edit writes: numeric for most fields, text for choice and
/// schedule-name fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EditValue {
    Number(f64),
    Text(String),
}

impl EditValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EditValue::Number(n) => Some(*n),
            EditValue::Text(_) => None,
        }
    }
}

impl std::fmt::Display for EditValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EditValue::Number(n) => write!(f, "{n}"),
            EditValue::Text(t) => f.write_str(t),
        }
    }
}

/// How an edit derives the new value from the current one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum EditMethod {
    /// Set the field to the value.
    Absolute { value: EditValue },
    /// Multiply the existing numeric field.
    Multiplier { factor: f64 },
    /// Add a signed percentage of the existing numeric field.
    Percentage { percent: f64 },
}

impl EditMethod {
    pub fn change_type(&self) -> &'static str {
        match self {
            EditMethod::Absolute { .. } => "absolute",
            EditMethod::Multiplier { .. } => "multiplier",
            EditMethod::Percentage { .. } => "percentage",
        }
    }
}

/// One parameter edit addressed by registry key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEdit {
    /// Canonical `category*OBJECT_TYPE*field` registry key.
    pub key: String,
    #[serde(flatten)]
    pub method: EditMethod,
    /// Set when a dependency rule injected this edit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_applied: Option<String>,
}

impl ParameterEdit {
    pub fn absolute(key: impl Into<String>, value: f64) -> ParameterEdit {
        ParameterEdit {
            key: key.into(),
            method: EditMethod::Absolute {
                value: EditValue::Number(value),
            },
            rule_applied: None,
        }
    }

    pub fn absolute_text(key: impl Into<String>, value: impl Into<String>) -> ParameterEdit {
        ParameterEdit {
            key: key.into(),
            method: EditMethod::Absolute {
                value: EditValue::Text(value.into()),
            },
            rule_applied: None,
        }
    }

    pub fn multiplier(key: impl Into<String>, factor: f64) -> ParameterEdit {
        ParameterEdit {
            key: key.into(),
            method: EditMethod::Multiplier { factor },
            rule_applied: None,
        }
    }

    pub fn percentage(key: impl Into<String>, percent: f64) -> ParameterEdit {
        ParameterEdit {
            key: key.into(),
            method: EditMethod::Percentage { percent },
            rule_applied: None,
        }
    }

    /// Split the registry key into (category, object_type, field).
    pub fn key_parts(&self) -> Result<(&str, &str, &str)> {
        let mut parts = self.key.split('*');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(category), Some(object_type), Some(field), None) => {
                Ok((category, object_type, field))
            }
            _ => Err(anyhow!(
                "edit key '{}' is not category*OBJECT_TYPE*field",
                self.key
            )),
        }
    }
}

/// One concrete variant scenario: an ordered edit list plus metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantScenario {
    pub id: String,
    pub name: String,
    pub description: String,
    pub strategy: String,
    pub edits: Vec<ParameterEdit>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// A variant batch specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScenarioPlan {
    /// A named template from [`TEMPLATE_NAMES`].
    Predefined { template: String },
    /// Sampled edits over parameter ranges.
    Parametric {
        parameters: Vec<SampledParameter>,
        num_scenarios: usize,
        method: SamplingMethod,
    },
    /// Objective-weighted strategy edits.
    Optimization {
        objectives: Vec<ObjectiveWeight>,
    },
    /// One-at-a-time sensitivity deltas around the base deck.
    Sensitivity {
        parameters: Vec<String>,
        delta_percent: f64,
    },
    /// A retrofit package keyed by stock segment.
    Retrofit {
        age_band: String,
        climate_zone: String,
        budget_level: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectiveWeight {
    pub objective: String,
    pub weight: f64,
}

/// Load a plan from YAML or JSON, sniffing by extension.
pub fn load_plan_from_path(path: &Path) -> Result<ScenarioPlan> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading scenario plan '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing scenario plan yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing scenario plan json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing scenario plan"),
    }
}

const KEY_COP: &str = "hvac*COIL:COOLING:DX:SINGLESPEED*Gross_Rated_COP";
const KEY_HEAT_EFF: &str = "hvac*COIL:HEATING:ELECTRIC*Efficiency";
const KEY_LPD: &str = "lighting*LIGHTS*Watts_per_Zone_Floor_Area";
const KEY_EPD: &str = "equipment*ELECTRICEQUIPMENT*Watts_per_Zone_Floor_Area";
const KEY_INFIL: &str = "infiltration*ZONEINFILTRATION:DESIGNFLOWRATE*Design_Flow_Rate";
const KEY_VENT_FLOW: &str = "ventilation*ZONEVENTILATION:DESIGNFLOWRATE*Design_Flow_Rate";
const KEY_CONDUCTIVITY: &str = "materials*MATERIAL*Conductivity";
const KEY_THICKNESS: &str = "materials*MATERIAL*Thickness";
const KEY_WINDOW_U: &str = "fenestration*WINDOWMATERIAL:SIMPLEGLAZINGSYSTEM*UFactor";
const KEY_SHADING_SP: &str = "shading*WINDOWSHADINGCONTROL*Setpoint";

/// The predefined template names, for validation and listings.
pub const TEMPLATE_NAMES: [&str; 7] = [
    "baseline",
    "code_minimum",
    "high_performance_envelope",
    "efficient_hvac",
    "reduced_loads",
    "passive_strategies",
    "net_zero_ready",
];

fn template(name: &str, registry: &ParameterRegistry) -> Result<VariantScenario> {
    let edits = match name {
        "baseline" => vec![],
        "code_minimum" => {
            let cop = registry
                .code_requirement(KEY_COP, "ASHRAE_90.1", "2022")
                .unwrap_or(3.0);
            let window_u = registry
                .code_requirement(KEY_WINDOW_U, "ASHRAE_90.1", "2022")
                .unwrap_or(2.5);
            vec![
                ParameterEdit::absolute(KEY_COP, cop),
                ParameterEdit::absolute(KEY_HEAT_EFF, 0.8),
                ParameterEdit::absolute(KEY_WINDOW_U, window_u),
            ]
        }
        "high_performance_envelope" => vec![
            ParameterEdit::multiplier(KEY_CONDUCTIVITY, 0.5),
            ParameterEdit::multiplier(KEY_THICKNESS, 1.5),
            ParameterEdit::multiplier(KEY_INFIL, 0.3),
        ],
        "efficient_hvac" => vec![
            ParameterEdit::multiplier(KEY_COP, 1.4),
            ParameterEdit::multiplier(KEY_HEAT_EFF, 1.25),
        ],
        "reduced_loads" => vec![
            ParameterEdit::multiplier(KEY_LPD, 0.5),
            ParameterEdit::multiplier(KEY_EPD, 0.7),
        ],
        "passive_strategies" => vec![
            ParameterEdit::multiplier(KEY_VENT_FLOW, 1.5),
            ParameterEdit::multiplier(KEY_SHADING_SP, 0.7),
        ],
        "net_zero_ready" => vec![
            ParameterEdit::multiplier(KEY_CONDUCTIVITY, 0.3),
            ParameterEdit::multiplier(KEY_INFIL, 0.2),
            ParameterEdit::multiplier(KEY_COP, 1.6),
            ParameterEdit::multiplier(KEY_LPD, 0.3),
            ParameterEdit::multiplier(KEY_EPD, 0.5),
        ],
        other => bail!("unknown scenario template '{other}'"),
    };
    Ok(VariantScenario {
        id: name.to_string(),
        name: name.replace('_', " "),
        description: format!("predefined template '{name}'"),
        strategy: "predefined".into(),
        edits,
        metadata: BTreeMap::new(),
    })
}

fn objective_edits(objective: &str, weight: f64) -> Result<Vec<ParameterEdit>> {
    // Edit depth scales with the objective's weight.
    let depth = weight.clamp(0.0, 1.0);
    let edits = match objective {
        "energy" => vec![
            ParameterEdit::multiplier(KEY_CONDUCTIVITY, 1.0 - 0.5 * depth),
            ParameterEdit::multiplier(KEY_COP, 1.0 + 0.5 * depth),
            ParameterEdit::multiplier(KEY_LPD, 1.0 - 0.5 * depth),
            ParameterEdit::multiplier(KEY_EPD, 1.0 - 0.3 * depth),
        ],
        "comfort" => vec![
            ParameterEdit::multiplier(KEY_VENT_FLOW, 1.0 + 0.3 * depth),
            ParameterEdit::multiplier(KEY_SHADING_SP, 1.0 - 0.3 * depth),
        ],
        "cost" => vec![
            ParameterEdit::multiplier(KEY_LPD, 1.0 - 0.4 * depth),
            ParameterEdit::multiplier(KEY_EPD, 1.0 - 0.4 * depth),
            ParameterEdit::multiplier(KEY_INFIL, 1.0 - 0.2 * depth),
        ],
        other => bail!("unknown optimization objective '{other}'"),
    };
    Ok(edits)
}

fn retrofit_edits(age_band: &str, budget_level: &str) -> Result<Vec<ParameterEdit>> {
    // Older stock gets deeper envelope measures at the same budget.
    let age_boost = if matches!(age_band, "< 1945" | "1945 - 1964" | "1965 - 1974") {
        0.1
    } else {
        0.0
    };
    let edits = match budget_level {
        "basic" => vec![
            ParameterEdit::multiplier(KEY_INFIL, 0.7 - age_boost),
            ParameterEdit::absolute(KEY_WINDOW_U, 1.8),
        ],
        "standard" => vec![
            ParameterEdit::multiplier(KEY_INFIL, 0.5 - age_boost),
            ParameterEdit::absolute(KEY_WINDOW_U, 1.4),
            ParameterEdit::multiplier(KEY_CONDUCTIVITY, 0.6),
            ParameterEdit::multiplier(KEY_LPD, 0.6),
        ],
        "premium" => vec![
            ParameterEdit::multiplier(KEY_INFIL, 0.3 - age_boost),
            ParameterEdit::absolute(KEY_WINDOW_U, 1.0),
            ParameterEdit::multiplier(KEY_CONDUCTIVITY, 0.4),
            ParameterEdit::multiplier(KEY_LPD, 0.4),
            ParameterEdit::multiplier(KEY_EPD, 0.6),
            ParameterEdit::multiplier(KEY_COP, 1.5),
        ],
        other => bail!("unknown retrofit budget level '{other}'"),
    };
    Ok(edits)
}

/// Expand a plan into concrete scenarios.
pub fn expand_plan(
    plan: &ScenarioPlan,
    registry: &ParameterRegistry,
    rng: &mut StdRng,
) -> Result<Vec<VariantScenario>> {
    match plan {
        ScenarioPlan::Predefined { template: name } => Ok(vec![template(name, registry)?]),
        ScenarioPlan::Parametric {
            parameters,
            num_scenarios,
            method,
        } => {
            for parameter in parameters {
                if !registry.contains(&parameter.key) {
                    bail!("sampled parameter '{}' is not in the registry", parameter.key);
                }
            }
            let rows = sample(parameters, *num_scenarios, *method, rng)?;
            Ok(rows
                .into_iter()
                .enumerate()
                .map(|(i, row)| {
                    let edits = parameters
                        .iter()
                        .zip(&row)
                        .map(|(parameter, value)| {
                            ParameterEdit::absolute(parameter.key.clone(), *value)
                        })
                        .collect();
                    let mut metadata = BTreeMap::new();
                    metadata.insert("sampling_method".into(), format!("{method:?}"));
                    metadata.insert("sample_index".into(), i.to_string());
                    VariantScenario {
                        id: format!("sample_{i:03}"),
                        name: format!("Parametric Sample {}", i + 1),
                        description: format!("generated with {method:?} sampling"),
                        strategy: "parametric".into(),
                        edits,
                        metadata,
                    }
                })
                .collect())
        }
        ScenarioPlan::Optimization { objectives } => {
            if objectives.is_empty() {
                bail!("optimization plan has no objectives");
            }
            objectives
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let edits = objective_edits(&item.objective, item.weight)?;
                    let mut metadata = BTreeMap::new();
                    metadata.insert("objective".into(), item.objective.clone());
                    metadata.insert("weight".into(), item.weight.to_string());
                    Ok(VariantScenario {
                        id: format!("opt_{i:03}_{}", item.objective),
                        name: format!("Optimize {}", item.objective),
                        description: format!(
                            "objective '{}' at weight {}",
                            item.objective, item.weight
                        ),
                        strategy: "optimization".into(),
                        edits,
                        metadata,
                    })
                })
                .collect()
        }
        ScenarioPlan::Sensitivity {
            parameters,
            delta_percent,
        } => {
            if parameters.is_empty() {
                bail!("sensitivity plan has no parameters");
            }
            let mut scenarios = Vec::with_capacity(parameters.len() * 2);
            for key in parameters {
                if !registry.contains(key) {
                    bail!("sensitivity parameter '{key}' is not in the registry");
                }
                for sign in [1.0, -1.0] {
                    let percent = sign * delta_percent;
                    let direction = if sign > 0.0 { "up" } else { "down" };
                    let mut metadata = BTreeMap::new();
                    metadata.insert("parameter".into(), key.clone());
                    metadata.insert("delta_percent".into(), percent.to_string());
                    scenarios.push(VariantScenario {
                        id: format!("oat_{}_{direction}", sanitize_id(key)),
                        name: format!("{key} {percent:+}%"),
                        description: "one-at-a-time sensitivity delta".into(),
                        strategy: "sensitivity".into(),
                        edits: vec![ParameterEdit::percentage(key.clone(), percent)],
                        metadata,
                    });
                }
            }
            Ok(scenarios)
        }
        ScenarioPlan::Retrofit {
            age_band,
            climate_zone,
            budget_level,
        } => {
            let edits = retrofit_edits(age_band, budget_level)?;
            let mut metadata = BTreeMap::new();
            metadata.insert("age_band".into(), age_band.clone());
            metadata.insert("climate_zone".into(), climate_zone.clone());
            metadata.insert("budget_level".into(), budget_level.clone());
            Ok(vec![VariantScenario {
                id: format!("retrofit_{}", sanitize_id(budget_level)),
                name: format!("Retrofit package ({budget_level})"),
                description: format!(
                    "retrofit for stock {age_band} in climate {climate_zone}"
                ),
                strategy: "retrofit".into(),
                edits,
                metadata,
            }])
        }
    }
}

fn sanitize_id(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use besim_core::ParameterRange;
    use rand::SeedableRng;

    #[test]
    fn every_template_expands() {
        let registry = ParameterRegistry::with_defaults();
        let mut rng = StdRng::seed_from_u64(1);
        for name in TEMPLATE_NAMES {
            let plan = ScenarioPlan::Predefined {
                template: name.into(),
            };
            let scenarios = expand_plan(&plan, &registry, &mut rng).unwrap();
            assert_eq!(scenarios.len(), 1);
            if name == "baseline" {
                assert!(scenarios[0].edits.is_empty());
            }
        }
    }

    #[test]
    fn code_minimum_pulls_registry_code_values() {
        let registry = ParameterRegistry::with_defaults();
        let mut rng = StdRng::seed_from_u64(1);
        let plan = ScenarioPlan::Predefined {
            template: "code_minimum".into(),
        };
        let scenarios = expand_plan(&plan, &registry, &mut rng).unwrap();
        let cop_edit = scenarios[0]
            .edits
            .iter()
            .find(|edit| edit.key == KEY_COP)
            .unwrap();
        assert_eq!(
            cop_edit.method,
            EditMethod::Absolute {
                value: EditValue::Number(3.2)
            }
        );
    }

    #[test]
    fn parametric_plan_expands_to_sample_count() {
        let registry = ParameterRegistry::with_defaults();
        let mut rng = StdRng::seed_from_u64(2);
        let plan = ScenarioPlan::Parametric {
            parameters: vec![SampledParameter {
                key: KEY_LPD.into(),
                range: ParameterRange::new(4.0, 12.0),
                discrete_values: None,
            }],
            num_scenarios: 5,
            method: SamplingMethod::LatinHypercube,
        };
        let scenarios = expand_plan(&plan, &registry, &mut rng).unwrap();
        assert_eq!(scenarios.len(), 5);
        for scenario in &scenarios {
            assert_eq!(scenario.edits.len(), 1);
            let value = match &scenario.edits[0].method {
                EditMethod::Absolute { value } => value.as_number().unwrap(),
                other => panic!("expected absolute, got {other:?}"),
            };
            assert!((4.0..=12.0).contains(&value));
        }
    }

    #[test]
    fn unknown_sampled_parameter_is_rejected() {
        let registry = ParameterRegistry::with_defaults();
        let mut rng = StdRng::seed_from_u64(2);
        let plan = ScenarioPlan::Parametric {
            parameters: vec![SampledParameter {
                key: "nope*MISSING*Field".into(),
                range: ParameterRange::new(0.0, 1.0),
                discrete_values: None,
            }],
            num_scenarios: 2,
            method: SamplingMethod::Uniform,
        };
        assert!(expand_plan(&plan, &registry, &mut rng).is_err());
    }

    #[test]
    fn sensitivity_produces_up_and_down_deltas() {
        let registry = ParameterRegistry::with_defaults();
        let mut rng = StdRng::seed_from_u64(2);
        let plan = ScenarioPlan::Sensitivity {
            parameters: vec![KEY_LPD.into(), KEY_EPD.into()],
            delta_percent: 10.0,
        };
        let scenarios = expand_plan(&plan, &registry, &mut rng).unwrap();
        assert_eq!(scenarios.len(), 4);
        let percents: Vec<f64> = scenarios
            .iter()
            .map(|s| match &s.edits[0].method {
                EditMethod::Percentage { percent } => *percent,
                other => panic!("expected percentage, got {other:?}"),
            })
            .collect();
        assert_eq!(percents, vec![10.0, -10.0, 10.0, -10.0]);
    }

    #[test]
    fn plan_round_trips_through_yaml() {
        let plan = ScenarioPlan::Retrofit {
            age_band: "< 1945".into(),
            climate_zone: "4A".into(),
            budget_level: "standard".into(),
        };
        let yaml = serde_yaml::to_string(&plan).unwrap();
        let parsed: ScenarioPlan = serde_yaml::from_str(&yaml).unwrap();
        match parsed {
            ScenarioPlan::Retrofit { budget_level, .. } => {
                assert_eq!(budget_level, "standard")
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }
}
