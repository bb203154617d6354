//! # besim-registry: Canonical Parameter Catalog
//!
//! The single source of truth for modifiable deck parameters: which object
//! field a canonical key refers to, its type, units and bounds, the
//! code-minimum values per (standard, version), and the tag/impact metadata
//! the variant generator searches by.
//!
//! Keys are `<category>*<OBJECT_TYPE>*<field_name>` with `*` as the
//! delimiter; components never contain `*`. Secondary indexes (category,
//! object type, tag, performance impact) are rebuilt whenever an entry is
//! registered, so lookups are allocation-free at query time.

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Declared type of a registry field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float,
    Integer,
    Choice,
    Text,
}

/// A value being validated against a registry entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            ParamValue::Text(_) => None,
        }
    }
}

/// One catalog entry. `min_value`/`max_value` bound numeric edits;
/// `allowed_values` closes the set for choice fields; `code_requirements`
/// maps standard name to version to the code-minimum value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub category: String,
    pub object_type: String,
    pub field_name: String,
    pub field_index: usize,
    pub data_type: DataType,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub default_value: Option<f64>,
    #[serde(default)]
    pub allowed_values: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub performance_impact: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub code_requirements: BTreeMap<String, BTreeMap<String, f64>>,
}

impl ParameterInfo {
    /// Canonical registry key for this entry.
    pub fn key(&self) -> String {
        format!("{}*{}*{}", self.category, self.object_type, self.field_name)
    }
}

/// Multi-criteria search filter; all present criteria must match.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub category: Option<String>,
    pub object_type: Option<String>,
    pub tag: Option<String>,
    pub performance_impact: Option<String>,
    pub units: Option<String>,
}

/// The registry: primary key map plus secondary indexes rebuilt on insert.
#[derive(Debug, Clone, Default)]
pub struct ParameterRegistry {
    parameters: BTreeMap<String, ParameterInfo>,
    by_category: BTreeMap<String, Vec<String>>,
    by_object: BTreeMap<String, Vec<String>>,
    by_tag: BTreeMap<String, Vec<String>>,
    by_impact: BTreeMap<String, Vec<String>>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the built-in catalog.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for info in default_parameters() {
            // Built-in entries are well-formed by construction.
            registry
                .register(info.clone())
                .expect("built-in registry entry is valid");
        }
        registry
    }

    /// Register an entry, replacing any previous entry under the same key.
    /// Returns the key.
    pub fn register(&mut self, info: ParameterInfo) -> Result<String> {
        for (label, part) in [
            ("category", &info.category),
            ("object_type", &info.object_type),
            ("field_name", &info.field_name),
        ] {
            if part.is_empty() {
                bail!("registry entry has empty {label}");
            }
            if part.contains('*') {
                bail!("registry {label} '{part}' contains the key delimiter '*'");
            }
        }
        if let (Some(min), Some(max)) = (info.min_value, info.max_value) {
            if min > max {
                bail!("registry entry '{}' has min {min} > max {max}", info.key());
            }
        }
        let key = info.key();
        self.parameters.insert(key.clone(), info);
        self.rebuild_indexes();
        Ok(key)
    }

    fn rebuild_indexes(&mut self) {
        self.by_category.clear();
        self.by_object.clear();
        self.by_tag.clear();
        self.by_impact.clear();
        for (key, info) in &self.parameters {
            self.by_category
                .entry(info.category.clone())
                .or_default()
                .push(key.clone());
            self.by_object
                .entry(info.object_type.to_ascii_uppercase())
                .or_default()
                .push(key.clone());
            for tag in &info.tags {
                self.by_tag.entry(tag.clone()).or_default().push(key.clone());
            }
            if !info.performance_impact.is_empty() {
                self.by_impact
                    .entry(info.performance_impact.clone())
                    .or_default()
                    .push(key.clone());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.parameters.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParameterInfo> {
        self.parameters.get(key)
    }

    /// Look up by (object_type, field_name) irrespective of category.
    pub fn find_field(&self, object_type: &str, field_name: &str) -> Option<&ParameterInfo> {
        let object_upper = object_type.to_ascii_uppercase();
        self.by_object.get(&object_upper).and_then(|keys| {
            keys.iter()
                .filter_map(|k| self.parameters.get(k))
                .find(|info| info.field_name.eq_ignore_ascii_case(field_name))
        })
    }

    pub fn by_category(&self, category: &str) -> Vec<&ParameterInfo> {
        self.resolve(self.by_category.get(category))
    }

    pub fn by_object_type(&self, object_type: &str) -> Vec<&ParameterInfo> {
        self.resolve(self.by_object.get(&object_type.to_ascii_uppercase()))
    }

    pub fn by_tag(&self, tag: &str) -> Vec<&ParameterInfo> {
        self.resolve(self.by_tag.get(tag))
    }

    pub fn by_impact(&self, impact: &str) -> Vec<&ParameterInfo> {
        self.resolve(self.by_impact.get(impact))
    }

    fn resolve(&self, keys: Option<&Vec<String>>) -> Vec<&ParameterInfo> {
        keys.map(|keys| {
            keys.iter()
                .filter_map(|k| self.parameters.get(k))
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn search(&self, criteria: &SearchCriteria) -> Vec<&ParameterInfo> {
        self.parameters
            .values()
            .filter(|info| {
                criteria
                    .category
                    .as_deref()
                    .is_none_or(|c| info.category == c)
                    && criteria
                        .object_type
                        .as_deref()
                        .is_none_or(|o| info.object_type.eq_ignore_ascii_case(o))
                    && criteria
                        .tag
                        .as_deref()
                        .is_none_or(|t| info.tags.iter().any(|tag| tag == t))
                    && criteria
                        .performance_impact
                        .as_deref()
                        .is_none_or(|i| info.performance_impact == i)
                    && criteria.units.as_deref().is_none_or(|u| info.units == u)
            })
            .collect()
    }

    /// Bounds for a numeric key, if both are declared.
    pub fn bounds(&self, key: &str) -> Option<(f64, f64)> {
        let info = self.get(key)?;
        match (info.min_value, info.max_value) {
            (Some(min), Some(max)) => Some((min, max)),
            _ => None,
        }
    }

    /// Code-minimum value for a key under (standard, version).
    pub fn code_requirement(&self, key: &str, standard: &str, version: &str) -> Option<f64> {
        self.get(key)?
            .code_requirements
            .get(standard)?
            .get(version)
            .copied()
    }

    /// Validate a candidate value for a key. Errors carry enough context to
    /// be surfaced directly in modification records.
    pub fn validate_value(&self, key: &str, value: &ParamValue) -> Result<()> {
        let info = self
            .get(key)
            .with_context(|| format!("parameter '{key}' is not in the registry"))?;
        match info.data_type {
            DataType::Float | DataType::Integer => {
                let number = value.as_number().with_context(|| {
                    format!(
                        "parameter '{key}' expects a number, got text value {:?}",
                        value
                    )
                })?;
                if number.is_nan() {
                    bail!("parameter '{key}' rejects NaN");
                }
                if info.data_type == DataType::Integer && number.fract() != 0.0 {
                    bail!("parameter '{key}' expects an integer, got {number}");
                }
                if let Some(min) = info.min_value {
                    if number < min {
                        bail!(
                            "parameter '{key}' value {number} below minimum {min} {}",
                            info.units
                        );
                    }
                }
                if let Some(max) = info.max_value {
                    if number > max {
                        bail!(
                            "parameter '{key}' value {number} above maximum {max} {}",
                            info.units
                        );
                    }
                }
                Ok(())
            }
            DataType::Choice => {
                let text = match value {
                    ParamValue::Text(t) => t.clone(),
                    ParamValue::Number(n) => n.to_string(),
                };
                if info
                    .allowed_values
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(&text))
                {
                    Ok(())
                } else {
                    bail!(
                        "parameter '{key}' value '{text}' not among allowed values {:?}",
                        info.allowed_values
                    )
                }
            }
            DataType::Text => Ok(()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterInfo)> {
        self.parameters.iter()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let entries: Vec<&ParameterInfo> = self.parameters.values().collect();
        let json = serde_json::to_string_pretty(&entries).context("serializing registry")?;
        fs::write(path, json)
            .with_context(|| format!("writing registry '{}'", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading registry '{}'", path.display()))?;
        let entries: Vec<ParameterInfo> =
            serde_json::from_str(&text).context("parsing registry JSON")?;
        let mut registry = Self::new();
        for info in entries {
            registry.register(info)?;
        }
        Ok(registry)
    }
}

/// Built-in catalog shared by the whole pipeline.
pub static DEFAULT_REGISTRY: Lazy<ParameterRegistry> = Lazy::new(ParameterRegistry::with_defaults);

fn code_reqs(entries: &[(&str, &[(&str, f64)])]) -> BTreeMap<String, BTreeMap<String, f64>> {
    entries
        .iter()
        .map(|(standard, versions)| {
            (
                standard.to_string(),
                versions
                    .iter()
                    .map(|(version, value)| (version.to_string(), *value))
                    .collect(),
            )
        })
        .collect()
}

fn default_parameters() -> &'static [ParameterInfo] {
    static DEFAULTS: Lazy<Vec<ParameterInfo>> = Lazy::new(|| {
        vec![
            ParameterInfo {
                category: "hvac".into(),
                object_type: "COIL:COOLING:DX:SINGLESPEED".into(),
                field_name: "Gross_Rated_COP".into(),
                field_index: 9,
                data_type: DataType::Float,
                units: "W/W".into(),
                min_value: Some(2.0),
                max_value: Some(6.0),
                default_value: Some(3.0),
                allowed_values: vec![],
                description: "Coefficient of performance at rated conditions".into(),
                performance_impact: "cooling_efficiency".into(),
                dependencies: vec![],
                tags: vec!["efficiency".into(), "cooling".into(), "energy".into()],
                code_requirements: code_reqs(&[("ASHRAE_90.1", &[("2019", 3.0), ("2022", 3.2)])]),
            },
            ParameterInfo {
                category: "hvac".into(),
                object_type: "COIL:HEATING:ELECTRIC".into(),
                field_name: "Efficiency".into(),
                field_index: 3,
                data_type: DataType::Float,
                units: "".into(),
                min_value: Some(0.8),
                max_value: Some(1.0),
                default_value: Some(1.0),
                allowed_values: vec![],
                description: "Heating coil efficiency".into(),
                performance_impact: "heating_efficiency".into(),
                dependencies: vec![],
                tags: vec!["efficiency".into(), "heating".into(), "energy".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "lighting".into(),
                object_type: "LIGHTS".into(),
                field_name: "Watts_per_Zone_Floor_Area".into(),
                field_index: 5,
                data_type: DataType::Float,
                units: "W/m2".into(),
                min_value: Some(0.0),
                max_value: Some(30.0),
                default_value: Some(10.0),
                allowed_values: vec![],
                description: "Lighting power density".into(),
                performance_impact: "lighting_energy".into(),
                dependencies: vec![],
                tags: vec!["lpd".into(), "energy".into(), "lighting".into()],
                code_requirements: code_reqs(&[("ASHRAE_90.1", &[("2019", 8.5), ("2022", 7.5)])]),
            },
            ParameterInfo {
                category: "equipment".into(),
                object_type: "ELECTRICEQUIPMENT".into(),
                field_name: "Watts_per_Zone_Floor_Area".into(),
                field_index: 5,
                data_type: DataType::Float,
                units: "W/m2".into(),
                min_value: Some(0.0),
                max_value: Some(50.0),
                default_value: Some(10.0),
                allowed_values: vec![],
                description: "Equipment power density".into(),
                performance_impact: "plug_loads".into(),
                dependencies: vec![],
                tags: vec!["equipment".into(), "plug_loads".into(), "energy".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "infiltration".into(),
                object_type: "ZONEINFILTRATION:DESIGNFLOWRATE".into(),
                field_name: "Air_Changes_per_Hour".into(),
                field_index: 7,
                data_type: DataType::Float,
                units: "1/hr".into(),
                min_value: Some(0.0),
                max_value: Some(5.0),
                default_value: Some(0.5),
                allowed_values: vec![],
                description: "Infiltration air change rate".into(),
                performance_impact: "infiltration_loads".into(),
                dependencies: vec![],
                tags: vec!["envelope".into(), "air_leakage".into(), "energy".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "infiltration".into(),
                object_type: "ZONEINFILTRATION:DESIGNFLOWRATE".into(),
                field_name: "Design_Flow_Rate".into(),
                field_index: 4,
                data_type: DataType::Float,
                units: "m3/s".into(),
                min_value: Some(0.0),
                max_value: Some(10.0),
                default_value: None,
                allowed_values: vec![],
                description: "Zone infiltration design flow rate".into(),
                performance_impact: "infiltration_loads".into(),
                dependencies: vec![],
                tags: vec!["envelope".into(), "air_leakage".into(), "energy".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "materials".into(),
                object_type: "MATERIAL".into(),
                field_name: "Conductivity".into(),
                field_index: 3,
                data_type: DataType::Float,
                units: "W/m-K".into(),
                min_value: Some(0.01),
                max_value: Some(5.0),
                default_value: None,
                allowed_values: vec![],
                description: "Material thermal conductivity".into(),
                performance_impact: "thermal_resistance".into(),
                dependencies: vec![],
                tags: vec!["insulation".into(), "envelope".into(), "heat_transfer".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "materials".into(),
                object_type: "MATERIAL".into(),
                field_name: "Thickness".into(),
                field_index: 2,
                data_type: DataType::Float,
                units: "m".into(),
                min_value: Some(0.001),
                max_value: Some(1.0),
                default_value: None,
                allowed_values: vec![],
                description: "Material layer thickness".into(),
                performance_impact: "thermal_resistance".into(),
                dependencies: vec![],
                tags: vec!["insulation".into(), "envelope".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "fenestration".into(),
                object_type: "WINDOWMATERIAL:SIMPLEGLAZINGSYSTEM".into(),
                field_name: "UFactor".into(),
                field_index: 1,
                data_type: DataType::Float,
                units: "W/m2-K".into(),
                min_value: Some(0.5),
                max_value: Some(6.0),
                default_value: Some(2.0),
                allowed_values: vec![],
                description: "Window U-factor (thermal transmittance)".into(),
                performance_impact: "window_heat_transfer".into(),
                dependencies: vec![],
                tags: vec!["windows".into(), "envelope".into(), "heat_transfer".into()],
                code_requirements: code_reqs(&[("ASHRAE_90.1", &[("2019", 2.8), ("2022", 2.5)])]),
            },
            ParameterInfo {
                category: "fenestration".into(),
                object_type: "WINDOWMATERIAL:SIMPLEGLAZINGSYSTEM".into(),
                field_name: "Solar_Heat_Gain_Coefficient".into(),
                field_index: 2,
                data_type: DataType::Float,
                units: "".into(),
                min_value: Some(0.1),
                max_value: Some(0.9),
                default_value: Some(0.6),
                allowed_values: vec![],
                description: "Window solar heat gain coefficient".into(),
                performance_impact: "solar_gains".into(),
                dependencies: vec![],
                tags: vec!["windows".into(), "envelope".into(), "solar".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "ventilation".into(),
                object_type: "DESIGNSPECIFICATION:OUTDOORAIR".into(),
                field_name: "Outdoor_Air_Flow_per_Person".into(),
                field_index: 2,
                data_type: DataType::Float,
                units: "m3/s-person".into(),
                min_value: Some(0.0),
                max_value: Some(0.05),
                default_value: Some(0.0025),
                allowed_values: vec![],
                description: "Outdoor air ventilation rate per person".into(),
                performance_impact: "outdoor_air_loads".into(),
                dependencies: vec![],
                tags: vec!["iaq".into(), "ventilation".into(), "outdoor_air".into()],
                code_requirements: code_reqs(&[("ASHRAE_62.1", &[("2019", 0.0025)])]),
            },
            ParameterInfo {
                category: "ventilation".into(),
                object_type: "ZONEVENTILATION:DESIGNFLOWRATE".into(),
                field_name: "Design_Flow_Rate".into(),
                field_index: 4,
                data_type: DataType::Float,
                units: "m3/s".into(),
                min_value: Some(0.0),
                max_value: Some(20.0),
                default_value: None,
                allowed_values: vec![],
                description: "Zone mechanical ventilation design flow rate".into(),
                performance_impact: "outdoor_air_loads".into(),
                dependencies: vec![],
                tags: vec!["ventilation".into(), "outdoor_air".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "ventilation".into(),
                object_type: "ZONEHVAC:IDEALLOADSAIRSYSTEM".into(),
                field_name: "Demand_Controlled_Ventilation_Type".into(),
                field_index: 24,
                data_type: DataType::Choice,
                units: "".into(),
                min_value: None,
                max_value: None,
                default_value: None,
                allowed_values: vec![
                    "None".into(),
                    "OccupancySchedule".into(),
                    "CO2Setpoint".into(),
                ],
                description: "Demand-controlled ventilation mode".into(),
                performance_impact: "outdoor_air_loads".into(),
                dependencies: vec!["hvac*ZONECONTROL:CONTAMINANTCONTROLLER*Carbon_Dioxide_Setpoint_Schedule_Name".into()],
                tags: vec!["ventilation".into(), "controls".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "hvac".into(),
                object_type: "ZONECONTROL:CONTAMINANTCONTROLLER".into(),
                field_name: "Carbon_Dioxide_Setpoint_Schedule_Name".into(),
                field_index: 4,
                data_type: DataType::Text,
                units: "".into(),
                min_value: None,
                max_value: None,
                default_value: None,
                allowed_values: vec![],
                description: "CO2 setpoint schedule driving demand-controlled ventilation".into(),
                performance_impact: "outdoor_air_loads".into(),
                dependencies: vec![],
                tags: vec!["ventilation".into(), "controls".into(), "iaq".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "dhw".into(),
                object_type: "WATERHEATER:MIXED".into(),
                field_name: "Heater_Thermal_Efficiency".into(),
                field_index: 11,
                data_type: DataType::Float,
                units: "".into(),
                min_value: Some(0.5),
                max_value: Some(1.0),
                default_value: Some(0.8),
                allowed_values: vec![],
                description: "Domestic hot water heater thermal efficiency".into(),
                performance_impact: "dhw_energy".into(),
                dependencies: vec![],
                tags: vec!["dhw".into(), "efficiency".into(), "energy".into()],
                code_requirements: BTreeMap::new(),
            },
            ParameterInfo {
                category: "shading".into(),
                object_type: "WINDOWSHADINGCONTROL".into(),
                field_name: "Setpoint".into(),
                field_index: 8,
                data_type: DataType::Float,
                units: "W/m2".into(),
                min_value: Some(50.0),
                max_value: Some(800.0),
                default_value: Some(300.0),
                allowed_values: vec![],
                description: "Solar irradiance setpoint activating shading".into(),
                performance_impact: "solar_gains".into(),
                dependencies: vec![],
                tags: vec!["shading".into(), "solar".into(), "comfort".into()],
                code_requirements: BTreeMap::new(),
            },
        ]
    });
    &DEFAULTS
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_registry_builds_indexes() {
        let registry = ParameterRegistry::with_defaults();
        assert!(registry.len() >= 10);
        assert!(!registry.by_category("materials").is_empty());
        assert!(!registry.by_object_type("lights").is_empty());
        assert!(!registry.by_tag("envelope").is_empty());
        assert!(!registry.by_impact("plug_loads").is_empty());
    }

    #[test]
    fn key_format_uses_star_delimiter() {
        let registry = ParameterRegistry::with_defaults();
        assert!(registry.contains("lighting*LIGHTS*Watts_per_Zone_Floor_Area"));
        assert!(registry
            .find_field("Lights", "watts_per_zone_floor_area")
            .is_some());
    }

    #[test]
    fn rejects_delimiter_in_components() {
        let mut registry = ParameterRegistry::new();
        let mut bad = default_parameters()[0].clone();
        bad.category = "hv*ac".into();
        assert!(registry.register(bad).is_err());
    }

    #[test]
    fn validates_bounds_with_messages() {
        let registry = ParameterRegistry::with_defaults();
        let key = "lighting*LIGHTS*Watts_per_Zone_Floor_Area";
        assert!(registry.validate_value(key, &ParamValue::Number(12.0)).is_ok());
        let err = registry
            .validate_value(key, &ParamValue::Number(45.0))
            .unwrap_err();
        assert!(err.to_string().contains("above maximum"));
        let err = registry
            .validate_value(key, &ParamValue::Text("lots".into()))
            .unwrap_err();
        assert!(err.to_string().contains("expects a number"));
    }

    #[test]
    fn validates_choice_fields() {
        let registry = ParameterRegistry::with_defaults();
        let key = "ventilation*ZONEHVAC:IDEALLOADSAIRSYSTEM*Demand_Controlled_Ventilation_Type";
        assert!(registry
            .validate_value(key, &ParamValue::Text("CO2Setpoint".into()))
            .is_ok());
        assert!(registry
            .validate_value(key, &ParamValue::Text("Sometimes".into()))
            .is_err());
    }

    #[test]
    fn code_requirements_by_standard_version() {
        let registry = ParameterRegistry::with_defaults();
        let cop = registry.code_requirement(
            "hvac*COIL:COOLING:DX:SINGLESPEED*Gross_Rated_COP",
            "ASHRAE_90.1",
            "2022",
        );
        assert_eq!(cop, Some(3.2));
        assert_eq!(
            registry.code_requirement(
                "hvac*COIL:COOLING:DX:SINGLESPEED*Gross_Rated_COP",
                "ASHRAE_90.1",
                "1975"
            ),
            None
        );
    }

    #[test]
    fn save_and_load_round_trip() {
        let registry = ParameterRegistry::with_defaults();
        let tmp = NamedTempFile::new().unwrap();
        registry.save(tmp.path()).unwrap();
        let loaded = ParameterRegistry::load(tmp.path()).unwrap();
        assert_eq!(loaded.len(), registry.len());
        assert_eq!(
            loaded.bounds("equipment*ELECTRICEQUIPMENT*Watts_per_Zone_Floor_Area"),
            Some((0.0, 50.0))
        );
    }
}
