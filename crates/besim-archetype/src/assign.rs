//! The parameter assigner: resolves a subsystem's parameter ranges from the
//! lookup store, applies user overrides in declaration order, and collapses
//! each range to a concrete value with the requested pick strategy.
//!
//! Guarantees:
//! - deterministic for a given (query, override list, seed); midpoint and
//!   min picks are seed-independent
//! - every pick lies inside its final range after clamping
//! - overrides that matched the scope but no recognized parameter are
//!   reported, never silently dropped

use anyhow::Result;
use besim_core::{
    AgeRange, BuildingFunction, CalibrationStage, OverridePayload, OverrideRecord,
    ParameterRange, PickStrategy, ResolvedParameter, ScopeKey, Subsystem,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::warn;

use crate::lookup::ArchetypeStore;
use crate::mappings::archetype_key;
use crate::patterns::{DayPatternSet, SetpointWindow};

/// A numeric parameter a subsystem recognizes, with the default range used
/// when the lookup has no entry.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub default_min: f64,
    pub default_max: f64,
}

const fn spec(name: &'static str, default_min: f64, default_max: f64) -> ParamSpec {
    ParamSpec {
        name,
        default_min,
        default_max,
    }
}

const HVAC_PARAMS: &[ParamSpec] = &[
    spec("heating_day_setpoint", 20.0, 20.0),
    spec("heating_night_setpoint", 16.0, 16.0),
    spec("cooling_day_setpoint", 25.0, 25.0),
    spec("cooling_night_setpoint", 27.0, 27.0),
    spec("max_heating_supply_air_temp", 50.0, 50.0),
    spec("min_cooling_supply_air_temp", 13.0, 13.0),
];
const VENTILATION_PARAMS: &[ParamSpec] = &[
    spec("f_ctrl", 1.0, 1.0),
    spec("fan_pressure", 0.0, 0.0),
    spec("fan_total_efficiency", 0.5, 0.7),
    spec("hrv_eff", 0.0, 0.0),
    spec("hrv_lat_eff", 0.0, 0.0),
];
const INFILTRATION_PARAMS: &[ParamSpec] = &[
    spec("infiltration_base", 0.8, 1.2),
    spec("year_factor", 1.0, 1.0),
    spec("flow_exponent", 0.67, 0.67),
];
const LOADS_PARAMS: &[ParamSpec] = &[
    spec("lighting_watts_per_m2", 8.0, 12.0),
    spec("equipment_watts_per_m2", 8.0, 12.0),
    spec("occupancy_m2_per_person", 25.0, 35.0),
];
const DHW_PARAMS: &[ParamSpec] = &[
    spec("setpoint_c", 58.0, 60.0),
    spec("heater_efficiency", 0.75, 0.85),
    spec("usage_liters_per_person_day", 40.0, 60.0),
];
const FENESTRATION_PARAMS: &[ParamSpec] = &[
    spec("window_u_value", 1.4, 2.2),
    spec("window_shgc", 0.5, 0.7),
    spec("window_to_wall_ratio", 0.25, 0.35),
];
const SHADING_PARAMS: &[ParamSpec] = &[
    spec("shading_setpoint_w_m2", 250.0, 350.0),
    spec("shading_transmittance", 0.2, 0.4),
];

/// Numeric parameters per subsystem. The assigner resolves exactly these;
/// anything else in an override is an unmatched override.
pub fn recognized_params(subsystem: Subsystem) -> &'static [ParamSpec] {
    match subsystem {
        Subsystem::Hvac => HVAC_PARAMS,
        Subsystem::Ventilation => VENTILATION_PARAMS,
        Subsystem::Infiltration => INFILTRATION_PARAMS,
        Subsystem::Loads => LOADS_PARAMS,
        Subsystem::Dhw => DHW_PARAMS,
        Subsystem::Fenestration => FENESTRATION_PARAMS,
        Subsystem::Shading => SHADING_PARAMS,
    }
}

/// Discrete choices per subsystem with their defaults.
pub fn recognized_choices(subsystem: Subsystem) -> &'static [(&'static str, &'static str)] {
    match subsystem {
        Subsystem::Ventilation => &[("system_type", "A")],
        _ => &[],
    }
}

/// One parameter-assignment query.
#[derive(Debug, Clone)]
pub struct AssignQuery {
    pub building_id: u64,
    pub building_function: BuildingFunction,
    pub sub_type: String,
    pub age_range: AgeRange,
    pub scenario: String,
    pub calibration_stage: CalibrationStage,
    pub pick_strategy: PickStrategy,
    pub random_seed: Option<u64>,
}

impl AssignQuery {
    pub fn scope_key(&self) -> ScopeKey {
        ScopeKey {
            building_id: self.building_id,
            building_function: self.building_function,
            sub_type: self.sub_type.clone(),
            age_range: self.age_range,
            scenario: self.scenario.clone(),
            calibration_stage: self.calibration_stage,
        }
    }
}

/// Parse a pick-strategy string, warning and falling back to midpoint for
/// anything unrecognized.
pub fn strategy_or_midpoint(s: &str) -> PickStrategy {
    PickStrategy::parse(s).unwrap_or_else(|| {
        warn!("unknown pick strategy '{s}', falling back to midpoint");
        PickStrategy::Midpoint
    })
}

/// A fully resolved subsystem: concrete values with their final ranges,
/// discrete choices, the lookup's ranged schedule patterns, and any
/// schedule-block overrides stashed for the schedule synthesizer.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSubsystem {
    pub subsystem: Option<Subsystem>,
    pub values: BTreeMap<String, ResolvedParameter>,
    pub choices: BTreeMap<String, String>,
    pub schedules: BTreeMap<String, DayPatternSet>,
    pub schedule_overrides: BTreeMap<String, Vec<(String, f64)>>,
    pub setpoint_window: Option<SetpointWindow>,
    /// Lookup fallbacks taken while resolving, for provenance.
    pub lookup_fallbacks: Vec<String>,
    /// Overrides that matched the scope but no recognized parameter.
    pub unmatched_overrides: Vec<String>,
}

impl ResolvedSubsystem {
    pub fn value(&self, name: &str) -> Option<f64> {
        self.values.get(name).map(|p| p.chosen_value)
    }

    pub fn choice(&self, name: &str) -> Option<&str> {
        self.choices.get(name).map(String::as_str)
    }
}

/// Collapse a range with the strategy; the pick is clamped into the range.
fn pick_value(range: ParameterRange, strategy: PickStrategy, rng: &mut StdRng) -> f64 {
    let picked = match strategy {
        PickStrategy::Midpoint => range.midpoint(),
        PickStrategy::Uniform => {
            if range.is_point() {
                range.min
            } else {
                rng.gen_range(range.min..=range.max)
            }
        }
        PickStrategy::Min => range.min,
    };
    range.clamp(picked)
}

/// Resolve one subsystem for one building.
pub fn assign_subsystem(
    store: &ArchetypeStore,
    subsystem: Subsystem,
    query: &AssignQuery,
    overrides: &[OverrideRecord],
) -> Result<ResolvedSubsystem> {
    let lookup_key = archetype_key(query.building_function, &query.sub_type);
    let resolution = store.get_subsystem_block(
        &query.scenario,
        query.calibration_stage,
        subsystem,
        query.building_function,
        lookup_key,
        query.age_range,
    );
    let block = resolution.block;

    let mut resolved = ResolvedSubsystem {
        subsystem: Some(subsystem),
        schedules: block.schedules.clone(),
        setpoint_window: block.setpoint_window.clone(),
        lookup_fallbacks: resolution.fallbacks,
        ..Default::default()
    };

    // Initial ranges: lookup entry, else subsystem default.
    let mut ranges: BTreeMap<String, ParameterRange> = BTreeMap::new();
    for param in recognized_params(subsystem) {
        let range = match block.params.get(param.name) {
            Some(range) => *range,
            None => {
                if !block.params.is_empty() {
                    warn!(
                        "lookup block for {subsystem} has no '{}'; using default",
                        param.name
                    );
                }
                ParameterRange::new(param.default_min, param.default_max)
            }
        };
        ranges.insert(param.name.to_string(), range);
    }
    let mut choices: BTreeMap<String, String> = BTreeMap::new();
    for (name, default) in recognized_choices(subsystem) {
        let value = block
            .choices
            .get(*name)
            .cloned()
            .unwrap_or_else(|| default.to_string());
        choices.insert(name.to_string(), value);
    }

    // Overrides in declaration order.
    let scope_key = query.scope_key();
    for record in overrides {
        if !record.scope.matches(&scope_key) {
            continue;
        }
        let name = record.param_name.as_str();
        match &record.payload {
            OverridePayload::NumericFixed(value) => {
                if let Some(range) = ranges.get_mut(name) {
                    if value.is_nan() {
                        warn!("override for '{name}' is NaN; collapsing to zero range");
                    }
                    *range = ParameterRange::point(*value);
                } else {
                    note_unmatched(&mut resolved, subsystem, name);
                }
            }
            OverridePayload::NumericRange { min, max } => {
                if let Some(range) = ranges.get_mut(name) {
                    if ParameterRange::check(*min, *max).is_err() {
                        warn!("override range ({min}, {max}) for '{name}' is invalid; repairing");
                    }
                    *range = ParameterRange::new(*min, *max);
                } else {
                    note_unmatched(&mut resolved, subsystem, name);
                }
            }
            OverridePayload::Choice(choice) => {
                if let Some(current) = choices.get_mut(name) {
                    *current = choice.clone();
                } else {
                    note_unmatched(&mut resolved, subsystem, name);
                }
            }
            OverridePayload::ScheduleBlocks(blocks) => {
                resolved
                    .schedule_overrides
                    .insert(name.to_string(), blocks.clone());
            }
        }
    }

    // Collapse ranges to values. Seed 0 keeps the unseeded midpoint/min
    // paths deterministic too; uniform without a seed draws fresh entropy.
    let mut rng = match query.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    for (name, range) in ranges {
        let chosen_value = pick_value(range, query.pick_strategy, &mut rng);
        resolved.values.insert(
            name.clone(),
            ResolvedParameter {
                param_key: name,
                range,
                chosen_value,
                pick_strategy: query.pick_strategy,
            },
        );
    }
    resolved.choices = choices;
    Ok(resolved)
}

fn note_unmatched(resolved: &mut ResolvedSubsystem, subsystem: Subsystem, name: &str) {
    warn!("override '{name}' matched no {subsystem} parameter");
    resolved.unmatched_overrides.push(name.to_string());
}

/// Resolve every subsystem for one building.
pub fn assign_all(
    store: &ArchetypeStore,
    query: &AssignQuery,
    overrides: &[OverrideRecord],
) -> Result<BTreeMap<Subsystem, ResolvedSubsystem>> {
    let mut out = BTreeMap::new();
    for subsystem in Subsystem::ALL {
        out.insert(subsystem, assign_subsystem(store, subsystem, query, overrides)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::builtin_store;
    use besim_core::{OverridePayload, OverrideScope};

    fn corner_house_query(strategy: PickStrategy) -> AssignQuery {
        AssignQuery {
            building_id: 1001,
            building_function: BuildingFunction::Residential,
            sub_type: "Corner House".into(),
            age_range: AgeRange::From1992To2005,
            scenario: "scenario1".into(),
            calibration_stage: CalibrationStage::PreCalibration,
            pick_strategy: strategy,
            random_seed: Some(7),
        }
    }

    #[test]
    fn corner_house_midpoint_matches_expected_values() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Midpoint);
        let infil =
            assign_subsystem(&store, Subsystem::Infiltration, &query, &[]).unwrap();
        assert!((infil.value("infiltration_base").unwrap() - 1.3).abs() < 1e-12);
        assert!((infil.value("year_factor").unwrap() - 1.2).abs() < 1e-12);

        let vent = assign_subsystem(&store, Subsystem::Ventilation, &query, &[]).unwrap();
        assert_eq!(vent.choice("system_type"), Some("A"));
        assert!((vent.value("f_ctrl").unwrap() - 0.95).abs() < 1e-12);
    }

    #[test]
    fn office_post_calibration_min_strategy() {
        let store = builtin_store();
        let query = AssignQuery {
            building_id: 2002,
            building_function: BuildingFunction::NonResidential,
            sub_type: "Office Function".into(),
            age_range: AgeRange::From2015,
            scenario: "scenario1".into(),
            calibration_stage: CalibrationStage::PostCalibration,
            pick_strategy: PickStrategy::Min,
            random_seed: None,
        };
        let vent = assign_subsystem(&store, Subsystem::Ventilation, &query, &[]).unwrap();
        assert_eq!(vent.choice("system_type"), Some("C"));
        assert_eq!(vent.value("f_ctrl"), Some(0.65));
        assert_eq!(vent.value("hrv_eff"), Some(0.75));
    }

    #[test]
    fn uniform_picks_are_deterministic_and_bounded() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Uniform);
        let a = assign_subsystem(&store, Subsystem::Infiltration, &query, &[]).unwrap();
        let b = assign_subsystem(&store, Subsystem::Infiltration, &query, &[]).unwrap();
        for (name, param) in &a.values {
            assert_eq!(param.chosen_value, b.values[name].chosen_value);
            assert!(param.range.contains(param.chosen_value));
        }
    }

    #[test]
    fn midpoint_is_seed_independent() {
        let store = builtin_store();
        let mut query = corner_house_query(PickStrategy::Midpoint);
        let a = assign_subsystem(&store, Subsystem::Hvac, &query, &[]).unwrap();
        query.random_seed = Some(12345);
        let b = assign_subsystem(&store, Subsystem::Hvac, &query, &[]).unwrap();
        assert_eq!(
            a.value("heating_day_setpoint"),
            b.value("heating_day_setpoint")
        );
    }

    #[test]
    fn overrides_apply_in_order_with_fixed_value_winning() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Midpoint);
        let overrides = vec![
            OverrideRecord {
                scope: OverrideScope::default(),
                param_name: "infiltration_base".into(),
                payload: OverridePayload::NumericRange { min: 2.0, max: 3.0 },
            },
            OverrideRecord {
                scope: OverrideScope {
                    building_id: Some(1001),
                    ..Default::default()
                },
                param_name: "infiltration_base".into(),
                payload: OverridePayload::NumericFixed(2.5),
            },
        ];
        let infil =
            assign_subsystem(&store, Subsystem::Infiltration, &query, &overrides).unwrap();
        let param = &infil.values["infiltration_base"];
        assert_eq!(param.chosen_value, 2.5);
        assert!(param.range.is_point());
    }

    #[test]
    fn out_of_scope_overrides_are_ignored() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Midpoint);
        let overrides = vec![OverrideRecord {
            scope: OverrideScope {
                building_id: Some(9999),
                ..Default::default()
            },
            param_name: "infiltration_base".into(),
            payload: OverridePayload::NumericFixed(9.0),
        }];
        let infil =
            assign_subsystem(&store, Subsystem::Infiltration, &query, &overrides).unwrap();
        assert!((infil.value("infiltration_base").unwrap() - 1.3).abs() < 1e-12);
    }

    #[test]
    fn unmatched_override_is_reported() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Midpoint);
        let overrides = vec![OverrideRecord {
            scope: OverrideScope::default(),
            param_name: "warp_drive_power".into(),
            payload: OverridePayload::NumericFixed(1.0),
        }];
        let infil =
            assign_subsystem(&store, Subsystem::Infiltration, &query, &overrides).unwrap();
        assert_eq!(infil.unmatched_overrides, vec!["warp_drive_power"]);
    }

    #[test]
    fn system_type_override_changes_choice() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Midpoint);
        let overrides = vec![OverrideRecord {
            scope: OverrideScope::default(),
            param_name: "system_type".into(),
            payload: OverridePayload::Choice("D".into()),
        }];
        let vent =
            assign_subsystem(&store, Subsystem::Ventilation, &query, &overrides).unwrap();
        assert_eq!(vent.choice("system_type"), Some("D"));
    }

    #[test]
    fn schedule_override_is_stashed() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Midpoint);
        let overrides = vec![OverrideRecord {
            scope: OverrideScope::default(),
            param_name: "hvac_availability_weekday".into(),
            payload: OverridePayload::ScheduleBlocks(vec![
                ("06:00".into(), 1.0),
                ("22:00".into(), 0.3),
                ("24:00".into(), 0.0),
            ]),
        }];
        let hvac = assign_subsystem(&store, Subsystem::Hvac, &query, &overrides).unwrap();
        assert_eq!(hvac.schedule_overrides["hvac_availability_weekday"].len(), 3);
    }

    #[test]
    fn unknown_strategy_string_falls_back_to_midpoint() {
        assert_eq!(strategy_or_midpoint("bogus"), PickStrategy::Midpoint);
        assert_eq!(strategy_or_midpoint("uniform"), PickStrategy::Uniform);
    }

    #[test]
    fn nan_fixed_override_collapses_to_zero() {
        let store = builtin_store();
        let query = corner_house_query(PickStrategy::Midpoint);
        let overrides = vec![OverrideRecord {
            scope: OverrideScope::default(),
            param_name: "year_factor".into(),
            payload: OverridePayload::NumericFixed(f64::NAN),
        }];
        let infil =
            assign_subsystem(&store, Subsystem::Infiltration, &query, &overrides).unwrap();
        assert_eq!(infil.value("year_factor"), Some(0.0));
    }
}
