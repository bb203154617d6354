//! Built-in archetype lookup data.
//!
//! Ships the default parameter tables for scenario1/scenario2 across the
//! pre- and post-calibration stages: infiltration base rates per sub-type,
//! construction-year factors per age band, ventilation control factors per
//! system letter, HRV effectiveness, HVAC setpoint ranges with day windows
//! and availability patterns, internal loads, DHW, fenestration by age band,
//! and shading. Post-calibration tables are collapsed to point ranges.
//!
//! A JSON tree loaded through [`ArchetypeStore::load`] has exactly the same
//! shape and replaces this data wholesale.

use besim_core::{AgeRange, BuildingFunction, ParameterRange};
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

use crate::lookup::{ArchetypeBlock, ArchetypeStore};
use crate::mappings::{
    NON_RESIDENTIAL_SUB_TYPES, OTHER_NONRES, OTHER_RES, RESIDENTIAL_SUB_TYPES,
};
use crate::patterns::{DayPatternSet, RangedBlock, SetpointWindow};

/// Lazily-built shared copy of the default store.
pub static BUILTIN_STORE: Lazy<ArchetypeStore> = Lazy::new(builtin_store);

const SCENARIOS: [&str; 2] = ["scenario1", "scenario2"];
const STAGES: [&str; 2] = ["pre_calibration", "post_calibration"];

/// Residential infiltration base at 10 Pa, m³/h per m², pre-calibration.
const RES_INFILTRATION_PRE: [(&str, f64, f64); 6] = [
    ("Corner House", 1.2, 1.4),
    ("Apartment", 0.8, 1.0),
    ("Terrace or Semi-detached House", 1.0, 1.2),
    ("Detached House", 1.2, 1.5),
    ("Two-and-a-half-story House", 1.1, 1.3),
    (OTHER_RES, 1.0, 1.2),
];

const RES_INFILTRATION_POST: [(&str, f64); 6] = [
    ("Corner House", 1.3),
    ("Apartment", 0.9),
    ("Terrace or Semi-detached House", 1.1),
    ("Detached House", 1.3),
    ("Two-and-a-half-story House", 1.2),
    (OTHER_RES, 1.1),
];

const NONRES_INFILTRATION_PRE: [(&str, f64, f64); 11] = [
    ("Meeting Function", 0.5, 0.7),
    ("Healthcare Function", 0.6, 0.8),
    ("Sport Function", 0.4, 0.6),
    ("Cell Function", 0.5, 0.7),
    ("Retail Function", 0.6, 0.8),
    ("Industrial Function", 0.6, 0.9),
    ("Accommodation Function", 0.5, 0.7),
    ("Office Function", 0.6, 0.8),
    ("Education Function", 0.6, 0.8),
    ("Other Use Function", 0.5, 0.7),
    (OTHER_NONRES, 0.5, 0.7),
];

const NONRES_INFILTRATION_POST: [(&str, f64); 11] = [
    ("Meeting Function", 0.6),
    ("Healthcare Function", 0.7),
    ("Sport Function", 0.5),
    ("Cell Function", 0.6),
    ("Retail Function", 0.7),
    ("Industrial Function", 0.7),
    ("Accommodation Function", 0.6),
    ("Office Function", 0.6),
    ("Education Function", 0.6),
    ("Other Use Function", 0.6),
    (OTHER_NONRES, 0.6),
];

/// Year factors per age band: (pre_min, pre_max, post).
const YEAR_FACTORS: [(AgeRange, f64, f64, f64); 7] = [
    (AgeRange::Pre1945, 2.0, 2.3, 2.2),
    (AgeRange::From1945To1964, 1.8, 2.0, 1.9),
    (AgeRange::From1965To1974, 1.5, 1.7, 1.6),
    (AgeRange::From1975To1991, 1.3, 1.5, 1.4),
    (AgeRange::From1992To2005, 1.1, 1.3, 1.2),
    (AgeRange::From2006To2014, 0.9, 1.1, 1.0),
    (AgeRange::From2015, 0.7, 0.9, 0.8),
];

/// f_ctrl per system letter: (pre_min, pre_max, post).
const F_CTRL_RES: [(&str, f64, f64, f64); 4] = [
    ("A", 0.90, 1.00, 1.0),
    ("B", 0.50, 0.60, 0.57),
    ("C", 0.80, 0.90, 0.85),
    ("D", 0.95, 1.05, 1.0),
];

const F_CTRL_NONRES: [(&str, f64, f64, f64); 4] = [
    ("A", 0.90, 1.00, 1.0),
    ("B", 0.80, 0.90, 0.85),
    ("C", 0.60, 0.70, 0.65),
    ("D", 0.75, 0.85, 0.8),
];

/// Residential system-type map, rows per age band, columns per sub-type in
/// [`RESIDENTIAL_SUB_TYPES`] order.
const SYSTEM_MAP_RES_PRE: [(AgeRange, [&str; 5]); 7] = [
    (AgeRange::Pre1945, ["A", "C", "B", "C", "A"]),
    (AgeRange::From1945To1964, ["B", "A", "C", "D", "C"]),
    (AgeRange::From1965To1974, ["A", "B", "C", "D", "C"]),
    (AgeRange::From1975To1991, ["C", "C", "B", "C", "A"]),
    (AgeRange::From1992To2005, ["A", "A", "C", "D", "D"]),
    (AgeRange::From2006To2014, ["D", "D", "C", "C", "A"]),
    (AgeRange::From2015, ["D", "C", "A", "B", "D"]),
];

const SYSTEM_MAP_RES_POST: [(AgeRange, [&str; 5]); 7] = [
    (AgeRange::Pre1945, ["B", "C", "C", "D", "A"]),
    (AgeRange::From1945To1964, ["A", "C", "D", "D", "C"]),
    (AgeRange::From1965To1974, ["C", "B", "C", "D", "A"]),
    (AgeRange::From1975To1991, ["B", "C", "B", "C", "A"]),
    (AgeRange::From1992To2005, ["C", "A", "C", "D", "D"]),
    (AgeRange::From2006To2014, ["D", "D", "C", "C", "A"]),
    (AgeRange::From2015, ["D", "C", "A", "B", "D"]),
];

/// Non-residential system letters per sub-type in
/// [`NON_RESIDENTIAL_SUB_TYPES`] order. The newest band favors natural
/// ventilation for meeting spaces; older stock keeps the mechanical mix.
const SYSTEM_MAP_NONRES_DEFAULT: [&str; 10] = ["D", "D", "C", "C", "B", "B", "A", "C", "A", "B"];
const SYSTEM_MAP_NONRES_2015: [&str; 10] = ["A", "D", "C", "C", "B", "B", "A", "C", "A", "B"];

/// Window U-value ranges (W/m²K) per age band: (pre_min, pre_max, post).
const WINDOW_U_BY_AGE: [(AgeRange, f64, f64, f64); 7] = [
    (AgeRange::Pre1945, 4.8, 5.8, 5.2),
    (AgeRange::From1945To1964, 4.2, 5.2, 4.6),
    (AgeRange::From1965To1974, 3.4, 4.4, 3.8),
    (AgeRange::From1975To1991, 2.6, 3.4, 3.0),
    (AgeRange::From1992To2005, 1.8, 2.6, 2.2),
    (AgeRange::From2006To2014, 1.4, 2.0, 1.7),
    (AgeRange::From2015, 1.0, 1.6, 1.3),
];

fn scenario_widen(scenario: &str, range: ParameterRange) -> ParameterRange {
    // scenario2 explores a slightly wider envelope around the same tables.
    if scenario == "scenario2" && !range.is_point() {
        ParameterRange::new(range.min, range.max + 0.1 * range.width())
    } else {
        range
    }
}

fn sub_types_for(function: BuildingFunction) -> Vec<&'static str> {
    match function {
        BuildingFunction::Residential => {
            let mut v = RESIDENTIAL_SUB_TYPES.to_vec();
            v.push(OTHER_RES);
            v
        }
        BuildingFunction::NonResidential => {
            let mut v = NON_RESIDENTIAL_SUB_TYPES.to_vec();
            v.push(OTHER_NONRES);
            v
        }
    }
}

fn infiltration_base(
    function: BuildingFunction,
    sub_type: &str,
    post: bool,
) -> ParameterRange {
    match (function, post) {
        (BuildingFunction::Residential, false) => RES_INFILTRATION_PRE
            .iter()
            .find(|(name, _, _)| *name == sub_type)
            .map(|(_, min, max)| ParameterRange::new(*min, *max))
            .unwrap_or(ParameterRange::new(1.0, 1.2)),
        (BuildingFunction::Residential, true) => RES_INFILTRATION_POST
            .iter()
            .find(|(name, _)| *name == sub_type)
            .map(|(_, v)| ParameterRange::point(*v))
            .unwrap_or(ParameterRange::point(1.1)),
        (BuildingFunction::NonResidential, false) => NONRES_INFILTRATION_PRE
            .iter()
            .find(|(name, _, _)| *name == sub_type)
            .map(|(_, min, max)| ParameterRange::new(*min, *max))
            .unwrap_or(ParameterRange::new(0.5, 0.7)),
        (BuildingFunction::NonResidential, true) => NONRES_INFILTRATION_POST
            .iter()
            .find(|(name, _)| *name == sub_type)
            .map(|(_, v)| ParameterRange::point(*v))
            .unwrap_or(ParameterRange::point(0.6)),
    }
}

fn year_factor(age: AgeRange, post: bool) -> ParameterRange {
    let (_, pre_min, pre_max, post_v) = YEAR_FACTORS
        .iter()
        .find(|(band, ..)| *band == age)
        .copied()
        .expect("all age bands tabulated");
    if post {
        ParameterRange::point(post_v)
    } else {
        ParameterRange::new(pre_min, pre_max)
    }
}

fn system_type(
    function: BuildingFunction,
    sub_type: &str,
    age: AgeRange,
    post: bool,
) -> &'static str {
    match function {
        BuildingFunction::Residential => {
            let map = if post {
                &SYSTEM_MAP_RES_POST
            } else {
                &SYSTEM_MAP_RES_PRE
            };
            let row = map
                .iter()
                .find(|(band, _)| *band == age)
                .map(|(_, row)| row)
                .expect("all age bands tabulated");
            RESIDENTIAL_SUB_TYPES
                .iter()
                .position(|known| *known == sub_type)
                .map(|idx| row[idx])
                .unwrap_or("A")
        }
        BuildingFunction::NonResidential => {
            let row = if age == AgeRange::From2015 {
                &SYSTEM_MAP_NONRES_2015
            } else {
                &SYSTEM_MAP_NONRES_DEFAULT
            };
            NON_RESIDENTIAL_SUB_TYPES
                .iter()
                .position(|known| *known == sub_type)
                .map(|idx| row[idx])
                .unwrap_or("D")
        }
    }
}

fn f_ctrl(function: BuildingFunction, system: &str, post: bool) -> ParameterRange {
    let table = if function.is_residential() {
        &F_CTRL_RES
    } else {
        &F_CTRL_NONRES
    };
    let (_, pre_min, pre_max, post_v) = table
        .iter()
        .find(|(letter, ..)| *letter == system)
        .copied()
        .unwrap_or(("?", 1.0, 1.0, 1.0));
    if post {
        ParameterRange::point(post_v)
    } else {
        ParameterRange::new(pre_min, pre_max)
    }
}

fn window_u(age: AgeRange, post: bool) -> ParameterRange {
    let (_, pre_min, pre_max, post_v) = WINDOW_U_BY_AGE
        .iter()
        .find(|(band, ..)| *band == age)
        .copied()
        .expect("all age bands tabulated");
    if post {
        ParameterRange::point(post_v)
    } else {
        ParameterRange::new(pre_min, pre_max)
    }
}

fn params(entries: &[(&str, ParameterRange)]) -> BTreeMap<String, ParameterRange> {
    entries
        .iter()
        .map(|(name, range)| (name.to_string(), *range))
        .collect()
}

fn infiltration_block(
    scenario: &str,
    function: BuildingFunction,
    sub_type: &str,
    age: AgeRange,
    post: bool,
) -> ArchetypeBlock {
    ArchetypeBlock {
        params: params(&[
            (
                "infiltration_base",
                scenario_widen(scenario, infiltration_base(function, sub_type, post)),
            ),
            ("year_factor", year_factor(age, post)),
            ("flow_exponent", ParameterRange::point(0.67)),
        ]),
        ..Default::default()
    }
}

fn ventilation_block(
    scenario: &str,
    function: BuildingFunction,
    sub_type: &str,
    age: AgeRange,
    post: bool,
) -> ArchetypeBlock {
    let system = system_type(function, sub_type, age, post);
    let fan_pressure = if function.is_residential() {
        if post {
            ParameterRange::point(50.0)
        } else {
            ParameterRange::new(40.0, 60.0)
        }
    } else if post {
        ParameterRange::point(100.0)
    } else {
        ParameterRange::new(90.0, 110.0)
    };
    let fan_efficiency = if post {
        ParameterRange::point(0.7)
    } else {
        ParameterRange::new(0.65, 0.75)
    };
    let hrv = if post {
        ParameterRange::point(0.75)
    } else {
        ParameterRange::new(0.70, 0.80)
    };

    let mut choices = BTreeMap::new();
    choices.insert("system_type".to_string(), system.to_string());

    let mut schedules = BTreeMap::new();
    schedules.insert(
        "ventilation".to_string(),
        DayPatternSet::all_days(vec![
            RangedBlock::new("07:00", 0.3, 0.5),
            RangedBlock::fixed("22:00", 1.0),
            RangedBlock::new("24:00", 0.3, 0.5),
        ]),
    );
    schedules.insert(
        "infiltration".to_string(),
        DayPatternSet::all_days(vec![RangedBlock::fixed("24:00", 1.0)]),
    );

    ArchetypeBlock {
        params: params(&[
            ("f_ctrl", scenario_widen(scenario, f_ctrl(function, system, post))),
            ("fan_pressure", fan_pressure),
            ("fan_total_efficiency", fan_efficiency),
            ("hrv_eff", hrv),
            ("hrv_lat_eff", ParameterRange::point(0.0)),
        ]),
        choices,
        schedules,
        ..Default::default()
    }
}

fn hvac_block(function: BuildingFunction, post: bool) -> ArchetypeBlock {
    let (heat_day, heat_night, cool_day, cool_night) = if post {
        (
            ParameterRange::point(20.5),
            ParameterRange::point(16.0),
            ParameterRange::point(25.0),
            ParameterRange::point(27.0),
        )
    } else {
        (
            ParameterRange::new(20.0, 21.0),
            ParameterRange::new(15.0, 16.0),
            ParameterRange::new(24.0, 26.0),
            ParameterRange::new(26.0, 28.0),
        )
    };
    let window = if function.is_residential() {
        SetpointWindow::new("07:00", "19:00")
    } else {
        SetpointWindow::new("08:00", "18:00")
    };
    let availability = if function.is_residential() {
        DayPatternSet {
            weekday: Some(vec![
                RangedBlock::fixed("06:00", 0.0),
                RangedBlock::fixed("23:00", 1.0),
                RangedBlock::fixed("24:00", 0.0),
            ]),
            weekend: Some(vec![
                RangedBlock::fixed("07:00", 0.0),
                RangedBlock::fixed("23:00", 1.0),
                RangedBlock::fixed("24:00", 0.0),
            ]),
            summer_design_day: Some(vec![RangedBlock::fixed("24:00", 1.0)]),
            winter_design_day: Some(vec![RangedBlock::fixed("24:00", 1.0)]),
            ..Default::default()
        }
    } else {
        DayPatternSet {
            weekday: Some(vec![
                RangedBlock::fixed("07:00", 0.0),
                RangedBlock::fixed("19:00", 1.0),
                RangedBlock::fixed("24:00", 0.0),
            ]),
            weekend: Some(vec![RangedBlock::fixed("24:00", 0.0)]),
            summer_design_day: Some(vec![RangedBlock::fixed("24:00", 1.0)]),
            winter_design_day: Some(vec![RangedBlock::fixed("24:00", 1.0)]),
            ..Default::default()
        }
    };
    let mut schedules = BTreeMap::new();
    schedules.insert("hvac_availability".to_string(), availability);

    ArchetypeBlock {
        params: params(&[
            ("heating_day_setpoint", heat_day),
            ("heating_night_setpoint", heat_night),
            ("cooling_day_setpoint", cool_day),
            ("cooling_night_setpoint", cool_night),
            ("max_heating_supply_air_temp", ParameterRange::new(45.0, 55.0)),
            ("min_cooling_supply_air_temp", ParameterRange::new(12.0, 14.0)),
        ]),
        schedules,
        setpoint_window: Some(window),
        ..Default::default()
    }
}

fn loads_block(function: BuildingFunction, post: bool) -> ArchetypeBlock {
    let (lighting, equipment, occupancy) = if function.is_residential() {
        (
            ParameterRange::new(2.0, 4.0),
            ParameterRange::new(3.0, 5.0),
            ParameterRange::new(30.0, 50.0),
        )
    } else {
        (
            ParameterRange::new(8.0, 12.0),
            ParameterRange::new(10.0, 15.0),
            ParameterRange::new(12.0, 20.0),
        )
    };
    let collapse = |r: ParameterRange| {
        if post {
            ParameterRange::point(r.midpoint())
        } else {
            r
        }
    };
    let mut schedules = BTreeMap::new();
    schedules.insert(
        "equipment".to_string(),
        DayPatternSet {
            weekday: Some(vec![
                RangedBlock::new("07:00", 0.1, 0.2),
                RangedBlock::new("22:00", 0.7, 0.9),
                RangedBlock::new("24:00", 0.1, 0.2),
            ]),
            weekend: Some(vec![
                RangedBlock::new("08:00", 0.1, 0.2),
                RangedBlock::new("22:00", 0.5, 0.7),
                RangedBlock::new("24:00", 0.1, 0.2),
            ]),
            ..Default::default()
        },
    );
    schedules.insert(
        "occupancy".to_string(),
        DayPatternSet {
            weekday: Some(vec![
                RangedBlock::new("07:00", 0.8, 1.0),
                RangedBlock::new("18:00", 0.2, 0.4),
                RangedBlock::new("24:00", 0.8, 1.0),
            ]),
            ..Default::default()
        },
    );
    ArchetypeBlock {
        params: params(&[
            ("lighting_watts_per_m2", collapse(lighting)),
            ("equipment_watts_per_m2", collapse(equipment)),
            ("occupancy_m2_per_person", collapse(occupancy)),
        ]),
        schedules,
        ..Default::default()
    }
}

fn dhw_block(function: BuildingFunction, post: bool) -> ArchetypeBlock {
    let usage = if function.is_residential() {
        ParameterRange::new(40.0, 60.0)
    } else {
        ParameterRange::new(10.0, 20.0)
    };
    let collapse = |r: ParameterRange| {
        if post {
            ParameterRange::point(r.midpoint())
        } else {
            r
        }
    };
    ArchetypeBlock {
        params: params(&[
            ("setpoint_c", ParameterRange::new(58.0, 60.0)),
            ("heater_efficiency", collapse(ParameterRange::new(0.75, 0.85))),
            ("usage_liters_per_person_day", collapse(usage)),
        ]),
        ..Default::default()
    }
}

fn fenestration_block(age: AgeRange, post: bool) -> ArchetypeBlock {
    let shgc = if age <= AgeRange::From1975To1991 {
        ParameterRange::new(0.6, 0.75)
    } else {
        ParameterRange::new(0.45, 0.6)
    };
    ArchetypeBlock {
        params: params(&[
            ("window_u_value", window_u(age, post)),
            ("window_shgc", shgc),
            ("window_to_wall_ratio", ParameterRange::new(0.2, 0.35)),
        ]),
        ..Default::default()
    }
}

fn shading_block() -> ArchetypeBlock {
    ArchetypeBlock {
        params: params(&[
            ("shading_setpoint_w_m2", ParameterRange::new(250.0, 350.0)),
            ("shading_transmittance", ParameterRange::new(0.2, 0.4)),
        ]),
        ..Default::default()
    }
}

/// Build the full default store.
pub fn builtin_store() -> ArchetypeStore {
    let mut store = ArchetypeStore::empty();
    for scenario in SCENARIOS {
        for stage in STAGES {
            let post = stage == "post_calibration";
            for function in [BuildingFunction::Residential, BuildingFunction::NonResidential] {
                for sub_type in sub_types_for(function) {
                    for age in AgeRange::ALL {
                        let path_tail =
                            [function.as_str(), sub_type, age.as_str()];
                        let mut path = vec![scenario, stage, "infiltration"];
                        path.extend_from_slice(&path_tail);
                        store.insert_leaf(
                            &path,
                            infiltration_block(scenario, function, sub_type, age, post),
                        );

                        let mut path = vec![scenario, stage, "ventilation"];
                        path.extend_from_slice(&path_tail);
                        store.insert_leaf(
                            &path,
                            ventilation_block(scenario, function, sub_type, age, post),
                        );

                        let mut path = vec![scenario, stage, "fenestration"];
                        path.extend_from_slice(&path_tail);
                        store.insert_leaf(&path, fenestration_block(age, post));
                    }
                }
                // Function-level leaves: the walk stops at the first leaf,
                // so subtype/age keys are simply not needed here.
                store.insert_leaf(
                    &[scenario, stage, "hvac", function.as_str()],
                    hvac_block(function, post),
                );
                store.insert_leaf(
                    &[scenario, stage, "loads", function.as_str()],
                    loads_block(function, post),
                );
                store.insert_leaf(
                    &[scenario, stage, "dhw", function.as_str()],
                    dhw_block(function, post),
                );
                store.insert_leaf(&[scenario, stage, "shading"], shading_block());
            }
        }
    }
    store
}
