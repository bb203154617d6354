//! Ventilation and infiltration composition.
//!
//! Flow arithmetic follows NTA 8800 practice: archetype infiltration rates
//! are tabulated per m² floor area at 10 Pa and converted to a 1 Pa basis
//! with a flow exponent (0.67 for leak losses); required mechanical
//! ventilation applies a usage-specific supply rate, the system control
//! factor, and a dwelling minimum of 126 m³/h, then distributes the total
//! over zones in proportion to floor area. Core zones get zero
//! infiltration.

use anyhow::Result;
use besim_core::units::{liters_per_s_to_m3_per_h, CubicMetersPerSecond, Pascals, Watts};
use besim_core::BuildingFunction;
use tracing::warn;

use crate::deck::Deck;
use crate::object::{DeckObject, FieldValue};
use crate::systems::{system_spec, VentSystemSpec};

/// Usage-specific supply rates in L/s per m², non-residential.
const USAGE_RATES_L_S_M2: [(&str, f64); 10] = [
    ("office_area_based", 1.0),
    ("childcare", 4.8),
    ("retail", 0.6),
    ("meeting_function", 1.0),
    ("healthcare_function", 1.2),
    ("sport_function", 1.5),
    ("cell_function", 0.8),
    ("industrial_function", 0.5),
    ("accommodation_function", 0.9),
    ("education_function", 1.1),
];

/// Dwelling supply rate in L/s per m².
const RESIDENTIAL_RATE_L_S_M2: f64 = 0.9;
/// Dwelling minimum supply in m³/h, applied after the control factor.
const RESIDENTIAL_MIN_M3_H: f64 = 126.0;

/// Infiltration rate at 1 Pa per m² floor area, in the same volumetric unit
/// as the 10 Pa base rate (m³/h per m² in the archetype tables).
///
/// `qv1 = base · year_factor · (1/10)^n`. Invalid inputs produce 0 with a
/// warning rather than poisoning the deck.
pub fn infiltration_rate_at_1pa_per_m2(
    base_at_10pa_per_m2: f64,
    year_factor: f64,
    flow_exponent: f64,
) -> f64 {
    if base_at_10pa_per_m2 < 0.0
        || year_factor < 0.0
        || flow_exponent <= 0.0
        || base_at_10pa_per_m2.is_nan()
        || year_factor.is_nan()
        || flow_exponent.is_nan()
    {
        warn!(
            "invalid infiltration inputs (base={base_at_10pa_per_m2}, year_factor={year_factor}, \
             exponent={flow_exponent}); using 0"
        );
        return 0.0;
    }
    base_at_10pa_per_m2 * year_factor * (0.1f64).powf(flow_exponent)
}

/// Total required mechanical ventilation flow for the building.
pub fn required_ventilation_flow(
    function: BuildingFunction,
    f_ctrl: f64,
    floor_area_m2: f64,
    usage_key: Option<&str>,
) -> CubicMetersPerSecond {
    if floor_area_m2 <= 0.0 || floor_area_m2.is_nan() {
        warn!("invalid floor area {floor_area_m2} for required ventilation; using 0");
        return CubicMetersPerSecond(0.0);
    }
    let f_ctrl = if f_ctrl < 0.0 {
        warn!("negative f_ctrl {f_ctrl}; using 0");
        0.0
    } else {
        f_ctrl
    };

    let rate_l_s_m2 = match function {
        BuildingFunction::Residential => RESIDENTIAL_RATE_L_S_M2,
        BuildingFunction::NonResidential => usage_key
            .and_then(|key| {
                USAGE_RATES_L_S_M2
                    .iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, rate)| *rate)
            })
            .unwrap_or(1.0),
    };
    let design_m3_h = liters_per_s_to_m3_per_h(rate_l_s_m2 * floor_area_m2);
    let mut actual_m3_h = design_m3_h * f_ctrl;
    // The dwelling minimum applies after the control factor, but a control
    // factor of zero means the system is off.
    if function.is_residential() && f_ctrl > 0.0 && actual_m3_h.value() < RESIDENTIAL_MIN_M3_H {
        actual_m3_h = besim_core::units::CubicMetersPerHour(RESIDENTIAL_MIN_M3_H);
    }
    actual_m3_h.to_m3_per_s()
}

/// Fan power from pressure rise, efficiency, and flow.
pub fn fan_power(pressure: Pascals, total_efficiency: f64, flow: CubicMetersPerSecond) -> Watts {
    if total_efficiency <= 0.0 || total_efficiency > 1.0 {
        warn!("invalid fan efficiency {total_efficiency}; reporting 0 W");
        return Watts(0.0);
    }
    if flow.value() <= 0.0 {
        return Watts(0.0);
    }
    Watts(pressure.value() * flow.value() / total_efficiency)
}

/// Zone facts needed to distribute flows.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneInfo {
    pub name: String,
    pub floor_area: f64,
    pub is_core: bool,
}

impl ZoneInfo {
    /// Derive zone info from the deck's Zone objects; core zones are
    /// identified by the `_core` naming convention.
    pub fn from_deck(deck: &Deck) -> Vec<ZoneInfo> {
        deck.objects_of_type("ZONE")
            .filter_map(|zone| {
                let name = zone.name()?.to_string();
                let floor_area = zone.number("Floor_Area").unwrap_or_else(|| {
                    warn!("zone '{name}' has no floor area; excluding from distribution");
                    0.0
                });
                let is_core = name.to_ascii_lowercase().contains("_core");
                Some(ZoneInfo {
                    name,
                    floor_area,
                    is_core,
                })
            })
            .collect()
    }
}

/// Inputs resolved by the parameter assigner for one building.
#[derive(Debug, Clone)]
pub struct VentilationInputs {
    pub system_type: String,
    pub infiltration_base: f64,
    pub year_factor: f64,
    pub flow_exponent: f64,
    pub f_ctrl: f64,
    pub fan_pressure: f64,
    pub fan_total_efficiency: f64,
    pub hrv_sensible: f64,
    pub hrv_latent: f64,
    pub infiltration_schedule: String,
    pub ventilation_schedule: String,
}

/// What ventilation composition produced, for logging and the HVAC step.
#[derive(Debug, Clone, Default)]
pub struct VentilationOutcome {
    pub infiltration_rate_qv1_m3_h_per_m2: f64,
    pub total_required_m3_s: f64,
    pub dsoa_name: Option<String>,
    pub zone_flows: Vec<(String, f64, f64)>,
}

/// Name of the shared outdoor-air specification written for system D.
pub const DSOA_NAME: &str = "DSOA_Global";

/// Write per-zone infiltration (always) and ventilation (systems A-C)
/// objects; for system D write the shared outdoor-air specification only.
pub fn compose_ventilation(
    deck: &mut Deck,
    function: BuildingFunction,
    building_floor_area_m2: f64,
    usage_key: Option<&str>,
    inputs: &VentilationInputs,
) -> Result<VentilationOutcome> {
    let spec: &VentSystemSpec = system_spec(function, &inputs.system_type);
    let zones = ZoneInfo::from_deck(deck);
    if zones.is_empty() {
        warn!("no zones in deck; skipping infiltration/ventilation objects");
        return Ok(VentilationOutcome::default());
    }

    deck.require("SCHEDULE:COMPACT", &inputs.infiltration_schedule)?;
    if !spec.uses_ideal_loads() {
        deck.require("SCHEDULE:COMPACT", &inputs.ventilation_schedule)?;
    }

    let qv1_per_m2 = infiltration_rate_at_1pa_per_m2(
        inputs.infiltration_base,
        inputs.year_factor,
        inputs.flow_exponent,
    );
    let total_required =
        required_ventilation_flow(function, inputs.f_ctrl, building_floor_area_m2, usage_key);

    let mut total_zone_area: f64 = zones
        .iter()
        .map(|zone| zone.floor_area.max(0.0))
        .sum();
    let equal_split = total_zone_area <= 0.0;
    if equal_split {
        warn!("total zone floor area is zero; splitting flows equally across zones");
        total_zone_area = building_floor_area_m2.max(1.0);
    }

    let mut outcome = VentilationOutcome {
        infiltration_rate_qv1_m3_h_per_m2: qv1_per_m2,
        total_required_m3_s: total_required.value(),
        ..Default::default()
    };

    if spec.uses_ideal_loads() {
        ensure_dsoa(deck)?;
        outcome.dsoa_name = Some(DSOA_NAME.to_string());
    }

    let zone_count = zones.len() as f64;
    for zone in &zones {
        let infiltration_m3_s = if equal_split {
            (qv1_per_m2 * total_zone_area / 3600.0) / zone_count
        } else if zone.is_core {
            0.0
        } else {
            qv1_per_m2 * zone.floor_area / 3600.0
        };
        let ventilation_m3_s = if equal_split {
            total_required.value() / zone_count
        } else {
            total_required.value() * (zone.floor_area.max(0.0) / total_zone_area)
        };

        let infiltration_name = format!("Infil_{}_{}", inputs.system_type, zone.name);
        let infiltration = DeckObject::named("ZoneInfiltration:DesignFlowRate", infiltration_name)
            .with_field("Zone_or_ZoneList_Name", FieldValue::text(&zone.name))
            .with_field("Schedule_Name", FieldValue::text(&inputs.infiltration_schedule))
            .with_field("Design_Flow_Rate_Calculation_Method", FieldValue::text("Flow/Zone"))
            .with_field("Design_Flow_Rate", FieldValue::Number(infiltration_m3_s))
            .with_field("Flow_per_Zone_Floor_Area", FieldValue::Empty)
            .with_field("Flow_per_Exterior_Surface_Area", FieldValue::Empty)
            .with_field("Air_Changes_per_Hour", FieldValue::Empty)
            .with_field("Constant_Term_Coefficient", FieldValue::Number(1.0))
            .with_field("Temperature_Term_Coefficient", FieldValue::Number(0.0))
            .with_field("Velocity_Term_Coefficient", FieldValue::Number(0.0))
            .with_field("Velocity_Squared_Term_Coefficient", FieldValue::Number(0.0));
        deck.upsert(infiltration)?;

        if !spec.uses_ideal_loads() {
            let name = format!("Vent_{}_{}", inputs.system_type, zone.name);
            let mut vent = DeckObject::named("ZoneVentilation:DesignFlowRate", name)
                .with_field("Zone_or_ZoneList_Name", FieldValue::text(&zone.name))
                .with_field("Schedule_Name", FieldValue::text(&inputs.ventilation_schedule))
                .with_field("Design_Flow_Rate_Calculation_Method", FieldValue::text("Flow/Zone"))
                .with_field("Design_Flow_Rate", FieldValue::Number(ventilation_m3_s))
                .with_field("Flow_Rate_per_Zone_Floor_Area", FieldValue::Empty)
                .with_field("Flow_Rate_per_Person", FieldValue::Empty)
                .with_field("Air_Changes_per_Hour", FieldValue::Empty)
                .with_field(
                    "Ventilation_Type",
                    FieldValue::text(spec.direction.as_str()),
                );
            if spec.has_fan() {
                vent.push_field(
                    "Fan_Pressure_Rise",
                    FieldValue::Number(inputs.fan_pressure.max(0.0)),
                );
                vent.push_field(
                    "Fan_Total_Efficiency",
                    FieldValue::Number(inputs.fan_total_efficiency.clamp(0.0, 1.0)),
                );
            } else {
                vent.push_field("Fan_Pressure_Rise", FieldValue::Number(0.0));
                vent.push_field("Fan_Total_Efficiency", FieldValue::Number(1.0));
            }
            vent.push_field("Constant_Term_Coefficient", FieldValue::Number(1.0));
            vent.push_field("Temperature_Term_Coefficient", FieldValue::Number(0.0));
            vent.push_field("Velocity_Term_Coefficient", FieldValue::Number(0.0));
            vent.push_field("Velocity_Squared_Term_Coefficient", FieldValue::Number(0.0));
            deck.upsert(vent)?;
        }
        outcome
            .zone_flows
            .push((zone.name.clone(), infiltration_m3_s, ventilation_m3_s));
    }
    Ok(outcome)
}

fn ensure_dsoa(deck: &mut Deck) -> Result<()> {
    if deck.contains("DESIGNSPECIFICATION:OUTDOORAIR", DSOA_NAME) {
        return Ok(());
    }
    let dsoa = DeckObject::named("DesignSpecification:OutdoorAir", DSOA_NAME)
        .with_field("Outdoor_Air_Method", FieldValue::text("Sum"))
        .with_field("Outdoor_Air_Flow_per_Person", FieldValue::Number(0.00236))
        .with_field(
            "Outdoor_Air_Flow_per_Zone_Floor_Area",
            FieldValue::Number(0.000305),
        )
        .with_field("Outdoor_Air_Flow_per_Zone", FieldValue::Number(0.0))
        .with_field(
            "Outdoor_Air_Flow_Air_Changes_per_Hour",
            FieldValue::Number(0.0),
        );
    deck.add(dsoa)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{constant_schedule, TypeLimits};

    #[test]
    fn infiltration_rate_matches_reference_case() {
        // Corner House, 1992-2005, scenario1 pre, midpoint picks.
        let qv1 = infiltration_rate_at_1pa_per_m2(1.3, 1.2, 0.67);
        assert!((qv1 - 0.333).abs() < 5e-4, "got {qv1}");
    }

    #[test]
    fn invalid_infiltration_inputs_produce_zero() {
        assert_eq!(infiltration_rate_at_1pa_per_m2(-1.0, 1.0, 0.67), 0.0);
        assert_eq!(infiltration_rate_at_1pa_per_m2(1.0, 1.0, 0.0), 0.0);
        assert_eq!(infiltration_rate_at_1pa_per_m2(f64::NAN, 1.0, 0.67), 0.0);
    }

    #[test]
    fn office_required_flow_matches_reference_case() {
        let flow = required_ventilation_flow(
            BuildingFunction::NonResidential,
            0.65,
            500.0,
            Some("office_area_based"),
        );
        assert!((flow.value() - 0.325).abs() < 1e-12, "got {}", flow.value());
    }

    #[test]
    fn residential_minimum_applies_after_control_factor() {
        // 30 m2 dwelling: 0.9 * 30 * 3.6 = 97.2 m3/h < 126 minimum.
        let flow = required_ventilation_flow(BuildingFunction::Residential, 1.0, 30.0, None);
        assert!((flow.value() - 126.0 / 3600.0).abs() < 1e-12);
        // f_ctrl = 0 switches the system off entirely.
        let off = required_ventilation_flow(BuildingFunction::Residential, 0.0, 30.0, None);
        assert_eq!(off.value(), 0.0);
    }

    #[test]
    fn fan_power_guards_efficiency() {
        assert_eq!(fan_power(Pascals(50.0), 0.0, CubicMetersPerSecond(0.1)).value(), 0.0);
        let power = fan_power(Pascals(50.0), 0.7, CubicMetersPerSecond(0.1));
        assert!((power.value() - 7.1428).abs() < 1e-3);
    }

    fn deck_with_zones() -> Deck {
        let mut deck = Deck::new();
        for (name, area) in [("Zone_Perim_1", 60.0), ("Zone_Perim_2", 60.0), ("Zone_core", 30.0)] {
            let mut zone = DeckObject::named("Zone", name);
            for field in [
                "Direction_of_Relative_North",
                "X_Origin",
                "Y_Origin",
                "Z_Origin",
                "Type",
                "Multiplier",
                "Ceiling_Height",
                "Volume",
            ] {
                zone.push_field(field, FieldValue::Empty);
            }
            zone.push_field("Floor_Area", FieldValue::Number(area));
            deck.add(zone).unwrap();
        }
        constant_schedule("AlwaysOnSched", TypeLimits::Fraction, 1.0)
            .install(&mut deck)
            .unwrap();
        constant_schedule("VentSched", TypeLimits::Fraction, 1.0)
            .install(&mut deck)
            .unwrap();
        deck
    }

    fn inputs(system: &str) -> VentilationInputs {
        VentilationInputs {
            system_type: system.into(),
            infiltration_base: 1.3,
            year_factor: 1.2,
            flow_exponent: 0.67,
            f_ctrl: 0.95,
            fan_pressure: 50.0,
            fan_total_efficiency: 0.7,
            hrv_sensible: 0.75,
            hrv_latent: 0.0,
            infiltration_schedule: "AlwaysOnSched".into(),
            ventilation_schedule: "VentSched".into(),
        }
    }

    #[test]
    fn system_a_writes_infiltration_and_natural_ventilation() {
        let mut deck = deck_with_zones();
        let outcome = compose_ventilation(
            &mut deck,
            BuildingFunction::Residential,
            150.0,
            None,
            &inputs("A"),
        )
        .unwrap();
        assert_eq!(outcome.zone_flows.len(), 3);
        // every zone gets infiltration; core zone gets zero flow
        let core = deck
            .get("ZONEINFILTRATION:DESIGNFLOWRATE", "Infil_A_Zone_core")
            .unwrap();
        assert_eq!(core.number("Design_Flow_Rate"), Some(0.0));
        let perim = deck
            .get("ZONEINFILTRATION:DESIGNFLOWRATE", "Infil_A_Zone_Perim_1")
            .unwrap();
        let expected = infiltration_rate_at_1pa_per_m2(1.3, 1.2, 0.67) * 60.0 / 3600.0;
        assert!((perim.number("Design_Flow_Rate").unwrap() - expected).abs() < 1e-12);
        let vent = deck
            .get("ZONEVENTILATION:DESIGNFLOWRATE", "Vent_A_Zone_Perim_1")
            .unwrap();
        assert_eq!(vent.text("Ventilation_Type"), Some("Natural"));
        assert_eq!(vent.number("Fan_Total_Efficiency"), Some(1.0));
        assert!(outcome.dsoa_name.is_none());
    }

    #[test]
    fn ventilation_distributes_by_floor_area() {
        let mut deck = deck_with_zones();
        let outcome = compose_ventilation(
            &mut deck,
            BuildingFunction::Residential,
            150.0,
            None,
            &inputs("C"),
        )
        .unwrap();
        let total: f64 = outcome.zone_flows.iter().map(|(_, _, v)| v).sum();
        assert!((total - outcome.total_required_m3_s).abs() < 1e-12);
        // 60/150 of the total to each perimeter zone, 30/150 to the core
        let core_share = outcome
            .zone_flows
            .iter()
            .find(|(name, _, _)| name == "Zone_core")
            .unwrap()
            .2;
        assert!((core_share - outcome.total_required_m3_s * 0.2).abs() < 1e-12);
        let vent = deck
            .get("ZONEVENTILATION:DESIGNFLOWRATE", "Vent_C_Zone_Perim_1")
            .unwrap();
        assert_eq!(vent.text("Ventilation_Type"), Some("Exhaust"));
        assert_eq!(vent.number("Fan_Pressure_Rise"), Some(50.0));
    }

    #[test]
    fn system_d_writes_shared_dsoa_and_no_zone_ventilation() {
        let mut deck = deck_with_zones();
        let outcome = compose_ventilation(
            &mut deck,
            BuildingFunction::Residential,
            150.0,
            None,
            &inputs("D"),
        )
        .unwrap();
        assert_eq!(outcome.dsoa_name.as_deref(), Some(DSOA_NAME));
        assert!(deck.contains("DESIGNSPECIFICATION:OUTDOORAIR", DSOA_NAME));
        assert_eq!(
            deck.objects_of_type("ZONEVENTILATION:DESIGNFLOWRATE").count(),
            0
        );
        // infiltration still written for every zone
        assert_eq!(
            deck.objects_of_type("ZONEINFILTRATION:DESIGNFLOWRATE").count(),
            3
        );
    }

    #[test]
    fn missing_schedule_is_a_dependency_error() {
        let mut deck = deck_with_zones();
        let mut bad = inputs("A");
        bad.infiltration_schedule = "NoSuchSched".into();
        let err = compose_ventilation(
            &mut deck,
            BuildingFunction::Residential,
            150.0,
            None,
            &bad,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not found in deck"));
    }
}
