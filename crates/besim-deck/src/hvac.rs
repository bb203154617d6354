//! Ideal-loads HVAC composition.
//!
//! For every zone: a dual-setpoint thermostat driven by a control-type
//! schedule fixed at 4, heating/cooling setpoint schedules synthesized from
//! the archetype day window, and a `ZoneHVAC:IdealLoadsAirSystem` wired
//! through equipment connections, an equipment list, and a supply node
//! list. System D routes its ventilation through the ideal-loads object via
//! the shared outdoor-air specification and sensible heat recovery.

use anyhow::Result;
use besim_archetype::{DayPatternSet, SetpointWindow};
use besim_core::PickStrategy;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

use crate::deck::Deck;
use crate::object::{DeckObject, FieldValue};
use crate::schedule::{
    apply_block_overrides, constant_schedule, setpoint_schedule, synthesize_from_patterns,
    TypeLimits,
};

/// Control-type schedule value selecting dual-setpoint control.
const DUAL_SETPOINT_CONTROL: f64 = 4.0;

pub const CONTROL_TYPE_SCHEDULE: &str = "Zone_Control_Type_Sched";
pub const HEATING_SETPOINT_SCHEDULE: &str = "ZONE_HEATING_SETPOINTS";
pub const COOLING_SETPOINT_SCHEDULE: &str = "ZONE_COOLING_SETPOINTS";
pub const AVAILABILITY_SCHEDULE: &str = "HVAC_Avail_Sched";

/// Assigned HVAC parameters plus the ventilation facts ideal loads needs.
#[derive(Debug, Clone)]
pub struct HvacInputs {
    pub heating_day_setpoint: f64,
    pub heating_night_setpoint: f64,
    pub cooling_day_setpoint: f64,
    pub cooling_night_setpoint: f64,
    pub max_heating_supply_air_temp: f64,
    pub min_cooling_supply_air_temp: f64,
    pub setpoint_window: SetpointWindow,
    pub availability_patterns: DayPatternSet,
    pub schedule_overrides: BTreeMap<String, Vec<(String, f64)>>,
    pub system_type: String,
    pub hrv_sensible: f64,
    pub hrv_latent: f64,
    /// Set when ventilation system D wrote the shared outdoor-air spec.
    pub dsoa_name: Option<String>,
}

/// Install schedules and per-zone HVAC objects.
pub fn compose_hvac(
    deck: &mut Deck,
    inputs: &HvacInputs,
    strategy: PickStrategy,
    rng: &mut StdRng,
) -> Result<()> {
    TypeLimits::Temperature.ensure_in_deck(deck)?;
    TypeLimits::ControlType.ensure_in_deck(deck)?;
    TypeLimits::Fraction.ensure_in_deck(deck)?;

    constant_schedule(
        CONTROL_TYPE_SCHEDULE,
        TypeLimits::ControlType,
        DUAL_SETPOINT_CONTROL,
    )
    .install(deck)?;

    setpoint_schedule(
        HEATING_SETPOINT_SCHEDULE,
        &inputs.setpoint_window,
        inputs.heating_day_setpoint,
        inputs.heating_night_setpoint,
    )?
    .install(deck)?;
    setpoint_schedule(
        COOLING_SETPOINT_SCHEDULE,
        &inputs.setpoint_window,
        inputs.cooling_day_setpoint,
        inputs.cooling_night_setpoint,
    )?
    .install(deck)?;

    let mut availability = inputs.availability_patterns.clone();
    apply_block_overrides(
        &mut availability,
        "hvac_availability",
        &inputs.schedule_overrides,
    );
    synthesize_from_patterns(
        AVAILABILITY_SCHEDULE,
        TypeLimits::Fraction,
        &availability,
        strategy,
        rng,
        None,
    )?
    .install(deck)?;

    let heat_recovery = inputs.system_type.eq_ignore_ascii_case("D");
    if let Some(dsoa) = &inputs.dsoa_name {
        deck.require("DESIGNSPECIFICATION:OUTDOORAIR", dsoa)?;
    }

    for zone_name in deck.zone_names() {
        compose_zone_hvac(deck, &zone_name, inputs, heat_recovery)?;
    }
    Ok(())
}

fn compose_zone_hvac(
    deck: &mut Deck,
    zone_name: &str,
    inputs: &HvacInputs,
    heat_recovery: bool,
) -> Result<()> {
    deck.require("ZONE", zone_name)?;

    let dual_setpoint_name = format!("{zone_name}_DualSP");
    let thermostat_name = format!("{zone_name}_Thermostat");
    let ideal_name = format!("{zone_name}_IdealLoads");
    let equipment_list_name = format!("{zone_name}_Equipment");
    let inlet_nodelist_name = format!("{zone_name}_Inlets");
    let supply_node = format!("{zone_name}_Supply_Inlet");
    let zone_air_node = format!("{zone_name}_Air_Node");
    let return_node = format!("{zone_name}_Return_Outlet");

    let dual = DeckObject::named("ThermostatSetpoint:DualSetpoint", dual_setpoint_name.clone())
        .with_field(
            "Heating_Setpoint_Temperature_Schedule_Name",
            FieldValue::text(HEATING_SETPOINT_SCHEDULE),
        )
        .with_field(
            "Cooling_Setpoint_Temperature_Schedule_Name",
            FieldValue::text(COOLING_SETPOINT_SCHEDULE),
        );
    deck.upsert(dual)?;

    deck.require("THERMOSTATSETPOINT:DUALSETPOINT", &dual_setpoint_name)?;
    let thermostat = DeckObject::named("ZoneControl:Thermostat", thermostat_name)
        .with_field("Zone_or_ZoneList_Name", FieldValue::text(zone_name))
        .with_field(
            "Control_Type_Schedule_Name",
            FieldValue::text(CONTROL_TYPE_SCHEDULE),
        )
        .with_field(
            "Control_1_Object_Type",
            FieldValue::text("ThermostatSetpoint:DualSetpoint"),
        )
        .with_field("Control_1_Name", FieldValue::text(&dual_setpoint_name));
    deck.upsert(thermostat)?;

    let mut ideal = DeckObject::named("ZoneHVAC:IdealLoadsAirSystem", ideal_name.clone())
        .with_field(
            "Availability_Schedule_Name",
            FieldValue::text(AVAILABILITY_SCHEDULE),
        )
        .with_field("Zone_Supply_Air_Node_Name", FieldValue::text(&supply_node))
        .with_field("Zone_Exhaust_Air_Node_Name", FieldValue::Empty)
        .with_field("System_Inlet_Air_Node_Name", FieldValue::Empty)
        .with_field(
            "Maximum_Heating_Supply_Air_Temperature",
            FieldValue::Number(inputs.max_heating_supply_air_temp),
        )
        .with_field(
            "Minimum_Cooling_Supply_Air_Temperature",
            FieldValue::Number(inputs.min_cooling_supply_air_temp),
        )
        .with_field(
            "Maximum_Heating_Supply_Air_Humidity_Ratio",
            FieldValue::Number(0.0156),
        )
        .with_field(
            "Minimum_Cooling_Supply_Air_Humidity_Ratio",
            FieldValue::Number(0.0077),
        )
        .with_field("Heating_Limit", FieldValue::text("NoLimit"))
        .with_field("Maximum_Heating_Air_Flow_Rate", FieldValue::Empty)
        .with_field("Maximum_Sensible_Heating_Capacity", FieldValue::Empty)
        .with_field("Cooling_Limit", FieldValue::text("NoLimit"))
        .with_field("Maximum_Cooling_Air_Flow_Rate", FieldValue::Empty)
        .with_field("Maximum_Total_Cooling_Capacity", FieldValue::Empty)
        .with_field("Heating_Availability_Schedule_Name", FieldValue::Empty)
        .with_field("Cooling_Availability_Schedule_Name", FieldValue::Empty)
        .with_field("Dehumidification_Control_Type", FieldValue::text("None"))
        .with_field("Cooling_Sensible_Heat_Ratio", FieldValue::Number(0.7))
        .with_field("Humidification_Control_Type", FieldValue::text("None"));
    match (&inputs.dsoa_name, heat_recovery) {
        (Some(dsoa), true) => {
            deck.require("DESIGNSPECIFICATION:OUTDOORAIR", dsoa)?;
            ideal.push_field(
                "Design_Specification_Outdoor_Air_Object_Name",
                FieldValue::text(dsoa),
            );
            ideal.push_field("Outdoor_Air_Inlet_Node_Name", FieldValue::Empty);
            ideal.push_field("Demand_Controlled_Ventilation_Type", FieldValue::text("None"));
            ideal.push_field("Outdoor_Air_Economizer_Type", FieldValue::text("NoEconomizer"));
            ideal.push_field("Heat_Recovery_Type", FieldValue::text("Sensible"));
            ideal.push_field(
                "Sensible_Heat_Recovery_Effectiveness",
                FieldValue::Number(inputs.hrv_sensible.clamp(0.0, 1.0)),
            );
            ideal.push_field(
                "Latent_Heat_Recovery_Effectiveness",
                FieldValue::Number(inputs.hrv_latent.clamp(0.0, 1.0)),
            );
        }
        _ => {
            ideal.push_field(
                "Design_Specification_Outdoor_Air_Object_Name",
                FieldValue::Empty,
            );
            ideal.push_field("Outdoor_Air_Inlet_Node_Name", FieldValue::Empty);
            ideal.push_field("Demand_Controlled_Ventilation_Type", FieldValue::text("None"));
            ideal.push_field("Outdoor_Air_Economizer_Type", FieldValue::text("NoEconomizer"));
            ideal.push_field("Heat_Recovery_Type", FieldValue::text("None"));
            ideal.push_field("Sensible_Heat_Recovery_Effectiveness", FieldValue::Number(0.0));
            ideal.push_field("Latent_Heat_Recovery_Effectiveness", FieldValue::Number(0.0));
        }
    }
    deck.upsert(ideal)?;

    deck.require("ZONEHVAC:IDEALLOADSAIRSYSTEM", &ideal_name)?;
    let equipment_list = DeckObject::named("ZoneHVAC:EquipmentList", equipment_list_name.clone())
        .with_field("Load_Distribution_Scheme", FieldValue::text("SequentialLoad"))
        .with_field(
            "Zone_Equipment_1_Object_Type",
            FieldValue::text("ZoneHVAC:IdealLoadsAirSystem"),
        )
        .with_field("Zone_Equipment_1_Name", FieldValue::text(&ideal_name))
        .with_field("Zone_Equipment_1_Cooling_Sequence", FieldValue::Number(1.0))
        .with_field(
            "Zone_Equipment_1_Heating_or_NoLoad_Sequence",
            FieldValue::Number(1.0),
        );
    deck.upsert(equipment_list)?;

    let mut connections = DeckObject::new("ZoneHVAC:EquipmentConnections");
    connections.push_field("Zone_Name", FieldValue::text(zone_name));
    connections.push_field(
        "Zone_Conditioning_Equipment_List_Name",
        FieldValue::text(&equipment_list_name),
    );
    connections.push_field(
        "Zone_Air_Inlet_Node_or_NodeList_Name",
        FieldValue::text(&inlet_nodelist_name),
    );
    connections.push_field("Zone_Air_Exhaust_Node_or_NodeList_Name", FieldValue::Empty);
    connections.push_field("Zone_Air_Node_Name", FieldValue::text(&zone_air_node));
    connections.push_field(
        "Zone_Return_Air_Node_or_NodeList_Name",
        FieldValue::text(&return_node),
    );
    deck.upsert(connections)?;

    let nodelist = DeckObject::named("NodeList", inlet_nodelist_name)
        .with_field("Node_1_Name", FieldValue::text(&supply_node));
    deck.upsert(nodelist)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ventilation::{compose_ventilation, VentilationInputs, DSOA_NAME};
    use besim_archetype::RangedBlock;
    use besim_core::BuildingFunction;
    use rand::SeedableRng;

    fn deck_with_zones() -> Deck {
        let mut deck = Deck::new();
        for (name, area) in [("Zone_Perim_1", 75.0), ("Zone_core", 25.0)] {
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
        deck
    }

    fn hvac_inputs(system: &str, dsoa: Option<String>) -> HvacInputs {
        HvacInputs {
            heating_day_setpoint: 20.0,
            heating_night_setpoint: 16.0,
            cooling_day_setpoint: 25.0,
            cooling_night_setpoint: 27.0,
            max_heating_supply_air_temp: 50.0,
            min_cooling_supply_air_temp: 13.0,
            setpoint_window: SetpointWindow::new("07:00", "19:00"),
            availability_patterns: DayPatternSet::all_days(vec![RangedBlock::fixed(
                "24:00", 1.0,
            )]),
            schedule_overrides: BTreeMap::new(),
            system_type: system.into(),
            hrv_sensible: 0.75,
            hrv_latent: 0.0,
            dsoa_name: dsoa,
        }
    }

    #[test]
    fn composes_thermostat_chain_per_zone() {
        let mut deck = deck_with_zones();
        let mut rng = StdRng::seed_from_u64(1);
        compose_hvac(&mut deck, &hvac_inputs("A", None), PickStrategy::Midpoint, &mut rng)
            .unwrap();

        assert!(deck.contains("SCHEDULETYPELIMITS", "Temperature"));
        assert!(deck.contains("SCHEDULETYPELIMITS", "ControlType"));
        assert!(deck.contains("SCHEDULETYPELIMITS", "Fraction"));
        assert!(deck.contains("SCHEDULE:COMPACT", HEATING_SETPOINT_SCHEDULE));
        for zone in ["Zone_Perim_1", "Zone_core"] {
            assert!(deck.contains("ZONECONTROL:THERMOSTAT", &format!("{zone}_Thermostat")));
            assert!(deck.contains("ZONEHVAC:IDEALLOADSAIRSYSTEM", &format!("{zone}_IdealLoads")));
            assert!(deck.contains("ZONEHVAC:EQUIPMENTCONNECTIONS", zone));
            assert!(deck.contains("NODELIST", &format!("{zone}_Inlets")));
        }
        let ideal = deck
            .get("ZONEHVAC:IDEALLOADSAIRSYSTEM", "Zone_Perim_1_IdealLoads")
            .unwrap();
        assert_eq!(ideal.text("Heat_Recovery_Type"), Some("None"));
        assert_eq!(
            ideal.number("Maximum_Heating_Supply_Air_Temperature"),
            Some(50.0)
        );
        assert!(deck.validate().is_empty());
    }

    #[test]
    fn control_type_schedule_selects_dual_setpoint() {
        let mut deck = deck_with_zones();
        let mut rng = StdRng::seed_from_u64(1);
        compose_hvac(&mut deck, &hvac_inputs("A", None), PickStrategy::Midpoint, &mut rng)
            .unwrap();
        let sched = deck
            .get("SCHEDULE:COMPACT", CONTROL_TYPE_SCHEDULE)
            .unwrap();
        let data: Vec<String> = sched
            .fields()
            .iter()
            .skip(2)
            .map(|(_, v)| v.to_string())
            .collect();
        assert_eq!(data, vec!["Through: 12/31", "For: AllDays", "Until: 24:00,4.0"]);
    }

    #[test]
    fn system_d_links_dsoa_and_heat_recovery() {
        let mut deck = deck_with_zones();
        // ventilation first: it writes the shared DSOA
        let vent_inputs = VentilationInputs {
            system_type: "D".into(),
            infiltration_base: 1.0,
            year_factor: 1.0,
            flow_exponent: 0.67,
            f_ctrl: 1.0,
            fan_pressure: 50.0,
            fan_total_efficiency: 0.7,
            hrv_sensible: 0.75,
            hrv_latent: 0.0,
            infiltration_schedule: "AlwaysOnSched".into(),
            ventilation_schedule: "VentSched".into(),
        };
        constant_schedule("AlwaysOnSched", TypeLimits::Fraction, 1.0)
            .install(&mut deck)
            .unwrap();
        let outcome = compose_ventilation(
            &mut deck,
            BuildingFunction::Residential,
            100.0,
            None,
            &vent_inputs,
        )
        .unwrap();

        let mut rng = StdRng::seed_from_u64(1);
        compose_hvac(
            &mut deck,
            &hvac_inputs("D", outcome.dsoa_name),
            PickStrategy::Midpoint,
            &mut rng,
        )
        .unwrap();
        let ideal = deck
            .get("ZONEHVAC:IDEALLOADSAIRSYSTEM", "Zone_Perim_1_IdealLoads")
            .unwrap();
        assert_eq!(ideal.text("Heat_Recovery_Type"), Some("Sensible"));
        assert_eq!(ideal.number("Sensible_Heat_Recovery_Effectiveness"), Some(0.75));
        assert_eq!(
            ideal.text("Design_Specification_Outdoor_Air_Object_Name"),
            Some(DSOA_NAME)
        );
        assert!(deck.validate().is_empty());
    }

    #[test]
    fn availability_override_reshapes_schedule() {
        let mut deck = deck_with_zones();
        let mut inputs = hvac_inputs("A", None);
        inputs.schedule_overrides.insert(
            "hvac_availability_weekday".into(),
            vec![("06:00".into(), 1.0), ("22:00".into(), 0.3), ("24:00".into(), 0.0)],
        );
        let mut rng = StdRng::seed_from_u64(1);
        compose_hvac(&mut deck, &inputs, PickStrategy::Midpoint, &mut rng).unwrap();
        let sched = deck.get("SCHEDULE:COMPACT", AVAILABILITY_SCHEDULE).unwrap();
        let rendered: Vec<String> = sched
            .fields()
            .iter()
            .map(|(_, v)| v.to_string())
            .collect();
        assert!(rendered.iter().any(|f| f == "Until: 06:00,1.0"));
        assert!(rendered.iter().any(|f| f == "Until: 22:00,0.3"));
    }
}
