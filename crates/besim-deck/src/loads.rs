//! Internal loads, DHW, fenestration and shading composition.
//!
//! These subsystems rewrite fields on existing objects where the base deck
//! already carries them and create per-zone objects where it does not.
//! Field names are the registry's canonical names, so variant edits later
//! address exactly what was written here.

use anyhow::Result;
use besim_archetype::DayPatternSet;
use besim_core::PickStrategy;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use tracing::warn;

use crate::deck::Deck;
use crate::object::{DeckObject, FieldValue};
use crate::schedule::{
    apply_block_overrides, constant_schedule, synthesize_from_patterns, TypeLimits,
};

pub const EQUIPMENT_SCHEDULE: &str = "Equip_Sched";
pub const OCCUPANCY_SCHEDULE: &str = "Occupancy_Sched";
pub const DHW_SETPOINT_SCHEDULE: &str = "DHW_Setpoint_Sched";

/// Resolved internal-loads parameters.
#[derive(Debug, Clone)]
pub struct LoadsInputs {
    pub lighting_watts_per_m2: f64,
    pub equipment_watts_per_m2: f64,
    pub occupancy_m2_per_person: f64,
    pub equipment_patterns: DayPatternSet,
    pub occupancy_patterns: DayPatternSet,
    pub schedule_overrides: BTreeMap<String, Vec<(String, f64)>>,
}

/// Lighting, equipment and occupancy objects per zone.
pub fn compose_loads(
    deck: &mut Deck,
    inputs: &LoadsInputs,
    strategy: PickStrategy,
    rng: &mut StdRng,
) -> Result<()> {
    let mut equipment_patterns = inputs.equipment_patterns.clone();
    apply_block_overrides(&mut equipment_patterns, "equipment", &inputs.schedule_overrides);
    synthesize_from_patterns(
        EQUIPMENT_SCHEDULE,
        TypeLimits::Fraction,
        &equipment_patterns,
        strategy,
        rng,
        None,
    )?
    .install(deck)?;

    let mut occupancy_patterns = inputs.occupancy_patterns.clone();
    apply_block_overrides(&mut occupancy_patterns, "occupancy", &inputs.schedule_overrides);
    synthesize_from_patterns(
        OCCUPANCY_SCHEDULE,
        TypeLimits::Fraction,
        &occupancy_patterns,
        strategy,
        rng,
        None,
    )?
    .install(deck)?;

    for zone_name in deck.zone_names() {
        deck.require("ZONE", &zone_name)?;
        let lights = DeckObject::named("Lights", format!("Lights_{zone_name}"))
            .with_field("Zone_or_ZoneList_Name", FieldValue::text(&zone_name))
            .with_field("Schedule_Name", FieldValue::text(EQUIPMENT_SCHEDULE))
            .with_field(
                "Design_Level_Calculation_Method",
                FieldValue::text("Watts/Area"),
            )
            .with_field("Lighting_Level", FieldValue::Empty)
            .with_field(
                "Watts_per_Zone_Floor_Area",
                FieldValue::Number(inputs.lighting_watts_per_m2),
            )
            .with_field("Watts_per_Person", FieldValue::Empty)
            .with_field("Return_Air_Fraction", FieldValue::Number(0.0))
            .with_field("Fraction_Radiant", FieldValue::Number(0.42))
            .with_field("Fraction_Visible", FieldValue::Number(0.18))
            .with_field("Fraction_Replaceable", FieldValue::Number(1.0));
        deck.upsert(lights)?;

        let equipment = DeckObject::named("ElectricEquipment", format!("Equip_{zone_name}"))
            .with_field("Zone_or_ZoneList_Name", FieldValue::text(&zone_name))
            .with_field("Schedule_Name", FieldValue::text(EQUIPMENT_SCHEDULE))
            .with_field(
                "Design_Level_Calculation_Method",
                FieldValue::text("Watts/Area"),
            )
            .with_field("Design_Level", FieldValue::Empty)
            .with_field(
                "Watts_per_Zone_Floor_Area",
                FieldValue::Number(inputs.equipment_watts_per_m2),
            )
            .with_field("Watts_per_Person", FieldValue::Empty)
            .with_field("Fraction_Latent", FieldValue::Number(0.0))
            .with_field("Fraction_Radiant", FieldValue::Number(0.3))
            .with_field("Fraction_Lost", FieldValue::Number(0.0));
        deck.upsert(equipment)?;

        let people = DeckObject::named("People", format!("People_{zone_name}"))
            .with_field("Zone_or_ZoneList_Name", FieldValue::text(&zone_name))
            .with_field(
                "Number_of_People_Schedule_Name",
                FieldValue::text(OCCUPANCY_SCHEDULE),
            )
            .with_field(
                "Number_of_People_Calculation_Method",
                FieldValue::text("Area/Person"),
            )
            .with_field("Number_of_People", FieldValue::Empty)
            .with_field("People_per_Zone_Floor_Area", FieldValue::Empty)
            .with_field(
                "Zone_Floor_Area_per_Person",
                FieldValue::Number(inputs.occupancy_m2_per_person.max(1.0)),
            )
            .with_field("Fraction_Radiant", FieldValue::Number(0.3))
            .with_field("Sensible_Heat_Fraction", FieldValue::Empty)
            .with_field("Activity_Level_Schedule_Name", FieldValue::Empty);
        deck.upsert(people)?;
    }
    Ok(())
}

/// Resolved DHW parameters.
#[derive(Debug, Clone)]
pub struct DhwInputs {
    pub setpoint_c: f64,
    pub heater_efficiency: f64,
    pub usage_liters_per_person_day: f64,
}

/// One mixed water heater per building with a constant setpoint schedule.
pub fn compose_dhw(deck: &mut Deck, inputs: &DhwInputs) -> Result<()> {
    constant_schedule(DHW_SETPOINT_SCHEDULE, TypeLimits::Temperature, inputs.setpoint_c)
        .install(deck)?;
    // Tank sized for a four-person day of storage, floored at 150 L.
    let tank_volume_m3 = (inputs.usage_liters_per_person_day * 4.0 / 1000.0).max(0.15);
    let heater = DeckObject::named("WaterHeater:Mixed", "DHW_Heater")
        .with_field("Tank_Volume", FieldValue::Number(tank_volume_m3))
        .with_field(
            "Setpoint_Temperature_Schedule_Name",
            FieldValue::text(DHW_SETPOINT_SCHEDULE),
        )
        .with_field("Deadband_Temperature_Difference", FieldValue::Number(2.0))
        .with_field("Maximum_Temperature_Limit", FieldValue::Number(82.0))
        .with_field("Heater_Control_Type", FieldValue::text("Cycle"))
        .with_field("Heater_Maximum_Capacity", FieldValue::Number(10000.0))
        .with_field("Heater_Minimum_Capacity", FieldValue::Number(0.0))
        .with_field("Heater_Ignition_Minimum_Flow_Rate", FieldValue::Number(0.0))
        .with_field("Heater_Ignition_Delay", FieldValue::Number(0.0))
        .with_field("Heater_Fuel_Type", FieldValue::text("Electricity"))
        .with_field(
            "Heater_Thermal_Efficiency",
            FieldValue::Number(inputs.heater_efficiency.clamp(0.0, 1.0)),
        );
    deck.upsert(heater)?;
    Ok(())
}

/// Resolved fenestration parameters.
#[derive(Debug, Clone)]
pub struct FenestrationInputs {
    pub window_u_value: f64,
    pub window_shgc: f64,
    pub window_to_wall_ratio: f64,
}

/// Rewrite glazing properties on every simple-glazing material, creating a
/// default one when the base deck has none.
pub fn compose_fenestration(deck: &mut Deck, inputs: &FenestrationInputs) -> Result<()> {
    let mut rewrote = false;
    for glazing in deck.objects_of_type_mut("WINDOWMATERIAL:SIMPLEGLAZINGSYSTEM") {
        glazing
            .set_field("UFactor", FieldValue::Number(inputs.window_u_value))
            .and_then(|_| {
                glazing.set_field(
                    "Solar_Heat_Gain_Coefficient",
                    FieldValue::Number(inputs.window_shgc),
                )
            })
            .map_err(|err| anyhow::anyhow!(err))?;
        rewrote = true;
    }
    if !rewrote {
        let glazing = DeckObject::named("WindowMaterial:SimpleGlazingSystem", "Window_Glazing")
            .with_field("UFactor", FieldValue::Number(inputs.window_u_value))
            .with_field(
                "Solar_Heat_Gain_Coefficient",
                FieldValue::Number(inputs.window_shgc),
            )
            .with_field("Visible_Transmittance", FieldValue::Number(0.6));
        deck.add(glazing)?;
    }
    if !(0.0..=1.0).contains(&inputs.window_to_wall_ratio) {
        warn!(
            "window-to-wall ratio {} outside [0, 1]; geometry step will clamp",
            inputs.window_to_wall_ratio
        );
    }
    Ok(())
}

/// Resolved shading parameters.
#[derive(Debug, Clone)]
pub struct ShadingInputs {
    pub setpoint_w_m2: f64,
    pub transmittance: f64,
}

/// One exterior-shade control per zone, activated on incident solar.
pub fn compose_shading(deck: &mut Deck, inputs: &ShadingInputs) -> Result<()> {
    if !deck.contains("WINDOWMATERIAL:SHADE", "Shade_Material") {
        let shade = DeckObject::named("WindowMaterial:Shade", "Shade_Material")
            .with_field(
                "Solar_Transmittance",
                FieldValue::Number(inputs.transmittance.clamp(0.0, 1.0)),
            )
            .with_field("Solar_Reflectance", FieldValue::Number(0.5))
            .with_field(
                "Visible_Transmittance",
                FieldValue::Number(inputs.transmittance.clamp(0.0, 1.0)),
            )
            .with_field("Visible_Reflectance", FieldValue::Number(0.5))
            .with_field("Thermal_Hemispherical_Emissivity", FieldValue::Number(0.9))
            .with_field("Thermal_Transmittance", FieldValue::Number(0.0))
            .with_field("Thickness", FieldValue::Number(0.005))
            .with_field("Conductivity", FieldValue::Number(0.1));
        deck.add(shade)?;
    }
    for zone_name in deck.zone_names() {
        let control = DeckObject::named("WindowShadingControl", format!("Shading_{zone_name}"))
            .with_field("Zone_Name", FieldValue::text(&zone_name))
            .with_field("Shading_Control_Sequence_Number", FieldValue::Number(1.0))
            .with_field("Shading_Type", FieldValue::text("ExteriorShade"))
            .with_field("Construction_with_Shading_Name", FieldValue::Empty)
            .with_field(
                "Shading_Control_Type",
                FieldValue::text("OnIfHighSolarOnWindow"),
            )
            .with_field("Schedule_Name", FieldValue::Empty)
            .with_field("Setpoint", FieldValue::Number(inputs.setpoint_w_m2));
        deck.upsert(control)?;
    }
    Ok(())
}
