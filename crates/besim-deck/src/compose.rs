//! The deck composer: runs the parameter assigner per subsystem, the
//! schedule synthesizer per needed schedule, and the subsystem inserters,
//! in dependency order, against one base deck.
//!
//! A missing reference degrades the deck (the offending object is skipped
//! and reported) instead of writing a broken deck; a malformed base deck
//! fails the (building, variant) outright.

use anyhow::Result;
use besim_archetype::{
    assign_all, mappings, ArchetypeStore, AssignQuery, DayPatternSet, ResolvedSubsystem,
    SetpointWindow,
};
use besim_core::{
    BesimError, Building, OverrideRecord, PickStrategy, Scenario, Subsystem,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeMap;
use tracing::warn;

use crate::deck::Deck;
use crate::hvac::{compose_hvac, HvacInputs};
use crate::loads::{
    compose_dhw, compose_fenestration, compose_loads, compose_shading, DhwInputs,
    FenestrationInputs, LoadsInputs, ShadingInputs,
};
use crate::schedule::{synthesize_from_patterns, TypeLimits};
use crate::ventilation::{compose_ventilation, VentilationInputs, VentilationOutcome};

/// Composer configuration shared across buildings of one run.
#[derive(Debug, Clone)]
pub struct DeckComposer<'a> {
    pub store: &'a ArchetypeStore,
    pub overrides: &'a [OverrideRecord],
    pub strategy: PickStrategy,
    pub random_seed: Option<u64>,
}

/// What composition did to one deck.
#[derive(Debug, Clone, Default)]
pub struct CompositionReport {
    pub building_id: u64,
    /// True when an object was skipped over an unresolved reference.
    pub degraded: bool,
    pub issues: Vec<String>,
    pub resolved: BTreeMap<Subsystem, ResolvedSubsystem>,
    pub ventilation: VentilationOutcome,
}

impl<'a> DeckComposer<'a> {
    /// Compose all subsystems into `deck` for `building` under `scenario`.
    pub fn compose(
        &self,
        deck: &mut Deck,
        building: &Building,
        scenario: &Scenario,
    ) -> Result<CompositionReport> {
        let query = AssignQuery {
            building_id: building.building_id,
            building_function: building.building_function,
            sub_type: building.building_sub_type.clone(),
            age_range: building.age_range,
            scenario: scenario.scenario_name.clone(),
            calibration_stage: scenario.calibration_stage,
            pick_strategy: self.strategy,
            random_seed: self.random_seed,
        };
        let resolved = assign_all(self.store, &query, self.overrides)?;
        let mut rng = match self.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut report = CompositionReport {
            building_id: building.building_id,
            resolved: resolved.clone(),
            ..Default::default()
        };

        let vent = &resolved[&Subsystem::Ventilation];
        let infiltration = &resolved[&Subsystem::Infiltration];
        let hvac = &resolved[&Subsystem::Hvac];
        let loads = &resolved[&Subsystem::Loads];
        let dhw = &resolved[&Subsystem::Dhw];
        let fenestration = &resolved[&Subsystem::Fenestration];
        let shading = &resolved[&Subsystem::Shading];

        // Archetype-specific schedule names, shared by ventilation objects.
        let archetype = mappings::archetype_key(
            building.building_function,
            &building.building_sub_type,
        )
        .replace(' ', "_")
        .replace('-', "");
        let infiltration_schedule = format!("InfilSched_{archetype}");
        let ventilation_schedule = format!("VentSched_{archetype}");

        self.install_pattern_schedule(
            deck,
            &infiltration_schedule,
            vent.schedules.get("infiltration"),
            vent,
            "infiltration",
            &mut rng,
            1.0,
        )?;
        self.install_pattern_schedule(
            deck,
            &ventilation_schedule,
            vent.schedules.get("ventilation"),
            vent,
            "ventilation",
            &mut rng,
            1.0,
        )?;

        let vent_inputs = VentilationInputs {
            system_type: vent.choice("system_type").unwrap_or("A").to_string(),
            infiltration_base: infiltration.value("infiltration_base").unwrap_or(0.0),
            year_factor: infiltration.value("year_factor").unwrap_or(1.0),
            flow_exponent: infiltration.value("flow_exponent").unwrap_or(0.67),
            f_ctrl: vent.value("f_ctrl").unwrap_or(1.0),
            fan_pressure: vent.value("fan_pressure").unwrap_or(0.0),
            fan_total_efficiency: vent.value("fan_total_efficiency").unwrap_or(0.7),
            hrv_sensible: vent.value("hrv_eff").unwrap_or(0.0),
            hrv_latent: vent.value("hrv_lat_eff").unwrap_or(0.0),
            infiltration_schedule,
            ventilation_schedule,
        };
        let usage = mappings::usage_key(building.building_function, &building.building_sub_type);
        match compose_ventilation(
            deck,
            building.building_function,
            building.floor_area,
            usage,
            &vent_inputs,
        ) {
            Ok(outcome) => report.ventilation = outcome,
            Err(err) => self.note_step_failure(&mut report, "ventilation", err)?,
        }

        let hvac_inputs = HvacInputs {
            heating_day_setpoint: hvac.value("heating_day_setpoint").unwrap_or(20.0),
            heating_night_setpoint: hvac.value("heating_night_setpoint").unwrap_or(16.0),
            cooling_day_setpoint: hvac.value("cooling_day_setpoint").unwrap_or(25.0),
            cooling_night_setpoint: hvac.value("cooling_night_setpoint").unwrap_or(27.0),
            max_heating_supply_air_temp: hvac
                .value("max_heating_supply_air_temp")
                .unwrap_or(50.0),
            min_cooling_supply_air_temp: hvac
                .value("min_cooling_supply_air_temp")
                .unwrap_or(13.0),
            setpoint_window: hvac
                .setpoint_window
                .clone()
                .unwrap_or_else(|| SetpointWindow::new("07:00", "19:00")),
            availability_patterns: hvac
                .schedules
                .get("hvac_availability")
                .cloned()
                .unwrap_or_default(),
            schedule_overrides: hvac.schedule_overrides.clone(),
            system_type: vent_inputs.system_type.clone(),
            hrv_sensible: vent_inputs.hrv_sensible,
            hrv_latent: vent_inputs.hrv_latent,
            dsoa_name: report.ventilation.dsoa_name.clone(),
        };
        if let Err(err) = compose_hvac(deck, &hvac_inputs, self.strategy, &mut rng) {
            self.note_step_failure(&mut report, "hvac", err)?;
        }

        let loads_inputs = LoadsInputs {
            lighting_watts_per_m2: loads.value("lighting_watts_per_m2").unwrap_or(10.0),
            equipment_watts_per_m2: loads.value("equipment_watts_per_m2").unwrap_or(10.0),
            occupancy_m2_per_person: loads.value("occupancy_m2_per_person").unwrap_or(30.0),
            equipment_patterns: loads.schedules.get("equipment").cloned().unwrap_or_default(),
            occupancy_patterns: loads.schedules.get("occupancy").cloned().unwrap_or_default(),
            schedule_overrides: loads.schedule_overrides.clone(),
        };
        if let Err(err) = compose_loads(deck, &loads_inputs, self.strategy, &mut rng) {
            self.note_step_failure(&mut report, "loads", err)?;
        }

        if let Err(err) = compose_dhw(
            deck,
            &DhwInputs {
                setpoint_c: dhw.value("setpoint_c").unwrap_or(60.0),
                heater_efficiency: dhw.value("heater_efficiency").unwrap_or(0.8),
                usage_liters_per_person_day: dhw
                    .value("usage_liters_per_person_day")
                    .unwrap_or(50.0),
            },
        ) {
            self.note_step_failure(&mut report, "dhw", err)?;
        }

        if let Err(err) = compose_fenestration(
            deck,
            &FenestrationInputs {
                window_u_value: fenestration.value("window_u_value").unwrap_or(2.0),
                window_shgc: fenestration.value("window_shgc").unwrap_or(0.6),
                window_to_wall_ratio: fenestration
                    .value("window_to_wall_ratio")
                    .unwrap_or(0.3),
            },
        ) {
            self.note_step_failure(&mut report, "fenestration", err)?;
        }

        if let Err(err) = compose_shading(
            deck,
            &ShadingInputs {
                setpoint_w_m2: shading.value("shading_setpoint_w_m2").unwrap_or(300.0),
                transmittance: shading.value("shading_transmittance").unwrap_or(0.3),
            },
        ) {
            self.note_step_failure(&mut report, "shading", err)?;
        }

        let violations = deck.validate();
        if !violations.is_empty() {
            report.degraded = true;
            report.issues.extend(violations);
        }
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn install_pattern_schedule(
        &self,
        deck: &mut Deck,
        name: &str,
        patterns: Option<&DayPatternSet>,
        resolved: &ResolvedSubsystem,
        slot: &str,
        rng: &mut StdRng,
        fallback: f64,
    ) -> Result<()> {
        let mut patterns = patterns.cloned().unwrap_or_default();
        crate::schedule::apply_block_overrides(&mut patterns, slot, &resolved.schedule_overrides);
        synthesize_from_patterns(
            name,
            TypeLimits::Fraction,
            &patterns,
            self.strategy,
            rng,
            Some(fallback),
        )?
        .install(deck)
    }

    /// Dependency failures degrade the deck; everything else aborts it.
    fn note_step_failure(
        &self,
        report: &mut CompositionReport,
        step: &str,
        err: anyhow::Error,
    ) -> Result<()> {
        if matches!(
            err.downcast_ref::<BesimError>(),
            Some(BesimError::DependencyUnresolved(_))
        ) {
            warn!("skipping {step} objects for building {}: {err}", report.building_id);
            report.degraded = true;
            report.issues.push(format!("{step}: {err}"));
            Ok(())
        } else {
            Err(err)
        }
    }
}
