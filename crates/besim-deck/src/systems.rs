//! Ventilation system configuration: how each system letter (A-D) maps to
//! engine objects and fan parameters, per building function.
//!
//! A: natural supply + natural exhaust; B: mechanical supply; C: mechanical
//! exhaust; D: balanced mechanical with heat recovery, where the
//! ventilation load is carried by the ideal-loads system and only the
//! shared outdoor-air specification is written.

use besim_core::BuildingFunction;
use tracing::warn;

/// Which engine object carries the ventilation component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VentObjectKind {
    ZoneVentilation,
    IdealLoads,
}

/// Ventilation direction for `ZoneVentilation:DesignFlowRate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VentilationDirection {
    Natural,
    Intake,
    Exhaust,
    Balanced,
}

impl VentilationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            VentilationDirection::Natural => "Natural",
            VentilationDirection::Intake => "Intake",
            VentilationDirection::Exhaust => "Exhaust",
            VentilationDirection::Balanced => "Balanced",
        }
    }
}

/// Per-(function, system) configuration.
#[derive(Debug, Clone, Copy)]
pub struct VentSystemSpec {
    pub description: &'static str,
    pub object_kind: VentObjectKind,
    pub direction: VentilationDirection,
    pub fan_pressure: (f64, f64),
    pub fan_efficiency: (f64, f64),
    pub hrv_sensible: (f64, f64),
    pub hrv_latent: (f64, f64),
}

impl VentSystemSpec {
    pub fn uses_ideal_loads(&self) -> bool {
        self.object_kind == VentObjectKind::IdealLoads
    }

    pub fn has_fan(&self) -> bool {
        self.direction != VentilationDirection::Natural
            && self.object_kind == VentObjectKind::ZoneVentilation
    }
}

const RES_SYSTEMS: [(&str, VentSystemSpec); 4] = [
    (
        "A",
        VentSystemSpec {
            description: "Natural supply + natural exhaust/infiltration",
            object_kind: VentObjectKind::ZoneVentilation,
            direction: VentilationDirection::Natural,
            fan_pressure: (0.0, 0.0),
            fan_efficiency: (1.0, 1.0),
            hrv_sensible: (0.0, 0.0),
            hrv_latent: (0.0, 0.0),
        },
    ),
    (
        "B",
        VentSystemSpec {
            description: "Mechanical supply + natural exhaust/infiltration",
            object_kind: VentObjectKind::ZoneVentilation,
            direction: VentilationDirection::Intake,
            fan_pressure: (40.0, 60.0),
            fan_efficiency: (0.65, 0.75),
            hrv_sensible: (0.0, 0.0),
            hrv_latent: (0.0, 0.0),
        },
    ),
    (
        "C",
        VentSystemSpec {
            description: "Natural supply/infiltration + mechanical exhaust",
            object_kind: VentObjectKind::ZoneVentilation,
            direction: VentilationDirection::Exhaust,
            fan_pressure: (40.0, 60.0),
            fan_efficiency: (0.65, 0.75),
            hrv_sensible: (0.0, 0.0),
            hrv_latent: (0.0, 0.0),
        },
    ),
    (
        "D",
        VentSystemSpec {
            description: "Balanced mechanical supply and exhaust with HRV",
            object_kind: VentObjectKind::IdealLoads,
            direction: VentilationDirection::Balanced,
            fan_pressure: (50.0, 80.0),
            fan_efficiency: (0.7, 0.85),
            hrv_sensible: (0.70, 0.80),
            hrv_latent: (0.0, 0.0),
        },
    ),
];

const NONRES_SYSTEMS: [(&str, VentSystemSpec); 4] = [
    (
        "A",
        VentSystemSpec {
            description: "Natural supply + natural exhaust/infiltration",
            object_kind: VentObjectKind::ZoneVentilation,
            direction: VentilationDirection::Natural,
            fan_pressure: (0.0, 0.0),
            fan_efficiency: (1.0, 1.0),
            hrv_sensible: (0.0, 0.0),
            hrv_latent: (0.0, 0.0),
        },
    ),
    (
        "B",
        VentSystemSpec {
            description: "Mechanical supply + natural exhaust",
            object_kind: VentObjectKind::ZoneVentilation,
            direction: VentilationDirection::Intake,
            fan_pressure: (90.0, 110.0),
            fan_efficiency: (0.65, 0.75),
            hrv_sensible: (0.0, 0.0),
            hrv_latent: (0.0, 0.0),
        },
    ),
    (
        "C",
        VentSystemSpec {
            description: "Natural supply + mechanical exhaust",
            object_kind: VentObjectKind::ZoneVentilation,
            direction: VentilationDirection::Exhaust,
            fan_pressure: (140.0, 160.0),
            fan_efficiency: (0.65, 0.75),
            hrv_sensible: (0.0, 0.0),
            hrv_latent: (0.0, 0.0),
        },
    ),
    (
        "D",
        VentSystemSpec {
            description: "Balanced mechanical supply and exhaust with HRV",
            object_kind: VentObjectKind::IdealLoads,
            direction: VentilationDirection::Balanced,
            fan_pressure: (100.0, 140.0),
            fan_efficiency: (0.7, 0.85),
            hrv_sensible: (0.70, 0.80),
            hrv_latent: (0.0, 0.0),
        },
    ),
];

/// Spec for a (function, system letter). Unknown letters warn and default
/// to system A.
pub fn system_spec(function: BuildingFunction, system: &str) -> &'static VentSystemSpec {
    let table = if function.is_residential() {
        &RES_SYSTEMS
    } else {
        &NONRES_SYSTEMS
    };
    table
        .iter()
        .find(|(letter, _)| letter.eq_ignore_ascii_case(system))
        .map(|(_, spec)| spec)
        .unwrap_or_else(|| {
            warn!("unknown ventilation system '{system}' for {function}; defaulting to A");
            &table[0].1
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_follow_system_letters() {
        assert_eq!(
            system_spec(BuildingFunction::Residential, "A").direction,
            VentilationDirection::Natural
        );
        assert_eq!(
            system_spec(BuildingFunction::Residential, "B").direction,
            VentilationDirection::Intake
        );
        assert_eq!(
            system_spec(BuildingFunction::NonResidential, "C").direction,
            VentilationDirection::Exhaust
        );
        assert!(system_spec(BuildingFunction::Residential, "D").uses_ideal_loads());
    }

    #[test]
    fn natural_systems_have_no_fan() {
        assert!(!system_spec(BuildingFunction::Residential, "A").has_fan());
        assert!(system_spec(BuildingFunction::NonResidential, "B").has_fan());
        // D carries its ventilation in ideal loads, not a zone fan.
        assert!(!system_spec(BuildingFunction::Residential, "D").has_fan());
    }

    #[test]
    fn unknown_letter_defaults_to_a() {
        let spec = system_spec(BuildingFunction::Residential, "Z");
        assert_eq!(spec.direction, VentilationDirection::Natural);
    }
}
