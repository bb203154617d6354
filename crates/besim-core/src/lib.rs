//! # besim-core: Building-Energy Simulation Core Model
//!
//! Fundamental data structures shared by the deck-synthesis and
//! variant/results pipeline.
//!
//! ## Design Philosophy
//!
//! The pipeline is relational at heart: buildings, scenarios, parameter
//! ranges, and overrides are plain data that flow between components, so this
//! crate is almost entirely serde-derived structs and enums with a handful of
//! invariant-preserving constructors. Behavior lives in the downstream crates
//! (`besim-archetype` resolves, `besim-deck` composes, `besim-ts`
//! aggregates); `besim-core` only guarantees that what they exchange is
//! well-formed:
//!
//! - [`ParameterRange`] keeps `min <= max` and scrubs NaN on construction
//! - [`AgeRange`] is a closed set of seven bands with the exact label
//!   strings the catalog files use
//! - [`CalibrationStage`] round-trips `pre_calibration` / `post_calibration`
//!   / `iteration-K` labels
//! - [`OverrideRecord`] is a sum type over the three override payloads, with
//!   `fixed_value` taking precedence when a record carries several
//!
//! Overrides are message-passing, not monkey-patching: a record is a scope
//! predicate plus a payload, and matching is evaluated per query by
//! [`ScopeKey`].

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod error;
pub mod layout;
pub mod units;

pub use error::{BesimError, BesimResult};
pub use layout::JobLayout;

// ---------------------------------------------------------------------------
// Buildings
// ---------------------------------------------------------------------------

/// Top-level building function. Everything that is not residential is
/// treated as non-residential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingFunction {
    Residential,
    NonResidential,
}

impl BuildingFunction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildingFunction::Residential => "residential",
            BuildingFunction::NonResidential => "non_residential",
        }
    }

    pub fn is_residential(&self) -> bool {
        matches!(self, BuildingFunction::Residential)
    }
}

impl FromStr for BuildingFunction {
    type Err = BesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "residential" => Ok(BuildingFunction::Residential),
            "non_residential" | "nonresidential" | "non-residential" => {
                Ok(BuildingFunction::NonResidential)
            }
            other => Err(BesimError::Parse(format!(
                "unknown building function '{other}'"
            ))),
        }
    }
}

impl fmt::Display for BuildingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Construction-age band. The seven labels are fixed by the building catalog
/// format and used verbatim as lookup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "< 1945")]
    Pre1945,
    #[serde(rename = "1945 - 1964")]
    From1945To1964,
    #[serde(rename = "1965 - 1974")]
    From1965To1974,
    #[serde(rename = "1975 - 1991")]
    From1975To1991,
    #[serde(rename = "1992 - 2005")]
    From1992To2005,
    #[serde(rename = "2006 - 2014")]
    From2006To2014,
    #[serde(rename = "2015 and later")]
    From2015,
}

impl AgeRange {
    pub const ALL: [AgeRange; 7] = [
        AgeRange::Pre1945,
        AgeRange::From1945To1964,
        AgeRange::From1965To1974,
        AgeRange::From1975To1991,
        AgeRange::From1992To2005,
        AgeRange::From2006To2014,
        AgeRange::From2015,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeRange::Pre1945 => "< 1945",
            AgeRange::From1945To1964 => "1945 - 1964",
            AgeRange::From1965To1974 => "1965 - 1974",
            AgeRange::From1975To1991 => "1975 - 1991",
            AgeRange::From1992To2005 => "1992 - 2005",
            AgeRange::From2006To2014 => "2006 - 2014",
            AgeRange::From2015 => "2015 and later",
        }
    }

    /// Normalize a catalog string to a band, falling back to the newest band
    /// for anything unrecognized. Catalogs in the wild carry typos; the
    /// newest band is the conservative default for unknown construction.
    pub fn normalize(s: &str) -> AgeRange {
        AgeRange::ALL
            .into_iter()
            .find(|band| band.as_str() == s.trim())
            .unwrap_or(AgeRange::From2015)
    }
}

impl fmt::Display for AgeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optional geometry hints attached to a catalog row. All fields are
/// advisory; composition works without them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryHints {
    #[serde(default)]
    pub orientation_deg: Option<f64>,
    #[serde(default)]
    pub num_floors: Option<u32>,
    #[serde(default)]
    pub perimeter_depth_m: Option<f64>,
}

/// One catalog building. Immutable through a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub building_id: u64,
    pub building_function: BuildingFunction,
    /// Closed sub-type string drawn from the known archetypes
    /// (e.g. "Corner House", "Office Function").
    pub building_sub_type: String,
    pub age_range: AgeRange,
    pub floor_area: f64,
    #[serde(default)]
    pub geometry: Option<GeometryHints>,
}

// ---------------------------------------------------------------------------
// Scenarios and calibration stages
// ---------------------------------------------------------------------------

/// Which slice of the archetype lookup applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationStage {
    PreCalibration,
    PostCalibration,
    /// Stage label produced by the calibration controller for iteration K.
    Iteration(u32),
}

impl CalibrationStage {
    pub fn label(&self) -> String {
        match self {
            CalibrationStage::PreCalibration => "pre_calibration".to_string(),
            CalibrationStage::PostCalibration => "post_calibration".to_string(),
            CalibrationStage::Iteration(k) => format!("iteration-{k}"),
        }
    }
}

impl fmt::Display for CalibrationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for CalibrationStage {
    type Err = BesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed {
            "pre_calibration" => Ok(CalibrationStage::PreCalibration),
            "post_calibration" => Ok(CalibrationStage::PostCalibration),
            _ => {
                if let Some(rest) = trimmed.strip_prefix("iteration-") {
                    let k = rest.parse::<u32>().map_err(|_| {
                        BesimError::Parse(format!("bad iteration stage '{trimmed}'"))
                    })?;
                    Ok(CalibrationStage::Iteration(k))
                } else {
                    Err(BesimError::Parse(format!(
                        "unknown calibration stage '{trimmed}'"
                    )))
                }
            }
        }
    }
}

impl Serialize for CalibrationStage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for CalibrationStage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Named (scenario, stage) tuple selecting an archetype-lookup slice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scenario {
    pub scenario_name: String,
    pub calibration_stage: CalibrationStage,
}

impl Scenario {
    pub fn new(name: impl Into<String>, stage: CalibrationStage) -> Self {
        Scenario {
            scenario_name: name.into(),
            calibration_stage: stage,
        }
    }
}

// ---------------------------------------------------------------------------
// Subsystems
// ---------------------------------------------------------------------------

/// The seven physical subsystems the parameter assigner recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    Hvac,
    Ventilation,
    Infiltration,
    /// Lighting, electric equipment and occupancy loads.
    Loads,
    Dhw,
    Fenestration,
    Shading,
}

impl Subsystem {
    pub const ALL: [Subsystem; 7] = [
        Subsystem::Hvac,
        Subsystem::Ventilation,
        Subsystem::Infiltration,
        Subsystem::Loads,
        Subsystem::Dhw,
        Subsystem::Fenestration,
        Subsystem::Shading,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subsystem::Hvac => "hvac",
            Subsystem::Ventilation => "ventilation",
            Subsystem::Infiltration => "infiltration",
            Subsystem::Loads => "loads",
            Subsystem::Dhw => "dhw",
            Subsystem::Fenestration => "fenestration",
            Subsystem::Shading => "shading",
        }
    }
}

impl FromStr for Subsystem {
    type Err = BesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Subsystem::ALL
            .into_iter()
            .find(|sub| sub.as_str() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| BesimError::Config(format!("unknown subsystem '{s}'")))
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Parameter ranges and resolved parameters
// ---------------------------------------------------------------------------

/// A closed real interval `[min, max]`. Carries no unit; the unit is implied
/// by the registry key the range is stored under. Degenerates to a point when
/// `min == max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub min: f64,
    pub max: f64,
}

impl ParameterRange {
    /// Build a range, repairing invalid input instead of failing: NaN on
    /// either side collapses to `(0, 0)`, inverted bounds collapse to the
    /// min. Callers that need to warn should call [`ParameterRange::check`]
    /// first.
    pub fn new(min: f64, max: f64) -> Self {
        if min.is_nan() || max.is_nan() {
            return ParameterRange { min: 0.0, max: 0.0 };
        }
        if min > max {
            return ParameterRange { min, max: min };
        }
        ParameterRange { min, max }
    }

    /// A degenerate point range.
    pub fn point(value: f64) -> Self {
        ParameterRange::new(value, value)
    }

    /// Whether the raw pair would have been repaired by [`ParameterRange::new`].
    pub fn check(min: f64, max: f64) -> Result<(), BesimError> {
        if min.is_nan() || max.is_nan() {
            return Err(BesimError::RangeInvalid(format!("NaN in ({min}, {max})")));
        }
        if min > max {
            return Err(BesimError::RangeInvalid(format!("min {min} > max {max}")));
        }
        Ok(())
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    pub fn is_point(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// How the parameter assigner collapses a range to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PickStrategy {
    Midpoint,
    Uniform,
    Min,
}

impl PickStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PickStrategy::Midpoint => "midpoint",
            PickStrategy::Uniform => "uniform",
            PickStrategy::Min => "min",
        }
    }

    /// Parse a strategy name; `None` for anything unrecognized so the caller
    /// can warn and fall back to midpoint.
    pub fn parse(s: &str) -> Option<PickStrategy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "midpoint" => Some(PickStrategy::Midpoint),
            "uniform" => Some(PickStrategy::Uniform),
            "min" | "minimum" => Some(PickStrategy::Min),
            _ => None,
        }
    }
}

impl fmt::Display for PickStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parameter after assignment: the final range (post-override) kept for
/// provenance alongside the concrete pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedParameter {
    pub param_key: String,
    pub range: ParameterRange,
    pub chosen_value: f64,
    pub pick_strategy: PickStrategy,
}

// ---------------------------------------------------------------------------
// Overrides
// ---------------------------------------------------------------------------

/// The fields a parameter-assigner query exposes to override matching.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeKey {
    pub building_id: u64,
    pub building_function: BuildingFunction,
    pub sub_type: String,
    pub age_range: AgeRange,
    pub scenario: String,
    pub calibration_stage: CalibrationStage,
}

/// Scope predicate of an override record: every field present must equal the
/// query's for the record to match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub building_function: Option<BuildingFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_range: Option<AgeRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration_stage: Option<CalibrationStage>,
}

impl OverrideScope {
    pub fn matches(&self, key: &ScopeKey) -> bool {
        if self.building_id.is_some_and(|id| id != key.building_id) {
            return false;
        }
        if self
            .building_function
            .is_some_and(|f| f != key.building_function)
        {
            return false;
        }
        if self.sub_type.as_deref().is_some_and(|s| s != key.sub_type) {
            return false;
        }
        if self.age_range.is_some_and(|a| a != key.age_range) {
            return false;
        }
        if self.scenario.as_deref().is_some_and(|s| s != key.scenario) {
            return false;
        }
        if self
            .calibration_stage
            .is_some_and(|c| c != key.calibration_stage)
        {
            return false;
        }
        true
    }
}

/// A schedule block in override payloads: ("HH:MM", value) pairs.
pub type OverrideBlock = (String, f64);

/// What a matching override does to the in-progress parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum OverridePayload {
    /// Collapse the range to a fixed point.
    NumericFixed(f64),
    /// Replace the range entirely.
    NumericRange { min: f64, max: f64 },
    /// Replace a schedule day-pattern with explicit blocks.
    ScheduleBlocks(Vec<OverrideBlock>),
    /// Replace a discrete choice (e.g. ventilation system type).
    Choice(String),
}

/// One user-supplied override. Records are applied in declaration order;
/// each matching record mutates the in-progress range or stashes a schedule
/// pattern. A record carrying both `fixed_value` and `min_val`/`max_val`
/// resolves to the fixed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOverride", into = "RawOverride")]
pub struct OverrideRecord {
    pub scope: OverrideScope,
    pub param_name: String,
    pub payload: OverridePayload,
}

/// Flat on-disk form of an override record.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawOverride {
    #[serde(flatten)]
    scope: OverrideScope,
    param_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fixed_value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fixed_choice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_val: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_val: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    override_blocks: Option<Vec<OverrideBlock>>,
}

impl TryFrom<RawOverride> for OverrideRecord {
    type Error = BesimError;

    fn try_from(raw: RawOverride) -> Result<Self, Self::Error> {
        let payload = if let Some(v) = raw.fixed_value {
            OverridePayload::NumericFixed(v)
        } else if let Some(choice) = raw.fixed_choice {
            OverridePayload::Choice(choice)
        } else if let (Some(min), Some(max)) = (raw.min_val, raw.max_val) {
            OverridePayload::NumericRange { min, max }
        } else if let Some(blocks) = raw.override_blocks {
            OverridePayload::ScheduleBlocks(blocks)
        } else {
            return Err(BesimError::Parse(format!(
                "override for '{}' carries no fixed_value, min/max or blocks",
                raw.param_name
            )));
        };
        Ok(OverrideRecord {
            scope: raw.scope,
            param_name: raw.param_name,
            payload,
        })
    }
}

impl From<OverrideRecord> for RawOverride {
    fn from(record: OverrideRecord) -> Self {
        let mut raw = RawOverride {
            scope: record.scope,
            param_name: record.param_name,
            fixed_value: None,
            fixed_choice: None,
            min_val: None,
            max_val: None,
            override_blocks: None,
        };
        match record.payload {
            OverridePayload::NumericFixed(v) => raw.fixed_value = Some(v),
            OverridePayload::Choice(c) => raw.fixed_choice = Some(c),
            OverridePayload::NumericRange { min, max } => {
                raw.min_val = Some(min);
                raw.max_val = Some(max);
            }
            OverridePayload::ScheduleBlocks(blocks) => raw.override_blocks = Some(blocks),
        }
        raw
    }
}

// ---------------------------------------------------------------------------
// Reporting frequencies
// ---------------------------------------------------------------------------

/// Engine reporting / aggregation frequency, ordered finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Timestep,
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Timestep => "timestep",
            Frequency::Hourly => "hourly",
            Frequency::Daily => "daily",
            Frequency::Monthly => "monthly",
            Frequency::Yearly => "yearly",
        }
    }

    /// Whether `self` is a strictly coarser period than `source` (the only
    /// direction aggregation is allowed to run).
    pub fn is_strictly_coarser_than(&self, source: Frequency) -> bool {
        *self > source
    }

    /// Length of the period key prefix within a date-column name:
    /// `YYYY-MM-DD_HH` (13), `YYYY-MM-DD` (10), `YYYY-MM` (7), `YYYY` (4).
    /// `None` for timestep, which only exists in long form.
    pub fn column_prefix_len(&self) -> Option<usize> {
        match self {
            Frequency::Timestep => None,
            Frequency::Hourly => Some(13),
            Frequency::Daily => Some(10),
            Frequency::Monthly => Some(7),
            Frequency::Yearly => Some(4),
        }
    }
}

impl FromStr for Frequency {
    type Err = BesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "timestep" => Ok(Frequency::Timestep),
            "hourly" => Ok(Frequency::Hourly),
            "daily" => Ok(Frequency::Daily),
            "monthly" => Ok(Frequency::Monthly),
            "yearly" | "annual" => Ok(Frequency::Yearly),
            other => Err(BesimError::Parse(format!("unknown frequency '{other}'"))),
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
