//! Ranged day-patterns as stored in the archetype lookup.
//!
//! A pattern is an ordered list of blocks, each covering up to a clock time
//! with either a fixed value or a (min, max) range to be collapsed with the
//! assigner's pick strategy. Ordered sequences only: a pattern keyed by hour
//! would silently reorder and break the engine.

use besim_core::ParameterRange;
use serde::{Deserialize, Serialize};

/// One block of a ranged day pattern: applies until `until` ("HH:MM").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangedBlock {
    pub until: String,
    pub min: f64,
    pub max: f64,
}

impl RangedBlock {
    pub fn new(until: impl Into<String>, min: f64, max: f64) -> Self {
        RangedBlock {
            until: until.into(),
            min,
            max,
        }
    }

    pub fn fixed(until: impl Into<String>, value: f64) -> Self {
        RangedBlock::new(until, value, value)
    }

    pub fn range(&self) -> ParameterRange {
        ParameterRange::new(self.min, self.max)
    }
}

/// An ordered day pattern.
pub type DayPattern = Vec<RangedBlock>;

/// Ranged patterns per day-type for one schedule slot.
///
/// `weekend`, when present, overrides separate `saturday`/`sunday` patterns
/// (superset rule).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayPatternSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<DayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturday: Option<DayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunday: Option<DayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekend: Option<DayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holiday: Option<DayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summer_design_day: Option<DayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winter_design_day: Option<DayPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_other_days: Option<DayPattern>,
}

impl DayPatternSet {
    pub fn is_empty(&self) -> bool {
        self.weekday.is_none()
            && self.saturday.is_none()
            && self.sunday.is_none()
            && self.weekend.is_none()
            && self.holiday.is_none()
            && self.summer_design_day.is_none()
            && self.winter_design_day.is_none()
            && self.all_other_days.is_none()
    }

    /// Uniform pattern for every day type.
    pub fn all_days(pattern: DayPattern) -> Self {
        DayPatternSet {
            weekday: Some(pattern),
            ..Default::default()
        }
    }
}

/// Day window for setpoint schedules: `day_value` applies inside
/// [`day_start`, `day_end`), `night_value` outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetpointWindow {
    pub day_start: String,
    pub day_end: String,
}

impl SetpointWindow {
    pub fn new(day_start: impl Into<String>, day_end: impl Into<String>) -> Self {
        SetpointWindow {
            day_start: day_start.into(),
            day_end: day_end.into(),
        }
    }
}
