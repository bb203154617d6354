//! Schedule synthesis: ranged archetype day-patterns to compact schedule
//! objects.
//!
//! Emitted objects follow the composition contract exactly: `Through:
//! 12/31`, then alternating `For: <day set>` and `Until: HH:MM,value`
//! fields; no trailing punctuation inside field strings (the writer adds
//! the single terminating `;` on the last field). Every recognized day type
//! is covered, falling back to an `AllOtherDays` rule when patterns leave
//! gaps.

use anyhow::Result;
use besim_archetype::{DayPattern, DayPatternSet, SetpointWindow};
use besim_core::{BesimError, ParameterRange, PickStrategy};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

use crate::deck::Deck;
use crate::object::{DeckObject, FieldValue};

/// Schedule value domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeLimits {
    Fraction,
    Temperature,
    ControlType,
}

impl TypeLimits {
    pub fn name(&self) -> &'static str {
        match self {
            TypeLimits::Fraction => "Fraction",
            TypeLimits::Temperature => "Temperature",
            TypeLimits::ControlType => "ControlType",
        }
    }

    pub fn bounds(&self) -> (f64, f64) {
        match self {
            TypeLimits::Fraction => (0.0, 1.0),
            TypeLimits::Temperature => (-60.0, 100.0),
            TypeLimits::ControlType => (0.0, 4.0),
        }
    }

    fn numeric_type(&self) -> &'static str {
        match self {
            TypeLimits::ControlType => "Discrete",
            _ => "Continuous",
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        let (min, max) = self.bounds();
        value.clamp(min, max)
    }

    /// Fallback value for uncovered day types.
    pub fn fallback_value(&self) -> f64 {
        match self {
            TypeLimits::Fraction => 0.0,
            TypeLimits::Temperature => 16.0,
            TypeLimits::ControlType => 0.0,
        }
    }

    /// Make sure the corresponding `ScheduleTypeLimits` object exists.
    pub fn ensure_in_deck(&self, deck: &mut Deck) -> Result<()> {
        if deck.contains("SCHEDULETYPELIMITS", self.name()) {
            return Ok(());
        }
        let (min, max) = self.bounds();
        let object = DeckObject::named("ScheduleTypeLimits", self.name())
            .with_field("Lower_Limit_Value", FieldValue::Number(min))
            .with_field("Upper_Limit_Value", FieldValue::Number(max))
            .with_field("Numeric_Type", FieldValue::text(self.numeric_type()));
        deck.add(object)?;
        Ok(())
    }
}

/// A clock time between 00:00 and 24:00 inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    minutes: u16,
}

impl TimeOfDay {
    pub const END_OF_DAY: TimeOfDay = TimeOfDay { minutes: 1440 };
    pub const MIDNIGHT: TimeOfDay = TimeOfDay { minutes: 0 };

    pub fn parse(s: &str) -> Result<TimeOfDay> {
        let trimmed = s.trim();
        let (hours, minutes) = trimmed.split_once(':').ok_or_else(|| {
            BesimError::Parse(format!("bad time '{trimmed}', expected HH:MM"))
        })?;
        let hours: u16 = hours
            .parse()
            .map_err(|_| BesimError::Parse(format!("bad hour in '{trimmed}'")))?;
        let minutes: u16 = minutes
            .parse()
            .map_err(|_| BesimError::Parse(format!("bad minute in '{trimmed}'")))?;
        let total = hours * 60 + minutes;
        if minutes >= 60 || total > 1440 {
            return Err(BesimError::Parse(format!("time '{trimmed}' out of range")).into());
        }
        Ok(TimeOfDay { minutes: total })
    }

    pub fn minutes(&self) -> u16 {
        self.minutes
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes / 60, self.minutes % 60)
    }
}

/// One (time, value) pair in a compact schedule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UntilBlock {
    pub until: TimeOfDay,
    pub value: f64,
}

impl UntilBlock {
    pub fn new(until: TimeOfDay, value: f64) -> UntilBlock {
        UntilBlock { until, value }
    }

    /// The exact field string written into the deck. Whole numbers keep one
    /// decimal so the engine reads them as reals.
    pub fn field_string(&self) -> String {
        if self.value.fract() == 0.0 && self.value.abs() < 1e15 {
            format!("Until: {},{:.1}", self.until, self.value)
        } else {
            format!("Until: {},{}", self.until, self.value)
        }
    }
}

/// Day sets a rule can apply to, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DaySet {
    Weekdays,
    Saturday,
    Sunday,
    SaturdaySunday,
    Holiday,
    SummerDesignDay,
    WinterDesignDay,
    AllOtherDays,
    AllDays,
}

impl DaySet {
    pub fn label(&self) -> &'static str {
        match self {
            DaySet::Weekdays => "WeekDays",
            DaySet::Saturday => "Saturday",
            DaySet::Sunday => "Sunday",
            DaySet::SaturdaySunday => "Saturday Sunday",
            DaySet::Holiday => "Holiday",
            DaySet::SummerDesignDay => "SummerDesignDay",
            DaySet::WinterDesignDay => "WinterDesignDay",
            DaySet::AllOtherDays => "AllOtherDays",
            DaySet::AllDays => "AllDays",
        }
    }
}

/// A synthesized compact schedule, validated before it becomes an object.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedSchedule {
    pub name: String,
    pub type_limits: TypeLimits,
    pub rules: Vec<(DaySet, Vec<UntilBlock>)>,
}

impl SynthesizedSchedule {
    /// Check the schedule invariants: at least one rule, strictly
    /// increasing times per rule, full 24 h coverage, values in bounds.
    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(
                BesimError::Validation(format!("schedule '{}' has no rules", self.name)).into(),
            );
        }
        let (min, max) = self.type_limits.bounds();
        for (day_set, blocks) in &self.rules {
            if blocks.is_empty() {
                return Err(BesimError::Validation(format!(
                    "schedule '{}' rule {} has no blocks",
                    self.name,
                    day_set.label()
                ))
                .into());
            }
            let mut previous = TimeOfDay::MIDNIGHT;
            for block in blocks {
                if block.until <= previous {
                    return Err(BesimError::Validation(format!(
                        "schedule '{}' rule {} times not strictly increasing at {}",
                        self.name,
                        day_set.label(),
                        block.until
                    ))
                    .into());
                }
                if block.value < min || block.value > max {
                    return Err(BesimError::Validation(format!(
                        "schedule '{}' value {} outside {} limits [{min}, {max}]",
                        self.name,
                        block.value,
                        self.type_limits.name()
                    ))
                    .into());
                }
                previous = block.until;
            }
            if previous < TimeOfDay::END_OF_DAY {
                return Err(BesimError::Validation(format!(
                    "schedule '{}' rule {} ends at {} instead of 24:00",
                    self.name,
                    day_set.label(),
                    previous
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Render to a `Schedule:Compact` object.
    pub fn to_object(&self) -> DeckObject {
        let mut object = DeckObject::named("Schedule:Compact", self.name.clone());
        object.push_field(
            "Schedule_Type_Limits_Name",
            FieldValue::text(self.type_limits.name()),
        );
        let mut data_index = 0usize;
        let mut push_data = |object: &mut DeckObject, value: String| {
            data_index += 1;
            object.push_field(format!("Field_{data_index}"), FieldValue::Text(value));
        };
        push_data(&mut object, "Through: 12/31".to_string());
        for (day_set, blocks) in &self.rules {
            push_data(&mut object, format!("For: {}", day_set.label()));
            for block in blocks {
                push_data(&mut object, block.field_string());
            }
        }
        object
    }

    /// Validate, ensure the type-limits object, and upsert into the deck.
    pub fn install(&self, deck: &mut Deck) -> Result<()> {
        self.validate()?;
        self.type_limits.ensure_in_deck(deck)?;
        deck.upsert(self.to_object())?;
        Ok(())
    }
}

/// Collapse one ranged block with the pick strategy, clamped to limits.
fn pick_block_value(
    range: ParameterRange,
    strategy: PickStrategy,
    limits: TypeLimits,
    rng: &mut StdRng,
) -> f64 {
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
    limits.clamp(range.clamp(picked))
}

fn resolve_pattern(
    pattern: &DayPattern,
    strategy: PickStrategy,
    limits: TypeLimits,
    rng: &mut StdRng,
) -> Result<Vec<UntilBlock>> {
    let mut blocks = Vec::with_capacity(pattern.len());
    for ranged in pattern {
        let until = TimeOfDay::parse(&ranged.until)?;
        let value = pick_block_value(ranged.range(), strategy, limits, rng);
        blocks.push(UntilBlock::new(until, value));
    }
    Ok(extend_to_midnight(blocks))
}

/// Append an extrapolated block when the pattern stops short of 24:00.
fn extend_to_midnight(mut blocks: Vec<UntilBlock>) -> Vec<UntilBlock> {
    if let Some(last) = blocks.last().copied() {
        if last.until < TimeOfDay::END_OF_DAY {
            blocks.push(UntilBlock::new(TimeOfDay::END_OF_DAY, last.value));
        }
    }
    blocks
}

/// Explicit (time, value) pairs (override payloads) to blocks.
pub fn blocks_from_pairs(pairs: &[(String, f64)], limits: TypeLimits) -> Result<Vec<UntilBlock>> {
    let mut blocks = Vec::with_capacity(pairs.len());
    for (time, value) in pairs {
        blocks.push(UntilBlock::new(
            TimeOfDay::parse(time)?,
            limits.clamp(*value),
        ));
    }
    Ok(extend_to_midnight(blocks))
}

/// Synthesize a schedule from ranged day patterns.
///
/// The `weekend` pattern, when present, supersedes separate Saturday and
/// Sunday patterns. Day types with no pattern are covered by a final
/// `AllOtherDays` rule at `fallback`; a fully empty set degenerates to a
/// single `AllDays` rule at `fallback`.
pub fn synthesize_from_patterns(
    name: impl Into<String>,
    type_limits: TypeLimits,
    patterns: &DayPatternSet,
    strategy: PickStrategy,
    rng: &mut StdRng,
    fallback: Option<f64>,
) -> Result<SynthesizedSchedule> {
    let name = name.into();
    let fallback = fallback.unwrap_or_else(|| type_limits.fallback_value());
    let mut rules: Vec<(DaySet, Vec<UntilBlock>)> = Vec::new();

    let mut push_rule = |rules: &mut Vec<(DaySet, Vec<UntilBlock>)>,
                         day_set: DaySet,
                         pattern: Option<&DayPattern>,
                         rng: &mut StdRng|
     -> Result<bool> {
        match pattern {
            Some(pattern) if !pattern.is_empty() => {
                rules.push((
                    day_set,
                    resolve_pattern(pattern, strategy, type_limits, rng)?,
                ));
                Ok(true)
            }
            _ => Ok(false),
        }
    };

    push_rule(&mut rules, DaySet::Weekdays, patterns.weekday.as_ref(), rng)?;
    if patterns.weekend.is_some() {
        push_rule(
            &mut rules,
            DaySet::SaturdaySunday,
            patterns.weekend.as_ref(),
            rng,
        )?;
        if patterns.saturday.is_some() || patterns.sunday.is_some() {
            warn!(
                "schedule '{name}': weekend pattern supersedes saturday/sunday patterns"
            );
        }
    } else {
        push_rule(&mut rules, DaySet::Saturday, patterns.saturday.as_ref(), rng)?;
        push_rule(&mut rules, DaySet::Sunday, patterns.sunday.as_ref(), rng)?;
    }
    // Holiday falls back to the weekend pattern before the generic fallback.
    let holiday_pattern = patterns
        .holiday
        .as_ref()
        .or(patterns.weekend.as_ref());
    push_rule(&mut rules, DaySet::Holiday, holiday_pattern, rng)?;
    push_rule(
        &mut rules,
        DaySet::SummerDesignDay,
        patterns.summer_design_day.as_ref(),
        rng,
    )?;
    push_rule(
        &mut rules,
        DaySet::WinterDesignDay,
        patterns.winter_design_day.as_ref(),
        rng,
    )?;

    if let Some(all_other) = patterns.all_other_days.as_ref() {
        push_rule(&mut rules, DaySet::AllOtherDays, Some(all_other), rng)?;
    } else if rules.is_empty() {
        rules.push((
            DaySet::AllDays,
            vec![UntilBlock::new(TimeOfDay::END_OF_DAY, fallback)],
        ));
    } else {
        // Full-coverage rule: any day type without its own pattern (and the
        // engine's other custom day types) lands here.
        rules.push((
            DaySet::AllOtherDays,
            vec![UntilBlock::new(TimeOfDay::END_OF_DAY, fallback)],
        ));
    }

    let schedule = SynthesizedSchedule {
        name,
        type_limits,
        rules,
    };
    schedule.validate()?;
    Ok(schedule)
}

/// Setpoint schedule synthesis: a three-block night/day/night pattern from a
/// day window, applied to every calendar day type, with design days held at
/// the day value.
pub fn setpoint_schedule(
    name: impl Into<String>,
    window: &SetpointWindow,
    day_value: f64,
    night_value: f64,
) -> Result<SynthesizedSchedule> {
    let name = name.into();
    let limits = TypeLimits::Temperature;
    let day_value = limits.clamp(day_value);
    let night_value = limits.clamp(night_value);
    let start = TimeOfDay::parse(&window.day_start)?;
    let end = TimeOfDay::parse(&window.day_end)?;

    let pattern: Vec<UntilBlock> = if start >= end {
        warn!(
            "setpoint schedule '{name}': day_start {start} >= day_end {end}; night value all day"
        );
        vec![UntilBlock::new(TimeOfDay::END_OF_DAY, night_value)]
    } else if start == TimeOfDay::MIDNIGHT && end == TimeOfDay::END_OF_DAY {
        vec![UntilBlock::new(TimeOfDay::END_OF_DAY, day_value)]
    } else if start == TimeOfDay::MIDNIGHT {
        vec![
            UntilBlock::new(end, day_value),
            UntilBlock::new(TimeOfDay::END_OF_DAY, night_value),
        ]
    } else if end == TimeOfDay::END_OF_DAY {
        vec![
            UntilBlock::new(start, night_value),
            UntilBlock::new(TimeOfDay::END_OF_DAY, day_value),
        ]
    } else {
        vec![
            UntilBlock::new(start, night_value),
            UntilBlock::new(end, day_value),
            UntilBlock::new(TimeOfDay::END_OF_DAY, night_value),
        ]
    };

    let design_day = vec![UntilBlock::new(TimeOfDay::END_OF_DAY, day_value)];
    let schedule = SynthesizedSchedule {
        name,
        type_limits: limits,
        rules: vec![
            (DaySet::Weekdays, pattern.clone()),
            (DaySet::SaturdaySunday, pattern.clone()),
            (DaySet::Holiday, pattern),
            (DaySet::SummerDesignDay, design_day.clone()),
            (DaySet::WinterDesignDay, design_day),
            (
                DaySet::AllOtherDays,
                vec![UntilBlock::new(TimeOfDay::END_OF_DAY, night_value)],
            ),
        ],
    };
    schedule.validate()?;
    Ok(schedule)
}

/// Constant-value schedule over all days.
pub fn constant_schedule(
    name: impl Into<String>,
    type_limits: TypeLimits,
    value: f64,
) -> SynthesizedSchedule {
    SynthesizedSchedule {
        name: name.into(),
        type_limits,
        rules: vec![(
            DaySet::AllDays,
            vec![UntilBlock::new(TimeOfDay::END_OF_DAY, type_limits.clamp(value))],
        )],
    }
}

/// Apply `<slot>_<daytype>` schedule-block overrides onto a pattern set.
pub fn apply_block_overrides(
    patterns: &mut DayPatternSet,
    slot: &str,
    overrides: &BTreeMap<String, Vec<(String, f64)>>,
) {
    let mut apply = |suffix: &str, target: &mut Option<DayPattern>| {
        let key = format!("{slot}_{suffix}");
        if let Some(blocks) = overrides.get(&key) {
            *target = Some(
                blocks
                    .iter()
                    .map(|(time, value)| {
                        besim_archetype::RangedBlock::fixed(time.clone(), *value)
                    })
                    .collect(),
            );
        }
    };
    apply("weekday", &mut patterns.weekday);
    apply("saturday", &mut patterns.saturday);
    apply("sunday", &mut patterns.sunday);
    apply("weekend", &mut patterns.weekend);
    apply("holiday", &mut patterns.holiday);
    apply("summer_design_day", &mut patterns.summer_design_day);
    apply("winter_design_day", &mut patterns.winter_design_day);
    apply("all_other_days", &mut patterns.all_other_days);
}

#[cfg(test)]
mod tests {
    use super::*;
    use besim_archetype::RangedBlock;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn time_parsing_and_display() {
        assert_eq!(TimeOfDay::parse("07:00").unwrap().to_string(), "07:00");
        assert_eq!(TimeOfDay::parse("24:00").unwrap(), TimeOfDay::END_OF_DAY);
        assert!(TimeOfDay::parse("25:00").is_err());
        assert!(TimeOfDay::parse("0700").is_err());
    }

    #[test]
    fn setpoint_schedule_matches_contract() {
        let window = SetpointWindow::new("07:00", "19:00");
        let sched = setpoint_schedule("HeatSP", &window, 20.0, 16.0).unwrap();
        let (_, blocks) = &sched.rules[0];
        let strings: Vec<String> = blocks.iter().map(UntilBlock::field_string).collect();
        assert_eq!(
            strings,
            vec!["Until: 07:00,16.0", "Until: 19:00,20.0", "Until: 24:00,16.0"]
        );
        // last data field terminated by the writer's single ';'
        let object = sched.to_object();
        let rendered = crate::idf::write_deck(&{
            let mut deck = Deck::new();
            deck.add(object).unwrap();
            deck
        });
        assert_eq!(rendered.matches(';').count(), 1);
    }

    #[test]
    fn degenerate_window_collapses_to_night() {
        let window = SetpointWindow::new("19:00", "07:00");
        let sched = setpoint_schedule("HeatSP", &window, 20.0, 16.0).unwrap();
        let (_, blocks) = &sched.rules[0];
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].value, 16.0);
    }

    #[test]
    fn patterns_are_extended_to_midnight() {
        let patterns = DayPatternSet::all_days(vec![
            RangedBlock::fixed("06:00", 0.0),
            RangedBlock::fixed("22:00", 1.0),
        ]);
        let sched = synthesize_from_patterns(
            "Avail",
            TypeLimits::Fraction,
            &patterns,
            PickStrategy::Midpoint,
            &mut rng(),
            None,
        )
        .unwrap();
        let (_, blocks) = &sched.rules[0];
        assert_eq!(blocks.last().unwrap().until, TimeOfDay::END_OF_DAY);
        assert_eq!(blocks.last().unwrap().value, 1.0);
    }

    #[test]
    fn uncovered_day_types_get_all_other_days_fallback() {
        let patterns = DayPatternSet {
            weekday: Some(vec![RangedBlock::fixed("24:00", 1.0)]),
            ..Default::default()
        };
        let sched = synthesize_from_patterns(
            "Avail",
            TypeLimits::Fraction,
            &patterns,
            PickStrategy::Midpoint,
            &mut rng(),
            None,
        )
        .unwrap();
        let last = sched.rules.last().unwrap();
        assert_eq!(last.0, DaySet::AllOtherDays);
        assert_eq!(last.1[0].value, 0.0);
    }

    #[test]
    fn weekend_supersedes_saturday_sunday() {
        let patterns = DayPatternSet {
            weekday: Some(vec![RangedBlock::fixed("24:00", 1.0)]),
            saturday: Some(vec![RangedBlock::fixed("24:00", 0.4)]),
            sunday: Some(vec![RangedBlock::fixed("24:00", 0.2)]),
            weekend: Some(vec![RangedBlock::fixed("24:00", 0.5)]),
            ..Default::default()
        };
        let sched = synthesize_from_patterns(
            "Avail",
            TypeLimits::Fraction,
            &patterns,
            PickStrategy::Midpoint,
            &mut rng(),
            None,
        )
        .unwrap();
        assert!(sched
            .rules
            .iter()
            .any(|(day, blocks)| *day == DaySet::SaturdaySunday && blocks[0].value == 0.5));
        assert!(!sched.rules.iter().any(|(day, _)| *day == DaySet::Saturday));
    }

    #[test]
    fn ranged_blocks_collapse_with_strategy_and_clamp() {
        let patterns = DayPatternSet::all_days(vec![RangedBlock::new("24:00", 0.8, 1.6)]);
        let sched = synthesize_from_patterns(
            "Avail",
            TypeLimits::Fraction,
            &patterns,
            PickStrategy::Midpoint,
            &mut rng(),
            None,
        )
        .unwrap();
        // midpoint 1.2 clamps to the fraction upper bound
        assert_eq!(sched.rules[0].1[0].value, 1.0);
    }

    #[test]
    fn non_increasing_times_are_invalid() {
        let schedule = SynthesizedSchedule {
            name: "Bad".into(),
            type_limits: TypeLimits::Fraction,
            rules: vec![(
                DaySet::AllDays,
                vec![
                    UntilBlock::new(TimeOfDay::parse("12:00").unwrap(), 1.0),
                    UntilBlock::new(TimeOfDay::parse("08:00").unwrap(), 0.0),
                    UntilBlock::new(TimeOfDay::END_OF_DAY, 0.0),
                ],
            )],
        };
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn install_creates_type_limits_first() {
        let mut deck = Deck::new();
        constant_schedule("AlwaysOn", TypeLimits::Fraction, 1.0)
            .install(&mut deck)
            .unwrap();
        assert!(deck.contains("SCHEDULETYPELIMITS", "Fraction"));
        assert!(deck.contains("SCHEDULE:COMPACT", "AlwaysOn"));
        assert!(deck.validate().is_empty());
    }

    #[test]
    fn block_overrides_replace_day_patterns() {
        let mut patterns = DayPatternSet::all_days(vec![RangedBlock::fixed("24:00", 1.0)]);
        let mut overrides = BTreeMap::new();
        overrides.insert(
            "hvac_availability_weekday".to_string(),
            vec![("06:00".to_string(), 1.0), ("24:00".to_string(), 0.0)],
        );
        apply_block_overrides(&mut patterns, "hvac_availability", &overrides);
        let weekday = patterns.weekday.unwrap();
        assert_eq!(weekday.len(), 2);
        assert_eq!(weekday[0].until, "06:00");
    }
}
