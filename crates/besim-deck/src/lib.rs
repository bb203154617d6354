//! # besim-deck: Deck Model, Schedule Synthesis, and Composition
//!
//! The deck is the engine's textual input object graph. This crate models
//! it as a typed, ordered collection ([`Deck`] of [`DeckObject`]s) with a
//! text codec for the engine's object-dump format, and builds on it:
//!
//! - [`schedule`] — the schedule synthesizer: ranged archetype day-patterns
//!   to validated `Schedule:Compact` objects
//! - [`systems`] — the A-D ventilation system configuration table
//! - [`ventilation`] / [`hvac`] / [`loads`] — per-subsystem inserters
//! - [`compose`] — the deck composer driving assigner → synthesizer →
//!   inserters for one building
//!
//! Field writes are checked ([`object::FieldError`]), never stringly-typed
//! attribute injection; object references are verified before an object is
//! written, and a deck with an unresolved reference is degraded, not
//! silently broken.

pub mod compose;
pub mod deck;
pub mod hvac;
pub mod idf;
pub mod loads;
pub mod object;
pub mod schedule;
pub mod schema;
pub mod systems;
pub mod ventilation;

pub use compose::{CompositionReport, DeckComposer};
pub use deck::Deck;
pub use idf::{load_deck, parse_deck, save_deck, write_deck};
pub use object::{DeckObject, FieldError, FieldValue};
pub use schedule::{
    constant_schedule, setpoint_schedule, synthesize_from_patterns, DaySet, SynthesizedSchedule,
    TimeOfDay, TypeLimits, UntilBlock,
};
