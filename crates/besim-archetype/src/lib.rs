//! # besim-archetype: Archetype Lookup Store and Parameter Assigner
//!
//! Turns a building's (scenario, stage, function, sub-type, age range) into
//! concrete subsystem parameters.
//!
//! Two pieces:
//!
//! - [`lookup::ArchetypeStore`] — the read-only nested table, shipped with
//!   built-in data ([`builtin::builtin_store`]) and replaceable by a JSON
//!   tree of the same shape. Missing keys never raise; every level falls
//!   back to the first available key and the substitutions are reported.
//! - [`assign::assign_subsystem`] — resolves ranges, applies override
//!   records in declaration order, and collapses ranges with a pick
//!   strategy (midpoint / uniform / min).
//!
//! The assigner's output pairs every pick with its final range so that
//! downstream provenance (variant exports, calibration logs) never has to
//! re-derive where a value came from.

pub mod assign;
pub mod builtin;
pub mod catalog;
pub mod lookup;
pub mod mappings;
pub mod patterns;

pub use assign::{
    assign_all, assign_subsystem, strategy_or_midpoint, AssignQuery, ResolvedSubsystem,
};
pub use catalog::{load_catalog, CatalogRow};
pub use builtin::{builtin_store, BUILTIN_STORE};
pub use lookup::{ArchetypeBlock, ArchetypeStore, BlockResolution, LookupNode};
pub use patterns::{DayPattern, DayPatternSet, RangedBlock, SetpointWindow};
