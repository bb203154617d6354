//! Unified error types for the besim ecosystem
//!
//! This module provides a common error type [`BesimError`] that can represent
//! errors from any part of the pipeline. Domain-specific error types can be
//! converted to `BesimError` for uniform handling at API boundaries.
//!
//! Per-(building, variant) failures are contained by callers: components
//! record them and continue. Only errors that would silently corrupt an
//! aggregate (aggregation direction, conflicting modifications, broken deck
//! references) abort the variant that produced them.

use thiserror::Error;

/// Unified error type for all besim operations.
#[derive(Error, Debug)]
pub enum BesimError {
    /// I/O errors (file access, result-store reads, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Archetype lookup key absent at every fallback level
    #[error("Lookup missing: {0}")]
    LookupMissing(String),

    /// An override record matched no recognized parameter
    #[error("Override matched no parameter: {0}")]
    OverrideNoMatch(String),

    /// NaN or inverted range after overrides
    #[error("Invalid range: {0}")]
    RangeInvalid(String),

    /// A deck object references a name that does not resolve
    #[error("Unresolved deck reference: {0}")]
    DependencyUnresolved(String),

    /// Base deck failed to parse
    #[error("Malformed deck: {0}")]
    DeckMalformed(String),

    /// Engine crash or timeout for one run
    #[error("Simulation failure: {0}")]
    SimFailure(String),

    /// Result store present but expected tables missing
    #[error("Partial extraction: {0}")]
    ExtractionPartial(String),

    /// Aggregation to an equal or finer frequency
    #[error("Aggregation refused: {0}")]
    AggregationRefused(String),

    /// Mutually exclusive variant modifications
    #[error("Conflicting modifications: {0}")]
    ConflictingMods(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Convenience result alias using [`BesimError`].
pub type BesimResult<T> = Result<T, BesimError>;

impl BesimError {
    /// Whether the error must abort the current (building, variant) rather
    /// than being recorded and skipped.
    pub fn is_fatal_for_variant(&self) -> bool {
        matches!(
            self,
            BesimError::DeckMalformed(_)
                | BesimError::AggregationRefused(_)
                | BesimError::ConflictingMods(_)
        )
    }
}
