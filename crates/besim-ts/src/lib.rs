//! # besim-ts: Time-Series Aggregation
//!
//! Variable-aware upsampling of the warehouse's columnar time-series files
//! (hourly → daily → monthly → yearly), driven by a rule table mapping
//! variable-name patterns to aggregation operators.
//!
//! Two paths share the rules:
//!
//! - the **semi-wide** hot path ([`aggregate_semi_wide`]) groups ISO date
//!   columns by string prefix and reduces per row
//! - the **long** path ([`aggregate_comparison`]) floors millisecond
//!   timestamps to the target period and reduces every `*_value` column
//!
//! Aggregation only runs strictly finer-to-coarser; anything else is an
//! `AggregationRefused` hard error. File-level runs are idempotent and
//! resumable: outputs are staged and renamed, names encode
//! `<target>_from_<source>` provenance, and `skip_existing` short-circuits.

pub mod files;
pub mod freq;
pub mod longpath;
pub mod rules;
pub mod semiwide;

pub use files::{
    parse_comparison_name, process_base_file, process_comparison_file, read_frame,
    run_aggregation, write_frame_atomic, AggregationSummary, ComparisonName,
};
pub use freq::{column_frequency, date_columns, detect_frequency, period_key};
pub use longpath::{aggregate_comparison, floor_timestamp_ms};
pub use rules::{AggregationMethod, AggregationRules, SelectionMode, VariableSelection};
pub use semiwide::{aggregate_semi_wide, check_direction};
