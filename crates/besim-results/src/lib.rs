//! # besim-results: Result Extraction
//!
//! Reads the engine's relational result store and pivots it into the
//! columnar warehouse: zone mapping, nominal loads normalized per m²,
//! sizing results, long and semi-wide time-series facts per reporting
//! frequency, tabular annual summaries (raw and pivoted), per-variable
//! comparison tables across variants, and a validation report with zone
//! coverage and a quality score.
//!
//! Extraction is shardable per result store; each store belongs to one
//! (building, variant). Outputs are staged and atomically renamed so a
//! cancelled extraction leaves no partial files.

pub mod comparison;
pub mod extract;
pub mod store;

pub use comparison::{safe_variable_name, write_comparisons};
pub use extract::{
    categorize_variable, extract_all, long_dataframe, period_column, pivot_tabular,
    semi_wide_dataframe, CoverageLine, ExtractionReport,
};
pub use store::{
    reporting_frequency_label, NominalLoadRow, QualityReport, ResultStore, SizingRow,
    TabularCell, TimeSeriesRow, ZoneRow,
};
