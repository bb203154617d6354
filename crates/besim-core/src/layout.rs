//! Canonical job directory layout.
//!
//! Every pipeline component resolves its inputs and outputs through this
//! one table of paths so the on-disk contract stays in a single place:
//!
//! ```text
//! <job_root>/
//!   output_IDFs/                  composed baseline decks
//!   modified_idfs/                variant decks + modification exports
//!   Sim_Results/<year>/           engine result stores, baseline
//!   Modified_Sim_Results/<year>/  engine result stores, variants
//!   parsed_data/                  extraction output, baseline
//!   parsed_modified_results/      extraction output, variants (+ comparisons/)
//!   sensitivity_results/  surrogate_models/
//!   validation_results/   calibration_results/
//! ```

use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    root: PathBuf,
}

impl JobLayout {
    pub fn new(root: impl Into<PathBuf>) -> JobLayout {
        JobLayout { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Composed baseline decks, one per (building, variant 0).
    pub fn output_idfs(&self) -> PathBuf {
        self.root.join("output_IDFs")
    }

    /// Per-variant decks plus the long/wide modification exports.
    pub fn modified_idfs(&self) -> PathBuf {
        self.root.join("modified_idfs")
    }

    /// Baseline engine result stores for one weather year.
    pub fn sim_results(&self, year: i32) -> PathBuf {
        self.root.join("Sim_Results").join(year.to_string())
    }

    /// Variant engine result stores for one weather year.
    pub fn modified_sim_results(&self, year: i32) -> PathBuf {
        self.root
            .join("Modified_Sim_Results")
            .join(year.to_string())
    }

    /// Baseline extraction output.
    pub fn parsed_data(&self) -> PathBuf {
        self.root.join("parsed_data")
    }

    /// Baseline semi-wide time-series directory.
    pub fn parsed_timeseries(&self) -> PathBuf {
        self.parsed_data().join("timeseries")
    }

    /// Variant extraction output.
    pub fn parsed_modified_results(&self) -> PathBuf {
        self.root.join("parsed_modified_results")
    }

    /// Per-variable comparison files.
    pub fn comparisons(&self) -> PathBuf {
        self.parsed_modified_results().join("comparisons")
    }

    pub fn sensitivity_results(&self) -> PathBuf {
        self.root.join("sensitivity_results")
    }

    pub fn surrogate_models(&self) -> PathBuf {
        self.root.join("surrogate_models")
    }

    pub fn validation_results(&self) -> PathBuf {
        self.root.join("validation_results")
    }

    pub fn calibration_results(&self) -> PathBuf {
        self.root.join("calibration_results")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_the_contract() {
        let layout = JobLayout::new("/jobs/run42");
        assert_eq!(
            layout.sim_results(2020),
            PathBuf::from("/jobs/run42/Sim_Results/2020")
        );
        assert_eq!(
            layout.comparisons(),
            PathBuf::from("/jobs/run42/parsed_modified_results/comparisons")
        );
        assert_eq!(
            layout.parsed_timeseries(),
            PathBuf::from("/jobs/run42/parsed_data/timeseries")
        );
        assert!(layout.output_idfs().ends_with("output_IDFs"));
    }
}
