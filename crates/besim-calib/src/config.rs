//! Calibration-loop configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which validation metric convergence is judged on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvergenceMetric {
    Cvrmse,
    Nmbe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvergenceCriteria {
    pub metric: ConvergenceMetric,
    /// Converged when the mean metric drops below this.
    pub threshold: f64,
    /// Relative improvement below which an iteration counts as stalled.
    pub min_improvement: f64,
    /// Consecutive stalled iterations tolerated before stopping.
    pub patience: u32,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        ConvergenceCriteria {
            metric: ConvergenceMetric::Cvrmse,
            threshold: 15.0,
            min_improvement: 0.01,
            patience: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSelection {
    /// Explicit list for the first iteration.
    pub iteration_1: Vec<u64>,
    /// Later iterations take the worst validation failures, capped here.
    #[serde(default = "default_max_buildings")]
    pub max_buildings: usize,
}

fn default_max_buildings() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationConfig {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    #[serde(default)]
    pub convergence: ConvergenceCriteria,
    pub building_selection: BuildingSelection,
    /// Below this run-success percentage an iteration is marked degraded.
    #[serde(default = "default_min_coverage_pct")]
    pub min_coverage_pct: f64,
}

fn default_max_iterations() -> u32 {
    3
}

fn default_min_coverage_pct() -> f64 {
    50.0
}

impl IterationConfig {
    pub fn load(path: &Path) -> Result<IterationConfig> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading iteration config '{}'", path.display()))?;
        serde_json::from_str(&text).context("parsing iteration config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let json = r#"{
            "building_selection": { "iteration_1": [413673000, 413674000] }
        }"#;
        let config: IterationConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.convergence.threshold, 15.0);
        assert_eq!(config.convergence.patience, 2);
        assert_eq!(config.building_selection.max_buildings, 10);
        assert_eq!(config.building_selection.iteration_1.len(), 2);
    }
}
