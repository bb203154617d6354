//! Per-iteration state persistence.
//!
//! Each iteration owns `iteration_<k>/` under the calibration root with its
//! state file, validation results, and best parameters. Iteration i+1 reads
//! only iteration ≤ i artifacts and never mutates earlier directories; a
//! resumed run continues from the highest-numbered iteration directory.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Per-building validation residuals from the external validator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingValidation {
    pub building_id: u64,
    pub cvrmse: f64,
    pub nmbe: f64,
}

/// Aggregate metrics for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub avg_cvrmse: f64,
    pub avg_nmbe: f64,
    pub per_building: Vec<BuildingValidation>,
}

impl ValidationMetrics {
    pub fn from_buildings(per_building: Vec<BuildingValidation>) -> ValidationMetrics {
        let count = per_building.len().max(1) as f64;
        ValidationMetrics {
            avg_cvrmse: per_building.iter().map(|b| b.cvrmse).sum::<f64>() / count,
            avg_nmbe: per_building.iter().map(|b| b.nmbe).sum::<f64>() / count,
            per_building,
        }
    }

    /// Buildings ordered worst-first by residual magnitude.
    pub fn worst_buildings(&self, limit: usize) -> Vec<u64> {
        let mut ranked = self.per_building.clone();
        ranked.sort_by(|a, b| {
            b.cvrmse
                .abs()
                .partial_cmp(&a.cvrmse.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
            .into_iter()
            .take(limit)
            .map(|b| b.building_id)
            .collect()
    }
}

/// One iteration's persisted state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationState {
    pub iteration_index: u32,
    pub selected_building_ids: Vec<u64>,
    pub validation: ValidationMetrics,
    pub best_parameters: BTreeMap<String, f64>,
    pub degraded: bool,
    pub completed_at: DateTime<Utc>,
}

pub fn iteration_dir(root: &Path, iteration: u32) -> PathBuf {
    root.join(format!("iteration_{iteration}"))
}

/// Persist an iteration's artifacts into its own directory.
pub fn save_iteration(root: &Path, state: &IterationState) -> Result<PathBuf> {
    let dir = iteration_dir(root, state.iteration_index);
    fs::create_dir_all(&dir)
        .with_context(|| format!("creating iteration directory '{}'", dir.display()))?;
    write_json(&dir.join("state.json"), state)?;
    write_json(&dir.join("validation_results.json"), &state.validation)?;
    write_json(&dir.join("best_parameters.json"), &state.best_parameters)?;
    Ok(dir)
}

pub fn load_iteration(root: &Path, iteration: u32) -> Result<IterationState> {
    let path = iteration_dir(root, iteration).join("state.json");
    let text = fs::read_to_string(&path)
        .with_context(|| format!("reading iteration state '{}'", path.display()))?;
    serde_json::from_str(&text).context("parsing iteration state")
}

/// Highest-numbered completed iteration, if any.
pub fn latest_iteration(root: &Path) -> Result<Option<u32>> {
    if !root.exists() {
        return Ok(None);
    }
    let mut latest: Option<u32> = None;
    for entry in fs::read_dir(root).with_context(|| format!("listing '{}'", root.display()))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(index) = name
            .to_str()
            .and_then(|name| name.strip_prefix("iteration_"))
            .and_then(|suffix| suffix.parse::<u32>().ok())
        else {
            continue;
        };
        if entry.path().join("state.json").exists() {
            latest = Some(latest.map_or(index, |current| current.max(index)));
        }
    }
    Ok(latest)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("serializing iteration artifact")?;
    fs::write(path, json).with_context(|| format!("writing '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn state(iteration: u32, cvrmse: f64) -> IterationState {
        IterationState {
            iteration_index: iteration,
            selected_building_ids: vec![1, 2],
            validation: ValidationMetrics::from_buildings(vec![
                BuildingValidation {
                    building_id: 1,
                    cvrmse,
                    nmbe: 5.0,
                },
                BuildingValidation {
                    building_id: 2,
                    cvrmse: cvrmse / 2.0,
                    nmbe: 3.0,
                },
            ]),
            best_parameters: BTreeMap::from([("infiltration_base".to_string(), 1.25)]),
            degraded: false,
            completed_at: Utc::now(),
        }
    }

    #[test]
    fn iterations_persist_and_resume() {
        let dir = tempdir().unwrap();
        save_iteration(dir.path(), &state(1, 25.0)).unwrap();
        save_iteration(dir.path(), &state(2, 20.0)).unwrap();
        assert_eq!(latest_iteration(dir.path()).unwrap(), Some(2));
        let loaded = load_iteration(dir.path(), 2).unwrap();
        assert_eq!(loaded.iteration_index, 2);
        assert_eq!(loaded.best_parameters["infiltration_base"], 1.25);
        // per-iteration artifact files exist
        let dir2 = iteration_dir(dir.path(), 2);
        assert!(dir2.join("validation_results.json").exists());
        assert!(dir2.join("best_parameters.json").exists());
    }

    #[test]
    fn empty_root_has_no_latest() {
        let dir = tempdir().unwrap();
        assert_eq!(latest_iteration(dir.path()).unwrap(), None);
        assert_eq!(latest_iteration(&dir.path().join("missing")).unwrap(), None);
    }

    #[test]
    fn worst_buildings_rank_by_residual_magnitude() {
        let metrics = ValidationMetrics::from_buildings(vec![
            BuildingValidation {
                building_id: 10,
                cvrmse: 12.0,
                nmbe: 1.0,
            },
            BuildingValidation {
                building_id: 20,
                cvrmse: -30.0,
                nmbe: 1.0,
            },
            BuildingValidation {
                building_id: 30,
                cvrmse: 22.0,
                nmbe: 1.0,
            },
        ]);
        assert_eq!(metrics.worst_buildings(2), vec![20, 30]);
    }

    #[test]
    fn averages_over_buildings() {
        let metrics = ValidationMetrics::from_buildings(vec![
            BuildingValidation {
                building_id: 1,
                cvrmse: 20.0,
                nmbe: 4.0,
            },
            BuildingValidation {
                building_id: 2,
                cvrmse: 10.0,
                nmbe: 2.0,
            },
        ]);
        assert_eq!(metrics.avg_cvrmse, 15.0);
        assert_eq!(metrics.avg_nmbe, 3.0);
    }
}
