//! The calibration controller: an explicit iteration state machine.
//!
//! Per iteration: SelectBuildings → ApplyFeedback → Build/Simulate/Extract
//! (delegated to the pipeline behind [`IterationRunner`]) → Validate →
//! Decide. Decisions are a sum type, not exception flow; every iteration is
//! checkpointed to its own directory before the next begins, and a resumed
//! controller continues after the highest persisted iteration.

use anyhow::Result;
use besim_core::{CalibrationStage, OverridePayload, OverrideRecord, OverrideScope};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{ConvergenceMetric, IterationConfig};
use crate::state::{
    latest_iteration, load_iteration, save_iteration, BuildingValidation, IterationState,
    ValidationMetrics,
};

/// What the controller decided after an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Continue,
    Converged,
    Stall,
    MaxIter,
}

/// Outcome of one iteration's build → simulate → extract phase.
#[derive(Debug, Clone, Copy)]
pub struct IterationRunOutcome {
    pub runs_total: usize,
    pub runs_succeeded: usize,
}

impl IterationRunOutcome {
    pub fn coverage_pct(&self) -> f64 {
        if self.runs_total == 0 {
            0.0
        } else {
            self.runs_succeeded as f64 / self.runs_total as f64 * 100.0
        }
    }
}

/// The deck-synthesis / simulation / extraction pipeline for one iteration.
/// The override list is the iteration's snapshot; implementations must not
/// retain it across iterations.
pub trait IterationRunner {
    fn run(
        &mut self,
        iteration: u32,
        buildings: &[u64],
        overrides: &[OverrideRecord],
    ) -> Result<IterationRunOutcome>;
}

/// External validator producing per-building residuals for one iteration.
pub trait Validator {
    fn validate(&mut self, iteration: u32, buildings: &[u64]) -> Result<Vec<BuildingValidation>>;
}

/// External calibration routine, a black box producing the next best
/// parameter set from an iteration's validation.
pub trait Calibrator {
    fn best_parameters(
        &mut self,
        iteration: u32,
        validation: &ValidationMetrics,
    ) -> Result<BTreeMap<String, f64>>;
}

/// Final loop summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub total_iterations: u32,
    pub decision: Decision,
    pub history: Vec<f64>,
    pub final_metrics: Option<ValidationMetrics>,
}

pub struct CalibrationController {
    pub config: IterationConfig,
    pub root: PathBuf,
}

impl CalibrationController {
    pub fn new(config: IterationConfig, root: impl Into<PathBuf>) -> CalibrationController {
        CalibrationController {
            config,
            root: root.into(),
        }
    }

    /// Drive iterations until a terminal decision, resuming after the
    /// highest persisted iteration if any.
    pub fn run(
        &self,
        runner: &mut dyn IterationRunner,
        validator: &mut dyn Validator,
        calibrator: &mut dyn Calibrator,
    ) -> Result<CalibrationSummary> {
        let mut history: Vec<f64> = Vec::new();
        let mut stalled = 0u32;
        let mut previous: Option<IterationState> = None;

        if let Some(done) = latest_iteration(&self.root)? {
            info!("resuming calibration after iteration {done}");
            for index in 1..=done {
                let state = load_iteration(&self.root, index)?;
                history.push(self.metric_of(&state.validation));
                previous = Some(state);
            }
        }

        let mut iteration = previous
            .as_ref()
            .map(|state| state.iteration_index)
            .unwrap_or(0);
        let decision = loop {
            if iteration >= self.config.max_iterations {
                break Decision::MaxIter;
            }
            iteration += 1;
            info!("calibration iteration {iteration} starting");

            // SelectBuildings
            let buildings = self.select_buildings(iteration, previous.as_ref());
            if buildings.is_empty() {
                warn!("iteration {iteration}: no buildings selected; stopping");
                break Decision::Stall;
            }

            // ApplyFeedback: previous best parameters become overrides
            // bound to this iteration's stage label.
            let overrides = previous
                .as_ref()
                .map(|state| feedback_overrides(&state.best_parameters, iteration))
                .unwrap_or_default();

            // Build → Simulate → Extract
            let outcome = runner.run(iteration, &buildings, &overrides)?;
            let degraded = outcome.coverage_pct() < self.config.min_coverage_pct;
            if degraded {
                warn!(
                    "iteration {iteration} degraded: {:.1}% run coverage",
                    outcome.coverage_pct()
                );
            }

            // Validate
            let validation =
                ValidationMetrics::from_buildings(validator.validate(iteration, &buildings)?);
            let metric = self.metric_of(&validation);

            // Parameter feedback for the next iteration.
            let best_parameters = calibrator.best_parameters(iteration, &validation)?;

            let state = IterationState {
                iteration_index: iteration,
                selected_building_ids: buildings,
                validation,
                best_parameters,
                degraded,
                completed_at: Utc::now(),
            };
            save_iteration(&self.root, &state)?;

            // Decide
            if metric <= self.config.convergence.threshold {
                info!(
                    "converged: {metric:.2} <= {:.2}",
                    self.config.convergence.threshold
                );
                history.push(metric);
                previous = Some(state);
                break Decision::Converged;
            }
            if let Some(last) = history.last() {
                let improvement = (last - metric) / last.abs().max(f64::EPSILON);
                if improvement < self.config.convergence.min_improvement {
                    stalled += 1;
                } else {
                    stalled = 0;
                }
                if stalled >= self.config.convergence.patience {
                    info!("stalled after {stalled} low-improvement iterations");
                    history.push(metric);
                    previous = Some(state);
                    break Decision::Stall;
                }
            }
            history.push(metric);
            previous = Some(state);
        };

        let summary = CalibrationSummary {
            total_iterations: previous
                .as_ref()
                .map(|state| state.iteration_index)
                .unwrap_or(0),
            decision,
            history,
            final_metrics: previous.map(|state| state.validation),
        };
        let summary_json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(self.root.join("iteration_summary.json"), summary_json)?;
        Ok(summary)
    }

    fn metric_of(&self, validation: &ValidationMetrics) -> f64 {
        match self.config.convergence.metric {
            ConvergenceMetric::Cvrmse => validation.avg_cvrmse,
            ConvergenceMetric::Nmbe => validation.avg_nmbe.abs(),
        }
    }

    fn select_buildings(&self, iteration: u32, previous: Option<&IterationState>) -> Vec<u64> {
        if iteration == 1 {
            return self.config.building_selection.iteration_1.clone();
        }
        match previous {
            Some(state) => state
                .validation
                .worst_buildings(self.config.building_selection.max_buildings),
            None => self.config.building_selection.iteration_1.clone(),
        }
    }
}

/// Translate a calibrator's `{parameter: value}` map into override records
/// bound to the iteration's calibration stage.
pub fn feedback_overrides(
    best_parameters: &BTreeMap<String, f64>,
    iteration: u32,
) -> Vec<OverrideRecord> {
    best_parameters
        .iter()
        .map(|(parameter, value)| OverrideRecord {
            scope: OverrideScope {
                calibration_stage: Some(CalibrationStage::Iteration(iteration)),
                ..Default::default()
            },
            param_name: parameter.clone(),
            payload: OverridePayload::NumericFixed(*value),
        })
        .collect()
}

/// Convenience for callers that only need the iteration directory layout.
pub fn calibration_root(job_root: &Path) -> PathBuf {
    job_root.join("calibration_results")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BuildingSelection, ConvergenceCriteria};
    use tempfile::tempdir;

    fn config() -> IterationConfig {
        IterationConfig {
            max_iterations: 3,
            convergence: ConvergenceCriteria {
                metric: ConvergenceMetric::Cvrmse,
                threshold: 15.0,
                min_improvement: 0.01,
                patience: 2,
            },
            building_selection: BuildingSelection {
                iteration_1: vec![413673000, 413674000, 413675000],
                max_buildings: 10,
            },
            min_coverage_pct: 50.0,
        }
    }

    /// Runner that records the override snapshots it received.
    struct RecordingRunner {
        override_counts: Vec<usize>,
        coverage: f64,
    }

    impl IterationRunner for RecordingRunner {
        fn run(
            &mut self,
            _iteration: u32,
            buildings: &[u64],
            overrides: &[OverrideRecord],
        ) -> Result<IterationRunOutcome> {
            self.override_counts.push(overrides.len());
            let total = buildings.len();
            let succeeded = ((total as f64) * self.coverage / 100.0).round() as usize;
            Ok(IterationRunOutcome {
                runs_total: total,
                runs_succeeded: succeeded,
            })
        }
    }

    /// Validator whose CVRMSE improves by a fixed step per iteration.
    struct ImprovingValidator {
        start: f64,
        step: f64,
    }

    impl Validator for ImprovingValidator {
        fn validate(
            &mut self,
            iteration: u32,
            buildings: &[u64],
        ) -> Result<Vec<BuildingValidation>> {
            let cvrmse = self.start - self.step * iteration as f64;
            Ok(buildings
                .iter()
                .map(|id| BuildingValidation {
                    building_id: *id,
                    cvrmse,
                    nmbe: 5.0,
                })
                .collect())
        }
    }

    struct FixedCalibrator;

    impl Calibrator for FixedCalibrator {
        fn best_parameters(
            &mut self,
            _iteration: u32,
            _validation: &ValidationMetrics,
        ) -> Result<BTreeMap<String, f64>> {
            Ok(BTreeMap::from([("infiltration_base".to_string(), 1.15)]))
        }
    }

    #[test]
    fn converges_when_threshold_is_reached() {
        let dir = tempdir().unwrap();
        let controller = CalibrationController::new(config(), dir.path());
        let mut runner = RecordingRunner {
            override_counts: vec![],
            coverage: 100.0,
        };
        let mut validator = ImprovingValidator {
            start: 25.0,
            step: 5.0,
        };
        let summary = controller
            .run(&mut runner, &mut validator, &mut FixedCalibrator)
            .unwrap();
        // 20.0, 15.0 <= threshold at iteration 2
        assert_eq!(summary.decision, Decision::Converged);
        assert_eq!(summary.total_iterations, 2);
        // first iteration has no feedback, second gets the calibrator's map
        assert_eq!(runner.override_counts, vec![0, 1]);
        assert!(dir.path().join("iteration_1/state.json").exists());
        assert!(dir.path().join("iteration_2/state.json").exists());
        assert!(dir.path().join("iteration_summary.json").exists());
    }

    #[test]
    fn max_iterations_bounds_the_loop() {
        let dir = tempdir().unwrap();
        let controller = CalibrationController::new(config(), dir.path());
        let mut runner = RecordingRunner {
            override_counts: vec![],
            coverage: 100.0,
        };
        // improves too slowly to converge but fast enough not to stall
        let mut validator = ImprovingValidator {
            start: 100.0,
            step: 3.0,
        };
        let summary = controller
            .run(&mut runner, &mut validator, &mut FixedCalibrator)
            .unwrap();
        assert_eq!(summary.decision, Decision::MaxIter);
        assert_eq!(summary.total_iterations, 3);
    }

    #[test]
    fn stalls_after_patience_without_improvement() {
        let dir = tempdir().unwrap();
        let mut cfg = config();
        cfg.max_iterations = 10;
        let controller = CalibrationController::new(cfg, dir.path());
        let mut runner = RecordingRunner {
            override_counts: vec![],
            coverage: 100.0,
        };
        let mut validator = ImprovingValidator {
            start: 50.0,
            step: 0.0,
        };
        let summary = controller
            .run(&mut runner, &mut validator, &mut FixedCalibrator)
            .unwrap();
        assert_eq!(summary.decision, Decision::Stall);
        // iteration 1 sets the baseline; two stalled iterations follow
        assert_eq!(summary.total_iterations, 3);
    }

    #[test]
    fn resumes_after_persisted_iterations() {
        let dir = tempdir().unwrap();
        let controller = CalibrationController::new(config(), dir.path());
        let mut runner = RecordingRunner {
            override_counts: vec![],
            coverage: 100.0,
        };
        let mut validator = ImprovingValidator {
            start: 25.0,
            step: 5.0,
        };
        controller
            .run(&mut runner, &mut validator, &mut FixedCalibrator)
            .unwrap();

        // resume: already converged state on disk, loop ends at max quickly
        let mut runner2 = RecordingRunner {
            override_counts: vec![],
            coverage: 100.0,
        };
        let summary = controller
            .run(&mut runner2, &mut validator, &mut FixedCalibrator)
            .unwrap();
        // continues from iteration 2, runs only iteration 3
        assert_eq!(runner2.override_counts.len(), 1);
        assert!(summary.total_iterations >= 2);
    }

    #[test]
    fn later_iterations_take_worst_buildings() {
        let dir = tempdir().unwrap();
        let controller = CalibrationController::new(config(), dir.path());
        let previous = IterationState {
            iteration_index: 1,
            selected_building_ids: vec![1, 2, 3],
            validation: ValidationMetrics::from_buildings(vec![
                BuildingValidation {
                    building_id: 1,
                    cvrmse: 40.0,
                    nmbe: 0.0,
                },
                BuildingValidation {
                    building_id: 2,
                    cvrmse: 10.0,
                    nmbe: 0.0,
                },
                BuildingValidation {
                    building_id: 3,
                    cvrmse: 30.0,
                    nmbe: 0.0,
                },
            ]),
            best_parameters: BTreeMap::new(),
            degraded: false,
            completed_at: Utc::now(),
        };
        let selected = controller.select_buildings(2, Some(&previous));
        assert_eq!(selected, vec![1, 3, 2]);
    }

    #[test]
    fn feedback_overrides_bind_iteration_stage() {
        let parameters = BTreeMap::from([("heating_day_setpoint".to_string(), 20.5)]);
        let overrides = feedback_overrides(&parameters, 3);
        assert_eq!(overrides.len(), 1);
        assert_eq!(
            overrides[0].scope.calibration_stage,
            Some(CalibrationStage::Iteration(3))
        );
        assert_eq!(
            overrides[0].payload,
            OverridePayload::NumericFixed(20.5)
        );
    }
}
