//! # besim-calib: Calibration Controller
//!
//! Drives up to K calibration iterations: building selection (explicit
//! list first, then the worst validation failures), parameter feedback
//! translated into override records for the parameter assigner, the
//! build → simulate → extract pipeline behind a trait, validation, and a
//! convergence decision expressed as a sum type.
//!
//! Every iteration persists a JSON state file plus its validation results
//! and best parameters into `iteration_<k>/`; earlier iterations are never
//! mutated, and a restarted controller resumes after the highest persisted
//! iteration.

pub mod config;
pub mod controller;
pub mod state;

pub use config::{BuildingSelection, ConvergenceCriteria, ConvergenceMetric, IterationConfig};
pub use controller::{
    calibration_root, feedback_overrides, CalibrationController, CalibrationSummary, Calibrator,
    Decision, IterationRunner, IterationRunOutcome, Validator,
};
pub use state::{
    iteration_dir, latest_iteration, load_iteration, save_iteration, BuildingValidation,
    IterationState, ValidationMetrics,
};
