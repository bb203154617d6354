//! # besim-batch: Simulation Driver
//!
//! A thin fan-out over the external whole-building engine: one job per
//! (building, variant), bounded by a Rayon worker pool, with per-run status
//! recorded in a JSON manifest. Failures are recorded and skipped, never
//! retried; downstream extraction tolerates missing runs.

pub mod job;
pub mod manifest;
pub mod runner;

pub use job::{jobs_from_variants, RunRecord, RunStatus, SimJob};
pub use manifest::{load_batch_manifest, write_batch_manifest, BatchManifest};
pub use runner::{run_batch, BatchRunnerConfig, BatchSummary, CommandRunner, EngineRunner};
