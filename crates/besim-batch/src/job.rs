//! Simulation jobs and per-run records.

use besim_variants::VariantArtifact;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-run outcome. Downstream extraction tolerates failed and skipped
/// runs; nothing is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        }
    }
}

/// One engine invocation: a (building, variant) deck with its weather.
#[derive(Debug, Clone)]
pub struct SimJob {
    pub job_id: String,
    pub building_id: u64,
    pub variant_id: usize,
    pub deck_file: PathBuf,
    pub weather_file: PathBuf,
}

impl SimJob {
    pub fn new(
        building_id: u64,
        variant_id: usize,
        deck_file: impl Into<PathBuf>,
        weather_file: impl Into<PathBuf>,
    ) -> SimJob {
        SimJob {
            job_id: format!("b{building_id}:v{variant_id}"),
            building_id,
            variant_id,
            deck_file: deck_file.into(),
            weather_file: weather_file.into(),
        }
    }
}

/// What one run left behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub job_id: String,
    pub building_id: u64,
    pub variant_id: usize,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Path to the engine's relational result store, when the run produced
    /// one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_store: Option<String>,
    pub finished_at: String,
}

/// Build jobs from one building's variant artifacts, all sharing a weather
/// file.
pub fn jobs_from_variants(
    building_id: u64,
    artifacts: &[VariantArtifact],
    weather_file: &std::path::Path,
) -> Vec<SimJob> {
    artifacts
        .iter()
        .map(|artifact| {
            SimJob::new(
                building_id,
                artifact.variant_id,
                &artifact.deck_file,
                weather_file,
            )
        })
        .collect()
}
