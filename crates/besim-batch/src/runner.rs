//! The batch runner: bounded-parallel fan-out of engine runs.
//!
//! One worker owns one (building, variant) run for its lifetime; the pool
//! bounds the fan-out and nothing queues unboundedly. A run that crashes or
//! exceeds the wall clock is recorded as failed and never retried.

use crate::job::{RunRecord, RunStatus, SimJob};
use crate::manifest::{write_batch_manifest, BatchManifest};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// The external whole-building engine, behind a trait so tests and dry runs
/// can stand in for it.
pub trait EngineRunner: Sync {
    /// Run one job to completion, returning the path of the relational
    /// result store it produced.
    fn run(&self, job: &SimJob, run_dir: &std::path::Path) -> Result<PathBuf>;
}

/// Invokes the engine binary as `<program> -w <weather> -d <run_dir>
/// <deck>` and expects the relational result store in the run directory.
pub struct CommandRunner {
    pub program: PathBuf,
    pub timeout: Duration,
    /// Result-store file name inside the run directory.
    pub result_store_name: String,
}

impl CommandRunner {
    pub fn new(program: impl Into<PathBuf>) -> CommandRunner {
        CommandRunner {
            program: program.into(),
            timeout: Duration::from_secs(3600),
            result_store_name: "eplusout.sql".into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> CommandRunner {
        self.timeout = timeout;
        self
    }
}

impl EngineRunner for CommandRunner {
    fn run(&self, job: &SimJob, run_dir: &std::path::Path) -> Result<PathBuf> {
        let mut child = Command::new(&self.program)
            .arg("-w")
            .arg(&job.weather_file)
            .arg("-d")
            .arg(run_dir)
            .arg(&job.deck_file)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("spawning engine '{}'", self.program.display()))?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait().context("polling engine process")? {
                Some(status) => break status,
                None if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    bail!(
                        "engine run '{}' exceeded wall clock of {:?}",
                        job.job_id,
                        self.timeout
                    );
                }
                None => std::thread::sleep(Duration::from_millis(200)),
            }
        };
        if !status.success() {
            bail!("engine run '{}' exited with {status}", job.job_id);
        }
        let store = run_dir.join(&self.result_store_name);
        if !store.exists() {
            bail!(
                "engine run '{}' produced no result store at '{}'",
                job.job_id,
                store.display()
            );
        }
        Ok(store)
    }
}

/// Runner settings for one batch.
pub struct BatchRunnerConfig {
    pub jobs: Vec<SimJob>,
    pub output_root: PathBuf,
    /// 0 = auto-detect CPU count.
    pub threads: usize,
}

/// Summary returned after the run so clients can log success/failure counts
/// and the manifest location.
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub manifest_path: PathBuf,
    pub runs: Vec<RunRecord>,
}

pub fn run_batch(config: &BatchRunnerConfig, engine: &dyn EngineRunner) -> Result<BatchSummary> {
    fs::create_dir_all(&config.output_root).with_context(|| {
        format!(
            "creating batch output root '{}'",
            config.output_root.display()
        )
    })?;

    let thread_count = if config.threads == 0 {
        num_cpus::get()
    } else {
        config.threads
    };
    let pool = ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .context("building Rayon thread pool for batch runs")?;

    // Engine runs are commutative across (building, variant); each worker
    // owns its run directory exclusively.
    let runs: Vec<RunRecord> = pool.install(|| {
        config
            .jobs
            .par_iter()
            .map(|job| run_job(job, config, engine))
            .collect()
    });

    let succeeded = runs
        .iter()
        .filter(|record| record.status == RunStatus::Succeeded)
        .count();
    let failed = runs.len() - succeeded;

    let manifest = BatchManifest {
        created_at: Utc::now(),
        num_runs: runs.len(),
        succeeded,
        failed,
        runs: runs.clone(),
    };
    let manifest_path = config.output_root.join("batch_manifest.json");
    write_batch_manifest(&manifest_path, &manifest)?;
    Ok(BatchSummary {
        succeeded,
        failed,
        manifest_path,
        runs,
    })
}

fn run_job(job: &SimJob, config: &BatchRunnerConfig, engine: &dyn EngineRunner) -> RunRecord {
    let run_dir = config.output_root.join(&job.job_id.replace(':', "_"));
    let outcome = || -> Result<PathBuf> {
        if !job.deck_file.exists() {
            return Err(anyhow!(
                "deck '{}' does not exist",
                job.deck_file.display()
            ));
        }
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("creating run directory '{}'", run_dir.display()))?;
        engine.run(job, &run_dir)
    }();

    let (status, error, result_store) = match outcome {
        Ok(store) => (RunStatus::Succeeded, None, Some(store.display().to_string())),
        Err(err) => {
            eprintln!("simulation {} failed: {err}", job.job_id);
            (RunStatus::Failed, Some(err.to_string()), None)
        }
    };
    RunRecord {
        job_id: job.job_id.clone(),
        building_id: job.building_id,
        variant_id: job.variant_id,
        status,
        error,
        result_store,
        finished_at: Utc::now().to_rfc3339(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::tempdir;

    /// Test stand-in: succeeds for even variants, fails odd ones.
    struct FlakyEngine;

    impl EngineRunner for FlakyEngine {
        fn run(&self, job: &SimJob, run_dir: &Path) -> Result<PathBuf> {
            if job.variant_id % 2 == 1 {
                bail!("synthetic crash");
            }
            let store = run_dir.join("results.sql");
            fs::write(&store, b"")?;
            Ok(store)
        }
    }

    fn jobs_in(dir: &Path, count: usize) -> Vec<SimJob> {
        (0..count)
            .map(|variant| {
                let deck = dir.join(format!("v{variant}.idf"));
                fs::write(&deck, "Zone,\n  Z1;\n").unwrap();
                SimJob::new(1, variant, deck, dir.join("w.epw"))
            })
            .collect()
    }

    #[test]
    fn batch_records_mixed_outcomes_and_continues() {
        let dir = tempdir().unwrap();
        let config = BatchRunnerConfig {
            jobs: jobs_in(dir.path(), 4),
            output_root: dir.path().join("runs"),
            threads: 2,
        };
        let summary = run_batch(&config, &FlakyEngine).unwrap();
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert!(summary.manifest_path.exists());
        let failed: Vec<_> = summary
            .runs
            .iter()
            .filter(|r| r.status == RunStatus::Failed)
            .collect();
        assert!(failed.iter().all(|r| r.error.is_some()));
        assert!(failed.iter().all(|r| r.result_store.is_none()));
    }

    #[test]
    fn missing_deck_is_a_failed_run_not_a_batch_error() {
        let dir = tempdir().unwrap();
        let config = BatchRunnerConfig {
            jobs: vec![SimJob::new(1, 0, dir.path().join("ghost.idf"), "w.epw")],
            output_root: dir.path().join("runs"),
            threads: 1,
        };
        let summary = run_batch(&config, &FlakyEngine).unwrap();
        assert_eq!(summary.failed, 1);
        assert!(summary.runs[0]
            .error
            .as_deref()
            .unwrap()
            .contains("does not exist"));
    }

    #[cfg(unix)]
    #[test]
    fn command_runner_times_out() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let deck = dir.path().join("v0.idf");
        fs::write(&deck, "Zone,\n  Z1;\n").unwrap();
        let engine = dir.path().join("fake_engine.sh");
        fs::write(&engine, "#!/bin/sh\nsleep 10\n").unwrap();
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

        let runner = CommandRunner::new(&engine).with_timeout(Duration::from_millis(200));
        let job = SimJob::new(1, 0, &deck, dir.path().join("w.epw"));
        let err = runner.run(&job, dir.path()).unwrap_err();
        assert!(err.to_string().contains("exceeded wall clock"));
    }

    #[cfg(unix)]
    #[test]
    fn command_runner_requires_result_store() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let deck = dir.path().join("v0.idf");
        fs::write(&deck, "Zone,\n  Z1;\n").unwrap();
        let engine = dir.path().join("fake_engine.sh");
        fs::write(&engine, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

        let runner = CommandRunner::new(&engine).with_timeout(Duration::from_secs(5));
        let job = SimJob::new(1, 0, &deck, dir.path().join("w.epw"));
        let err = runner.run(&job, dir.path()).unwrap_err();
        assert!(err.to_string().contains("no result store"));
    }
}
