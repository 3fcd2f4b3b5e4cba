//! Fans independent work items out across workers, either local child
//! processes or batch-queue jobs, and blocks until all of them finish.

pub mod backend;
pub mod backoff;
pub mod partition;

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{DispatchConfig, DispatchMode};
use crate::error::Result;

pub use backend::{JobBackend, JobHandle, JobOutcome, JobState, LocalBackend, QueueBackend, WorkerCommand};
pub use backoff::PollBackoff;
pub use partition::{partition, SetRange};

/// Builds per-worker invocations of one executable from a shared
/// argument template.
///
/// Each worker gets the fixed arguments, then its share of the work as
/// `-c <count> -k <start index>`, then an optional per-worker output
/// directory as `-D <dir>`, then the trailing passthrough arguments.
#[derive(Debug, Clone)]
pub struct WorkerTemplate {
    pub program: PathBuf,
    pub fixed_args: Vec<String>,
    pub trailing_args: Vec<String>,
    /// Stem for queued workers' log files: `<stem>_<index>.output`.
    pub log_stem: String,
}

impl WorkerTemplate {
    pub fn commands(
        &self,
        ranges: &[SetRange],
        output_dirs: Option<&[PathBuf]>,
    ) -> Vec<WorkerCommand> {
        ranges
            .iter()
            .enumerate()
            .map(|(index, range)| {
                let mut args = self.fixed_args.clone();
                args.push("-c".to_string());
                args.push(range.count.to_string());
                args.push("-k".to_string());
                args.push(range.start.to_string());
                if let Some(dirs) = output_dirs {
                    args.push("-D".to_string());
                    args.push(dirs[index].display().to_string());
                }
                args.extend(self.trailing_args.iter().cloned());
                WorkerCommand {
                    program: self.program.clone(),
                    args,
                    index,
                    log_file: PathBuf::from(format!("{}_{}.output", self.log_stem, index)),
                }
            })
            .collect()
    }
}

/// Machine-readable record of one dispatch run.
#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub mode: String,
    pub workers: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub jobs: Vec<JobReport>,
}

#[derive(Debug, Serialize)]
pub struct JobReport {
    pub worker: usize,
    pub handle: String,
    /// Known for local children only; queued jobs surface no exit status.
    pub exit_code: Option<i32>,
}

/// Coordinates one fan-out-and-wait run.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    /// Start every worker, then block until all have finished.
    ///
    /// Local workers are waited on sequentially in spawn order. Queued
    /// workers are watched collectively: the run is over once the job
    /// tag is gone from the queue's status listing.
    pub async fn run(&self, commands: &[WorkerCommand]) -> Result<DispatchReport> {
        match &self.config.mode {
            DispatchMode::Local => {
                self.run_with(LocalBackend::new(), "local", commands).await
            }
            DispatchMode::Queued { queue } => {
                let backend = QueueBackend::new(&self.config, queue.clone());
                self.run_with(backend, "queued", commands).await
            }
        }
    }

    /// Same as [`Dispatcher::run`] but with a caller-provided backend.
    pub async fn run_with<B: JobBackend + Send>(
        &self,
        mut backend: B,
        mode: &str,
        commands: &[WorkerCommand],
    ) -> Result<DispatchReport> {
        let started = Instant::now();
        let started_at = Utc::now();
        tracing::info!(workers = commands.len(), mode, "Dispatching workers");

        let mut handles = Vec::with_capacity(commands.len());
        for command in commands {
            handles.push(backend.submit(command).await?);
        }

        tracing::info!(mode, "All workers started, waiting for completion");
        let outcomes = backend.wait_all(&handles).await?;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(mode, elapsed_ms, "Dispatch complete");
        Ok(DispatchReport {
            mode: mode.to_string(),
            workers: commands.len(),
            started_at,
            elapsed_ms,
            jobs: outcomes
                .iter()
                .enumerate()
                .map(|(worker, outcome)| JobReport {
                    worker,
                    handle: outcome.handle.to_string(),
                    exit_code: outcome.exit_code,
                })
                .collect(),
        })
    }
}
