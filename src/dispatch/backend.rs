use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::{Child, Command};

use crate::config::{DispatchConfig, PollConfig, QueueResources};
use crate::dispatch::backoff::PollBackoff;
use crate::error::{Result, ToolError};
use crate::pbs::{JobScript, ListingSnapshot, QueueCli};

/// Tri-state status of one dispatched worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Running,
    Done,
    Unknown,
}

/// Opaque handle to one spawned unit of work: a slot in the local child
/// table, or the job identifier a batch queue reported at submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobHandle {
    Local(usize),
    Queued(String),
}

impl std::fmt::Display for JobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobHandle::Local(index) => write!(f, "local-{}", index),
            JobHandle::Queued(id) => write!(f, "{}", id),
        }
    }
}

/// One worker's invocation.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Ordinal within the dispatch; keeps job files and log paths
    /// distinct between workers submitted in the same run.
    pub index: usize,
    /// Where a queued worker's combined output stream should go.
    pub log_file: PathBuf,
}

impl WorkerCommand {
    /// The full command line as the queue's job file expects it.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// How a dispatch run starts, watches and stops its workers.
///
/// Two flavors exist: local child processes and batch-queue jobs. The
/// waiting strategy is part of the backend because the two flavors
/// confirm completion in fundamentally different ways: the local one by
/// reaping children, the queued one by watching a status listing.
#[async_trait]
pub trait JobBackend {
    /// Start one worker and return its handle.
    async fn submit(&mut self, command: &WorkerCommand) -> Result<JobHandle>;

    /// Best-effort status of one worker. `Unknown` means the status
    /// could not be determined this time, not that the worker failed.
    async fn poll_status(&mut self, handle: &JobHandle) -> JobState;

    /// Stop one worker early. The dispatcher itself never cancels; this
    /// exists for callers tearing a run down from outside.
    async fn cancel(&mut self, handle: &JobHandle) -> Result<()>;

    /// Block until every given worker has finished, in dispatch order.
    async fn wait_all(&mut self, handles: &[JobHandle]) -> Result<Vec<JobOutcome>>;
}

/// Terminal record for one worker.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub handle: JobHandle,
    /// Exit code when the backend can know it (local children only).
    pub exit_code: Option<i32>,
}

// =============================================================================
// Local backend: one child process per worker
// =============================================================================

/// Runs workers as child processes of this one.
#[derive(Debug, Default)]
pub struct LocalBackend {
    children: Vec<Option<Child>>,
    exit_codes: Vec<Option<i32>>,
}

impl LocalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, handle: &JobHandle) -> Option<usize> {
        match handle {
            JobHandle::Local(index) if *index < self.children.len() => Some(*index),
            _ => None,
        }
    }
}

#[async_trait]
impl JobBackend for LocalBackend {
    async fn submit(&mut self, command: &WorkerCommand) -> Result<JobHandle> {
        let child = Command::new(&command.program).args(&command.args).spawn()?;
        tracing::info!(
            worker = command.index,
            program = %command.program.display(),
            pid = child.id(),
            "Spawned local worker"
        );
        let index = self.children.len();
        self.children.push(Some(child));
        self.exit_codes.push(None);
        Ok(JobHandle::Local(index))
    }

    async fn poll_status(&mut self, handle: &JobHandle) -> JobState {
        let Some(index) = self.slot(handle) else {
            return JobState::Unknown;
        };
        match self.children[index].as_mut() {
            None => JobState::Done,
            Some(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    self.exit_codes[index] = status.code();
                    self.children[index] = None;
                    JobState::Done
                }
                Ok(None) => JobState::Running,
                Err(_) => JobState::Unknown,
            },
        }
    }

    async fn cancel(&mut self, handle: &JobHandle) -> Result<()> {
        let Some(index) = self.slot(handle) else {
            return Err(ToolError::Queue(format!("no such worker: {}", handle)));
        };
        if let Some(child) = self.children[index].as_mut() {
            child.kill().await?;
            self.children[index] = None;
        }
        Ok(())
    }

    async fn wait_all(&mut self, handles: &[JobHandle]) -> Result<Vec<JobOutcome>> {
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let Some(index) = self.slot(handle) else {
                continue;
            };
            if let Some(mut child) = self.children[index].take() {
                let status = child.wait().await?;
                self.exit_codes[index] = status.code();
                if !status.success() {
                    // Recorded but deliberately not fatal; the remaining
                    // workers still get waited on.
                    tracing::warn!(
                        worker = index,
                        code = ?status.code(),
                        "Local worker exited with a failure status"
                    );
                }
            }
            outcomes.push(JobOutcome {
                handle: handle.clone(),
                exit_code: self.exit_codes[index],
            });
        }
        Ok(outcomes)
    }
}

// =============================================================================
// Queue backend: job files submitted to a batch queue
// =============================================================================

/// Runs workers as batch-queue jobs and watches the queue's status
/// listing until none of them carry this run's job-name tag anymore.
#[derive(Debug, Clone)]
pub struct QueueBackend {
    cli: QueueCli,
    job_name: String,
    queue: String,
    ppn: u32,
    job_dir: PathBuf,
    resources: QueueResources,
    poll: PollConfig,
}

impl QueueBackend {
    pub fn new(config: &DispatchConfig, queue: impl Into<String>) -> Self {
        Self {
            cli: QueueCli::new(),
            job_name: config.job_name.clone(),
            queue: queue.into(),
            ppn: config.ppn,
            job_dir: config.job_dir.clone(),
            resources: config.resources.clone(),
            poll: config.poll.clone(),
        }
    }

    pub fn with_cli(mut self, cli: QueueCli) -> Self {
        self.cli = cli;
        self
    }

    fn script_for(&self, command: &WorkerCommand) -> JobScript {
        JobScript {
            name: self.job_name.clone(),
            nodes: 1,
            ppn: self.ppn,
            memory: self.resources.memory.clone(),
            disk: self.resources.disk.clone(),
            queue: self.queue.clone(),
            output: command.log_file.clone(),
            walltime: self.resources.walltime.clone(),
            command: command.command_line(),
        }
    }
}

#[async_trait]
impl JobBackend for QueueBackend {
    async fn submit(&mut self, command: &WorkerCommand) -> Result<JobHandle> {
        // One file per worker; sharing a single file here would race
        // between submissions.
        let job_file = self.job_dir.join(format!("pbs-job-{}", command.index));
        self.script_for(command).write_to(&job_file)?;
        let receipt = self.cli.submit(&job_file).await?;
        Ok(JobHandle::Queued(receipt.job_id))
    }

    async fn poll_status(&mut self, handle: &JobHandle) -> JobState {
        let JobHandle::Queued(job_id) = handle else {
            return JobState::Unknown;
        };
        if job_id.is_empty() {
            return JobState::Unknown;
        }
        match self.cli.status().await {
            // A job that left the listing is indistinguishable from one
            // that finished; it counts as done.
            Ok(listing) if listing.lists_job(job_id) => JobState::Running,
            Ok(_) => JobState::Done,
            Err(_) => JobState::Unknown,
        }
    }

    async fn cancel(&mut self, handle: &JobHandle) -> Result<()> {
        let JobHandle::Queued(job_id) = handle else {
            return Err(ToolError::Queue(format!("not a queued job: {}", handle)));
        };
        self.cli.delete(job_id).await
    }

    async fn wait_all(&mut self, handles: &[JobHandle]) -> Result<Vec<JobOutcome>> {
        let started = Instant::now();
        let mut backoff = PollBackoff::new(self.poll.clone());
        let mut last = ListingSnapshot::default();

        loop {
            let listing = self.cli.status().await?;
            if !listing.stderr().is_empty() {
                // Shown to the user, but never aborts the wait.
                println!("\t~ Error ~\n{}", listing.stderr().trim_end());
            }
            if !listing.contains(&self.job_name) {
                break;
            }
            let snapshot = listing.snapshot();
            if snapshot != last {
                backoff.changed();
                let elapsed = started.elapsed().as_secs();
                println!(
                    "\n\t~ Queue Update -- Running Time = {}:{:02} ~\n{}",
                    elapsed / 60,
                    elapsed % 60,
                    listing.excerpt(&self.job_name)
                );
            } else {
                backoff.quiet();
            }
            last = snapshot;
            tokio::time::sleep(backoff.current()).await;
        }

        tracing::info!(
            tag = %self.job_name,
            elapsed_secs = started.elapsed().as_secs(),
            "Job tag left the queue listing"
        );
        Ok(handles
            .iter()
            .map(|handle| JobOutcome {
                handle: handle.clone(),
                exit_code: None,
            })
            .collect())
    }
}
