use std::path::PathBuf;
use std::time::Duration;

/// How dispatched workers execute.
///
/// Local mode spawns one child process per worker on this machine. Queued
/// mode writes one batch-queue job description per worker and submits it
/// with `qsub`; the named queue is the cluster partition to run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchMode {
    Local,
    Queued { queue: String },
}

impl DispatchMode {
    pub fn is_queued(&self) -> bool {
        matches!(self, DispatchMode::Queued { .. })
    }
}

/// Configuration for one dispatch run.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Number of workers to fan out across.
    pub workers: usize,
    /// Local children or batch-queue jobs.
    pub mode: DispatchMode,
    /// Name given to every queued job; the poll loop scans the status
    /// listing for this tag to decide when the run is finished.
    pub job_name: String,
    /// Processors per node requested for each queued job.
    pub ppn: u32,
    /// Directory where job-description files are written.
    pub job_dir: PathBuf,
    /// Resource limits stamped into each job description.
    pub resources: QueueResources,
    /// Poll-loop timing.
    pub poll: PollConfig,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: 1,
            mode: DispatchMode::Local,
            job_name: "PLOT_SA".to_string(),
            ppn: 2,
            job_dir: PathBuf::from("."),
            resources: QueueResources::default(),
            poll: PollConfig::default(),
        }
    }
}

impl DispatchConfig {
    pub fn new(workers: usize, mode: DispatchMode) -> Self {
        Self {
            workers,
            mode,
            ..Default::default()
        }
    }

    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = name.into();
        self
    }

    pub fn with_job_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.job_dir = dir.into();
        self
    }

    pub fn with_ppn(mut self, ppn: u32) -> Self {
        self.ppn = ppn;
        self
    }
}

/// Memory, disk and wall-time limits for a queued job.
#[derive(Debug, Clone)]
pub struct QueueResources {
    pub memory: String,
    pub disk: String,
    pub walltime: String,
}

impl Default for QueueResources {
    fn default() -> Self {
        Self {
            memory: "3GB".to_string(),
            disk: "500MB".to_string(),
            walltime: "24:00:00".to_string(),
        }
    }
}

/// Timing for the queue polling loop.
///
/// The wait between polls starts at `first_wait`, grows by `step` after
/// every poll where the listing is unchanged, and is capped at `max_wait`.
/// Whenever the listing changes the wait snaps back to `reset_wait`.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub first_wait: Duration,
    pub reset_wait: Duration,
    pub step: Duration,
    pub max_wait: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            first_wait: Duration::from_secs(7),
            reset_wait: Duration::from_secs(3),
            step: Duration::from_secs(1),
            max_wait: Duration::from_secs(30),
        }
    }
}
