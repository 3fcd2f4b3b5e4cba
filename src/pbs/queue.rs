use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::{Result, ToolError};

/// Wrapper around the batch queue's command-line tools.
///
/// The actual command names are configurable so tests can stand in fakes
/// for `qsub`/`qstat`/`qdel`.
#[derive(Debug, Clone)]
pub struct QueueCli {
    qsub: String,
    qstat: String,
    qdel: String,
}

impl Default for QueueCli {
    fn default() -> Self {
        Self {
            qsub: "qsub".to_string(),
            qstat: "qstat".to_string(),
            qdel: "qdel".to_string(),
        }
    }
}

impl QueueCli {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_commands(
        qsub: impl Into<String>,
        qstat: impl Into<String>,
        qdel: impl Into<String>,
    ) -> Self {
        Self {
            qsub: qsub.into(),
            qstat: qstat.into(),
            qdel: qdel.into(),
        }
    }

    /// Submit a job file; returns the job identifier the queue printed.
    ///
    /// A rejected submission is logged but still returns a receipt; the
    /// queue offers no per-job recovery, so the caller treats a vanished
    /// job the same as a finished one either way.
    pub async fn submit(&self, job_file: &Path) -> Result<SubmitReceipt> {
        let output = Command::new(&self.qsub)
            .arg(job_file)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        let job_id = String::from_utf8_lossy(&output.stdout).trim().to_string();
        let accepted = output.status.success();
        if accepted {
            tracing::info!(job_file = %job_file.display(), job_id, "Job submitted");
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                job_file = %job_file.display(),
                stderr = %stderr.trim(),
                "Queue rejected the job submission"
            );
        }
        Ok(SubmitReceipt { job_id, accepted })
    }

    /// Capture the queue's current status listing.
    pub async fn status(&self) -> Result<QueueListing> {
        let output = Command::new(&self.qstat)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        Ok(QueueListing {
            raw: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Remove a job from the queue.
    pub async fn delete(&self, job_id: &str) -> Result<()> {
        let output = Command::new(&self.qdel)
            .arg(job_id)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() {
            Ok(())
        } else {
            Err(ToolError::Queue(format!(
                "couldn't delete job {}: {}",
                job_id,
                String::from_utf8_lossy(&output.stderr).trim()
            )))
        }
    }
}

/// What the queue said when a job was handed to it.
#[derive(Debug, Clone)]
pub struct SubmitReceipt {
    pub job_id: String,
    pub accepted: bool,
}

/// One captured status listing.
#[derive(Debug, Clone)]
pub struct QueueListing {
    raw: String,
    stderr: String,
}

impl QueueListing {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            stderr: String::new(),
        }
    }

    /// Anything the status command wrote to its error stream. Non-empty
    /// text gets shown to the user but never aborts a poll loop.
    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    /// Does any listed job carry this tag?
    pub fn contains(&self, tag: &str) -> bool {
        self.raw.contains(tag)
    }

    /// Is this specific job identifier still listed? Queue listings
    /// usually truncate the full id, so only the part before the first
    /// dot is matched.
    pub fn lists_job(&self, job_id: &str) -> bool {
        let key = match job_id.split('.').next() {
            Some(k) if !k.is_empty() => k,
            _ => return false,
        };
        self.raw.contains(key)
    }

    /// Cheap change-detection fingerprint: the listing's length plus the
    /// number of running-state markers in it.
    pub fn snapshot(&self) -> ListingSnapshot {
        ListingSnapshot {
            len: self.raw.len(),
            running: self.raw.matches('R').count(),
        }
    }

    /// Number of lines in the listing; a rough proxy for how many jobs
    /// the queue currently holds.
    pub fn line_count(&self) -> usize {
        self.raw.matches('\n').count()
    }

    /// User-facing excerpt: the listing's header line plus the block of
    /// lines mentioning `tag`.
    pub fn excerpt(&self, tag: &str) -> String {
        let mut lines = self.raw.lines();
        let header = lines.next().unwrap_or_default();
        let tagged: Vec<&str> = self.raw.lines().filter(|l| l.contains(tag)).collect();
        if tagged.is_empty() {
            header.to_string()
        } else {
            format!("{}\n{}", header, tagged.join("\n"))
        }
    }
}

/// Fingerprint of a status listing used to decide whether anything moved
/// between two polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ListingSnapshot {
    pub len: usize,
    pub running: usize,
}
