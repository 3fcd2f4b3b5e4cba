use std::path::PathBuf;
use std::time::Duration;

use tracing::info;

use crate::error::{Result, ToolError};
use crate::pbs::{JobScript, QueueCli};

/// Cell positions the swept gradients interpolate between: full
/// strength at the posterior point, the swept factor at the anterior
/// one.
const START_POINT: u32 = 9;
const END_POINT: u32 = 49;

/// One family of gradient runs: these rate parameters swept together,
/// with the anterior factor walking from 100 towards `end` in `step`
/// increments.
struct GradientSweep {
    rates: &'static [u32],
    end: i64,
    step: i64,
}

/// Every gradient combination worth brute-forcing, decreasing sweeps
/// towards zero and increasing ones towards a thousand.
const SWEEPS: [GradientSweep; 10] = [
    GradientSweep { rates: &[28, 29], end: -1, step: -1 },
    GradientSweep { rates: &[37], end: 1001, step: 1 },
    GradientSweep { rates: &[41], end: 1001, step: 1 },
    GradientSweep { rates: &[34, 35], end: 1001, step: 1 },
    GradientSweep { rates: &[38, 39], end: 1001, step: 1 },
    GradientSweep { rates: &[4, 5], end: -1, step: -1 },
    GradientSweep { rates: &[34, 35, 37], end: 1001, step: 1 },
    GradientSweep { rates: &[38, 39, 41], end: 1001, step: 1 },
    GradientSweep { rates: &[4, 5, 7], end: -1, step: -1 },
    GradientSweep { rates: &[28, 32, 15], end: -1, step: -1 },
];

fn factor_values(end: i64, step: i64) -> Vec<i64> {
    let mut values = Vec::new();
    let mut factor = 100;
    while (step > 0 && factor < end) || (step < 0 && factor > end) {
        values.push(factor);
        factor += step;
    }
    values
}

/// The gradient file for one run: any base gradients first, then one
/// line per swept rate.
pub fn gradient_contents(base: &str, rates: &[u32], factor: i64) -> String {
    let mut text = base.to_string();
    for rate in rates {
        text.push_str(&format!(
            "{rate} ({START_POINT} 100) ({END_POINT} {factor})\n"
        ));
    }
    text
}

/// A brute-force search over gradient shapes, one queue job per
/// (sweep, factor) combination.
#[derive(Debug, Clone)]
pub struct GradientBatch {
    /// Parameter sets every simulation runs with.
    pub sets_file: PathBuf,
    /// Where gradient files, job files and score files land.
    pub output_dir: PathBuf,
    /// Gradients prepended to every generated file.
    pub base_gradients: Option<PathBuf>,
    /// Simulation executable.
    pub simulation: String,
    /// Extra arguments passed through to the simulation.
    pub sim_args: Vec<String>,
    /// Queue partition the jobs go to.
    pub queue: String,
    /// Hold off submitting while the queue lists more lines than this.
    pub max_queue_lines: usize,
    /// Jobs submitted per burst between queue checks.
    pub submit_chunk: usize,
    /// How long to wait before re-checking a full queue.
    pub throttle_pause: Duration,
}

impl GradientBatch {
    pub fn new(sets_file: PathBuf, output_dir: PathBuf) -> Self {
        GradientBatch {
            sets_file,
            output_dir,
            base_gradients: None,
            simulation: "./simulation".to_string(),
            sim_args: Vec::new(),
            queue: "biomath".to_string(),
            max_queue_lines: 150,
            submit_chunk: 100,
            throttle_pause: Duration::from_secs(300),
        }
    }

    fn read_base(&self) -> Result<String> {
        match &self.base_gradients {
            None => Ok(String::new()),
            Some(path) => {
                std::fs::read_to_string(path).map_err(|source| ToolError::file_access(path, source))
            }
        }
    }

    /// Write the gradient and job files for one sweep family. Returns
    /// the job paths in factor order.
    pub fn write_sweep(&self, sweep: usize, base: &str) -> Result<Vec<PathBuf>> {
        let Some(family) = SWEEPS.get(sweep) else {
            return Err(ToolError::BadFormat {
                what: "gradient sweep",
                detail: format!("no sweep family {sweep}, only {} exist", SWEEPS.len()),
            });
        };
        let mut jobs = Vec::new();
        for factor in factor_values(family.end, family.step) {
            let grad_file = self.output_dir.join(format!("grad-{sweep}-{factor}.gradient"));
            std::fs::write(&grad_file, gradient_contents(base, family.rates, factor))
                .map_err(|source| ToolError::file_access(&grad_file, source))?;

            let scores_file = self.output_dir.join(format!("scores-{sweep}-{factor}.csv"));
            let mut command = self.simulation.clone();
            for arg in &self.sim_args {
                command.push(' ');
                command.push_str(arg);
            }
            command.push_str(&format!(
                " -i {} -r {} -E {}",
                self.sets_file.display(),
                grad_file.display(),
                scores_file.display()
            ));
            let script = JobScript {
                name: format!("gradient-run-{sweep}-{factor}"),
                nodes: 1,
                ppn: 1,
                memory: "500MB".to_string(),
                disk: "500MB".to_string(),
                queue: self.queue.clone(),
                output: PathBuf::from("output.txt"),
                walltime: "360:00:00".to_string(),
                command,
            };
            let job_file = self.output_dir.join(format!("pbs-job-{sweep}-{factor}"));
            script.write_to(&job_file)?;
            jobs.push(job_file);
        }
        Ok(jobs)
    }

    /// Write every sweep family's files. Returns all job paths in
    /// submission order.
    pub fn prepare(&self) -> Result<Vec<PathBuf>> {
        let base = self.read_base()?;
        std::fs::create_dir_all(&self.output_dir)
            .map_err(|source| ToolError::file_access(&self.output_dir, source))?;
        let mut jobs = Vec::new();
        for sweep in 0..SWEEPS.len() {
            jobs.extend(self.write_sweep(sweep, &base)?);
        }
        info!(jobs = jobs.len(), "Wrote gradient runs");
        Ok(jobs)
    }

    /// Submit jobs in bursts, holding each burst until the queue
    /// drains below the line limit. Every job gets submitted
    /// eventually. Returns how many the queue accepted.
    pub async fn submit_paths(&self, queue: &QueueCli, jobs: &[PathBuf]) -> Result<usize> {
        let mut accepted = 0;
        for burst in jobs.chunks(self.submit_chunk.max(1)) {
            loop {
                let listing = queue.status().await?;
                if listing.line_count() <= self.max_queue_lines {
                    break;
                }
                info!(
                    lines = listing.line_count(),
                    limit = self.max_queue_lines,
                    "Queue is full, pausing submissions"
                );
                tokio::time::sleep(self.throttle_pause).await;
            }
            for job in burst {
                if queue.submit(job).await?.accepted {
                    accepted += 1;
                }
            }
        }
        Ok(accepted)
    }

    /// Prepare everything and push it through the throttled submitter.
    pub async fn submit_all(&self, queue: &QueueCli) -> Result<usize> {
        let jobs = self.prepare()?;
        let accepted = self.submit_paths(queue, &jobs).await?;
        info!(accepted, total = jobs.len(), "Gradient batch submitted");
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn factors_walk_both_directions() {
        let down = factor_values(-1, -1);
        assert_eq!(down.len(), 101);
        assert_eq!(down.first(), Some(&100));
        assert_eq!(down.last(), Some(&0));

        let up = factor_values(1001, 1);
        assert_eq!(up.len(), 901);
        assert_eq!(up.last(), Some(&1000));
    }

    #[test]
    fn gradient_lines_follow_the_base() {
        let text = gradient_contents("5 (0 100)\n", &[28, 29], 40);
        assert_eq!(text, "5 (0 100)\n28 (9 100) (49 40)\n29 (9 100) (49 40)\n");
    }

    #[test]
    fn sweep_zero_covers_every_factor() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = GradientBatch::new(
            PathBuf::from("sets.params"),
            dir.path().to_path_buf(),
        );
        batch.sim_args = vec!["-u".to_string()];
        let jobs = batch.write_sweep(0, "").unwrap();
        assert_eq!(jobs.len(), 101);
        assert!(jobs[0].ends_with("pbs-job-0-100"));
        assert!(jobs[100].ends_with("pbs-job-0-0"));

        let grad = std::fs::read_to_string(dir.path().join("grad-0-100.gradient")).unwrap();
        assert_eq!(grad, "28 (9 100) (49 100)\n29 (9 100) (49 100)\n");

        let job = std::fs::read_to_string(&jobs[0]).unwrap();
        assert!(job.contains("#PBS -N gradient-run-0-100\n"));
        assert!(job.contains("#PBS -l walltime=360:00:00\n"));
        let grad_file = dir.path().join("grad-0-100.gradient");
        let scores = dir.path().join("scores-0-100.csv");
        assert!(job.contains(&format!(
            "./simulation -u -i sets.params -r {} -E {}",
            grad_file.display(),
            scores.display()
        )));

        assert!(batch.write_sweep(10, "").is_err());
    }

    fn fake_command(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{body}").unwrap();
        let mut perms = file.metadata().unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path.display().to_string()
    }

    #[tokio::test]
    async fn submission_waits_for_the_queue_to_drain() {
        let dir = tempfile::tempdir().unwrap();
        let flag = dir.path().join("drained");
        // the first status call reports a full queue, later ones an
        // almost empty one
        let qstat = fake_command(
            &dir,
            "qstat",
            &format!(
                "if [ -f {flag} ]; then printf 'a\\nb\\n'; else touch {flag}; seq 1 200; fi",
                flag = flag.display()
            ),
        );
        let queue = QueueCli::with_commands("true", qstat, "true");

        let mut batch = GradientBatch::new(PathBuf::from("sets.params"), dir.path().to_path_buf());
        batch.throttle_pause = Duration::from_millis(5);
        let jobs = vec![
            dir.path().join("pbs-job-0-100"),
            dir.path().join("pbs-job-0-99"),
        ];
        let accepted = batch.submit_paths(&queue, &jobs).await.unwrap();
        assert_eq!(accepted, 2);
        assert!(flag.exists());
    }
}
