use std::path::PathBuf;

use tracing::info;

use crate::error::{Result, ToolError};
use crate::pbs::{JobScript, QueueCli};

/// A robustness sweep: every parameter set runs once per random seed,
/// split into queue jobs of `pars_per_job` sets each.
///
/// Each chunk of the input becomes its own `input<k>.params` file and
/// every (seed, chunk) pair gets a job writing `scores-<seed>-<k>.csv`,
/// which is the layout the pass counter expects.
#[derive(Debug, Clone)]
pub struct SeedBatch {
    /// Parameter sets to test.
    pub input: PathBuf,
    /// How many sets from the input take part.
    pub num_params: usize,
    /// Sets handed to each job.
    pub pars_per_job: usize,
    /// Where chunk files, job files and score files land.
    pub directory: PathBuf,
    /// Simulation executable.
    pub simulation: String,
    /// Extra arguments passed through to the simulation.
    pub sim_args: Vec<String>,
    /// How many seeds to run; seed number k counts from one and runs
    /// with seed k * 1000.
    pub seeds: usize,
    /// Queue partition the jobs go to.
    pub queue: String,
}

impl SeedBatch {
    fn chunk_file(&self, chunk: usize) -> PathBuf {
        self.directory.join(format!("input{chunk}.params"))
    }

    fn job_file(&self, seed: usize, chunk: usize) -> PathBuf {
        self.directory.join(format!("pbs-job-{seed}-{chunk}"))
    }

    fn scores_file(&self, seed: usize, chunk: usize) -> PathBuf {
        self.directory.join(format!("scores-{seed}-{chunk}.csv"))
    }

    fn bad(&self, detail: String) -> ToolError {
        ToolError::BadFormat {
            what: "seed batch",
            detail,
        }
    }

    /// Split the input into per-job chunk files. Returns the number of
    /// sets in each chunk; only the last may come up short.
    pub fn write_chunks(&self) -> Result<Vec<usize>> {
        if self.pars_per_job == 0 {
            return Err(self.bad("pars-per-job must be at least 1".to_string()));
        }
        let content = std::fs::read_to_string(&self.input)
            .map_err(|source| ToolError::file_access(&self.input, source))?;
        let lines: Vec<&str> = content.lines().collect();
        if lines.len() < self.num_params {
            return Err(self.bad(format!(
                "{} holds {} sets but {} were requested",
                self.input.display(),
                lines.len(),
                self.num_params
            )));
        }
        std::fs::create_dir_all(&self.directory)
            .map_err(|source| ToolError::file_access(&self.directory, source))?;

        let mut sizes = Vec::new();
        for (chunk, sets) in lines[..self.num_params]
            .chunks(self.pars_per_job)
            .enumerate()
        {
            let path = self.chunk_file(chunk);
            let mut text = String::new();
            for set in sets {
                text.push_str(set);
                text.push('\n');
            }
            std::fs::write(&path, text).map_err(|source| ToolError::file_access(&path, source))?;
            sizes.push(sets.len());
        }
        info!(chunks = sizes.len(), sets = self.num_params, "Wrote parameter chunks");
        Ok(sizes)
    }

    /// The job for one (seed, chunk) pair. `chunk_size` caps how many
    /// sets the simulation reads, so a short final chunk stays in
    /// bounds.
    pub fn job_script(&self, seed: usize, chunk: usize, chunk_size: usize) -> JobScript {
        let mut command = self.simulation.clone();
        for arg in &self.sim_args {
            command.push(' ');
            command.push_str(arg);
        }
        // -M 6 scores all six mutants
        command.push_str(&format!(
            " -p {} -i {} -s {} -M 6 -E {}",
            chunk_size,
            self.chunk_file(chunk).display(),
            seed,
            self.scores_file(seed, chunk).display()
        ));
        JobScript {
            name: "robust-test".to_string(),
            nodes: 1,
            ppn: 1,
            memory: "500mb".to_string(),
            disk: "300mb".to_string(),
            queue: self.queue.clone(),
            output: self.directory.join(format!("output{seed}-{chunk}.txt")),
            walltime: "06:00:00".to_string(),
            command,
        }
    }

    /// Write the chunk files and every job file. Returns the job paths
    /// in submission order, all of one seed before the next.
    pub fn prepare(&self) -> Result<Vec<PathBuf>> {
        let sizes = self.write_chunks()?;
        let mut jobs = Vec::new();
        for seed_index in 0..self.seeds {
            let seed = (seed_index + 1) * 1000;
            for (chunk, &size) in sizes.iter().enumerate() {
                let path = self.job_file(seed, chunk);
                self.job_script(seed, chunk, size).write_to(&path)?;
                jobs.push(path);
            }
        }
        Ok(jobs)
    }

    /// Hand already-written job files to the queue. Returns how many
    /// the queue accepted.
    pub async fn submit_paths(&self, queue: &QueueCli, jobs: &[PathBuf]) -> Result<usize> {
        let mut accepted = 0;
        for job in jobs {
            if queue.submit(job).await?.accepted {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Prepare and hand every job to the queue. Returns how many the
    /// queue accepted.
    pub async fn submit_all(&self, queue: &QueueCli) -> Result<usize> {
        let jobs = self.prepare()?;
        let accepted = self.submit_paths(queue, &jobs).await?;
        info!(accepted, total = jobs.len(), "Seed batch submitted");
        Ok(accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(dir: &tempfile::TempDir) -> SeedBatch {
        let input = dir.path().join("good.params");
        std::fs::write(&input, "a\nb\nc\nd\ne\n").unwrap();
        SeedBatch {
            input,
            num_params: 5,
            pars_per_job: 2,
            directory: dir.path().join("robust"),
            simulation: "./simulation".to_string(),
            sim_args: vec!["-u".to_string()],
            seeds: 2,
            queue: "biomath".to_string(),
        }
    }

    #[test]
    fn chunks_split_the_requested_sets() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch(&dir);
        let sizes = batch.write_chunks().unwrap();
        assert_eq!(sizes, vec![2, 2, 1]);
        let first = std::fs::read_to_string(batch.chunk_file(0)).unwrap();
        assert_eq!(first, "a\nb\n");
        let last = std::fs::read_to_string(batch.chunk_file(2)).unwrap();
        assert_eq!(last, "e\n");
    }

    #[test]
    fn short_input_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut batch = batch(&dir);
        batch.num_params = 9;
        assert!(batch.write_chunks().is_err());
        batch.num_params = 5;
        batch.pars_per_job = 0;
        assert!(batch.write_chunks().is_err());
    }

    #[test]
    fn job_points_the_simulation_at_its_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch(&dir);
        let script = batch.job_script(1000, 2, 1);
        assert_eq!(script.name, "robust-test");
        assert_eq!(script.walltime, "06:00:00");
        let chunk = batch.chunk_file(2).display().to_string();
        let scores = batch.scores_file(1000, 2).display().to_string();
        assert!(script.command.starts_with("./simulation -u "));
        assert!(script
            .command
            .ends_with(&format!("-p 1 -i {chunk} -s 1000 -M 6 -E {scores}")));
    }

    #[test]
    fn jobs_cover_every_seed_and_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch(&dir);
        let jobs = batch.prepare().unwrap();
        let names: Vec<_> = jobs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec![
                "pbs-job-1000-0",
                "pbs-job-1000-1",
                "pbs-job-1000-2",
                "pbs-job-2000-0",
                "pbs-job-2000-1",
                "pbs-job-2000-2",
            ]
        );
        let text = std::fs::read_to_string(&jobs[0]).unwrap();
        assert!(text.contains("#PBS -N robust-test\n"));
        assert!(text.contains("-s 1000"));
    }

    #[tokio::test]
    async fn submit_counts_accepted_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let batch = batch(&dir);
        let queue = QueueCli::with_commands("true", "true", "true");
        let accepted = batch.submit_all(&queue).await.unwrap();
        assert_eq!(accepted, 6);
    }
}
