use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{Result, ToolError};

/// A batch-queue job description.
///
/// Holds everything that ends up in a PBS job file; [`JobScript::render`]
/// owns the queue's exact text syntax so no other module has to.
#[derive(Debug, Clone, Serialize)]
pub struct JobScript {
    /// Job name shown in the queue's status listing.
    pub name: String,
    /// Nodes requested.
    pub nodes: u32,
    /// Processors per node requested.
    pub ppn: u32,
    /// Memory limit, e.g. "3GB" or "500mb".
    pub memory: String,
    /// Scratch-disk limit, e.g. "500MB".
    pub disk: String,
    /// Queue (cluster partition) to submit to.
    pub queue: String,
    /// Where the queue should write the job's combined output stream.
    pub output: PathBuf,
    /// Wall-clock limit in hh:mm:ss.
    pub walltime: String,
    /// Command line to run once the job starts.
    pub command: String,
}

impl JobScript {
    /// Serialize into the PBS job-file format.
    ///
    /// Directives come first, one per line; stdout and stderr are joined
    /// (`-j oe`); the command runs from the submission directory via
    /// `cd $PBS_O_WORKDIR`.
    pub fn render(&self) -> String {
        format!(
            "#PBS -N {name}\n\
             #PBS -l nodes={nodes}:ppn={ppn}\n\
             #PBS -l mem={mem}\n\
             #PBS -l file={disk}\n\
             #PBS -q {queue}\n\
             #PBS -j oe\n\
             #PBS -o {output}\n\
             #PBS -l walltime={walltime}\n\
             cd $PBS_O_WORKDIR\n\
             \n\
             {command}\n",
            name = self.name,
            nodes = self.nodes,
            ppn = self.ppn,
            mem = self.memory,
            disk = self.disk,
            queue = self.queue,
            output = self.output.display(),
            walltime = self.walltime,
            command = self.command,
        )
    }

    /// Write the rendered script to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.render()).map_err(|e| ToolError::file_access(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> JobScript {
        JobScript {
            name: "PLOT_SA".to_string(),
            nodes: 1,
            ppn: 2,
            memory: "3GB".to_string(),
            disk: "500MB".to_string(),
            queue: "biomath".to_string(),
            output: PathBuf::from("sensitivity_0.output"),
            walltime: "24:00:00".to_string(),
            command: "./sensitivity -n nominal.params -c 5 -k 0".to_string(),
        }
    }

    #[test]
    fn renders_every_directive() {
        let text = sample().render();
        assert!(text.contains("#PBS -N PLOT_SA\n"));
        assert!(text.contains("#PBS -l nodes=1:ppn=2\n"));
        assert!(text.contains("#PBS -l mem=3GB\n"));
        assert!(text.contains("#PBS -l file=500MB\n"));
        assert!(text.contains("#PBS -q biomath\n"));
        assert!(text.contains("#PBS -j oe\n"));
        assert!(text.contains("#PBS -o sensitivity_0.output\n"));
        assert!(text.contains("#PBS -l walltime=24:00:00\n"));
    }

    #[test]
    fn command_runs_from_submission_directory() {
        let text = sample().render();
        let workdir = text
            .find("cd $PBS_O_WORKDIR")
            .expect("workdir change missing");
        let command = text
            .find("./sensitivity -n nominal.params")
            .expect("command missing");
        assert!(workdir < command);
        assert!(text.ends_with("-k 0\n"));
    }

    #[test]
    fn directives_precede_the_command_block() {
        let text = sample().render();
        let last_directive = text.rfind("#PBS").expect("no directives");
        let workdir = text.find("cd $PBS_O_WORKDIR").expect("no workdir");
        assert!(last_directive < workdir);
    }
}
