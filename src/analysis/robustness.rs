use std::path::{Path, PathBuf};

use crate::error::{parse_float, Result, ToolError};

/// Where the score files live and what counts as a pass.
///
/// Score files are named `scores-<seed>-<chunk>.csv` with seeds numbered
/// `1000, 2000, ...` the way the batch runner hands them out.
#[derive(Debug, Clone)]
pub struct RobustnessConfig {
    pub seeds: usize,
    pub sets: usize,
    pub files: usize,
    pub scores_dir: PathBuf,
    pub max_score: f64,
}

/// Count, per parameter set, how many seeds it passed. A set passes a
/// seed when the total score, the last column of its row, equals the
/// max score. A trailing comma on a row is tolerated.
pub fn count_passes(config: &RobustnessConfig) -> Result<Vec<usize>> {
    let mut counts = vec![0usize; config.sets];
    let mut rows_seen = None;
    for seed_index in 0..config.seeds {
        let seed = (seed_index + 1) * 1000;
        let mut set_index = 0;
        for chunk in 0..config.files {
            let path = config.scores_dir.join(format!("scores-{}-{}.csv", seed, chunk));
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ToolError::file_access(&path, e))?;
            // first line is the header
            for line in text.lines().skip(1) {
                if line.trim().is_empty() {
                    continue;
                }
                if set_index >= config.sets {
                    return Err(ToolError::BadFormat {
                        what: "score files",
                        detail: format!(
                            "seed {} has more than {} score rows",
                            seed, config.sets
                        ),
                    });
                }
                let total = line
                    .rsplit(',')
                    .find(|cell| !cell.trim().is_empty())
                    .unwrap_or("");
                if parse_float(total)? == config.max_score {
                    counts[set_index] += 1;
                }
                set_index += 1;
            }
        }
        match rows_seen {
            None => rows_seen = Some(set_index),
            Some(expected) if expected != set_index => {
                return Err(ToolError::BadFormat {
                    what: "score files",
                    detail: format!(
                        "seed {} scored {} sets but an earlier seed scored {}",
                        seed, set_index, expected
                    ),
                });
            }
            Some(_) => {}
        }
    }
    counts.truncate(rows_seen.unwrap_or(0));
    Ok(counts)
}

/// Copy every set that passed at least `threshold` seeds from the
/// original sets file to the output, line for line. Returns how many
/// survived.
pub fn write_robust_sets(
    input: &Path,
    output: &Path,
    counts: &[usize],
    threshold: usize,
) -> Result<usize> {
    let text = std::fs::read_to_string(input)
        .map_err(|e| ToolError::file_access(input, e))?;
    let mut survivors = String::new();
    let mut kept = 0;
    for (line, &count) in text.lines().zip(counts) {
        if count >= threshold {
            survivors.push_str(line);
            survivors.push('\n');
            kept += 1;
        }
    }
    std::fs::write(output, survivors).map_err(|e| ToolError::file_access(output, e))?;
    Ok(kept)
}
