use std::path::Path;

use crate::error::{parse_float, Result, ToolError};

/// Axis labels for the 45-rate simulation runs.
pub const PARAM_NAMES: [&str; 45] = [
    "MSH1", "MSH7", "MSH13", "MSDELTA", "MDH1", "MDH7", "MDH13", "MDDELTA", "PSH1", "PSH7",
    "PSH13", "PSDELTA", "PDH1", "PDH7", "PDH13", "PDDELTA", "DAH1H1", "DAH1H7", "DAH1H13",
    "DAH7H7", "DAH7H13", "DAH13H13", "DDIH1H1", "DDIH1H7", "DDIH1H13", "DDIH7H7", "DDIH7H13",
    "DDIH13H13", "DDGH1H1", "DDGH1H7", "DDGH1H13", "DDGH7H7", "DDGH7H13", "DDGH13H13",
    "DELAYMH1", "DELAYMH7", "DELAYMH13", "DELAYMDELTA", "DELAYPH1", "DELAYPH7", "DELAYPH13",
    "DELAYPDELTA", "CRITPH1H1", "CRITPH7H13", "CRITPDELTA",
];

/// The label for parameter `p`, falling back to the index for layouts
/// wider than the named 45.
pub fn param_label(p: usize) -> String {
    match PARAM_NAMES.get(p) {
        Some(name) => (*name).to_string(),
        None => p.to_string(),
    }
}

/// Clamp the values the simulation uses as failure markers: infinite
/// sensitivities become 500 and NaN becomes 1.
pub fn num_check(value: f64) -> f64 {
    if value.is_infinite() {
        500.0
    } else if value.is_nan() {
        1.0
    } else {
        value
    }
}

/// Replace anything that does not belong in a file name with `_`.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// One sensitivity output file: a header of feature names, then one row
/// of feature values per perturbed parameter.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    pub names: Vec<String>,
    /// Indexed `[parameter][feature]`.
    pub values: Vec<Vec<f64>>,
}

impl FeatureTable {
    pub fn params(&self) -> usize {
        self.values.len()
    }

    pub fn features(&self) -> usize {
        self.names.len()
    }
}

/// Parse a sensitivity data file. Rows end in a PASSED/FAILED marker
/// which is skipped; a marker that shows up among the values is read
/// as zero.
pub fn parse_feature_file(path: &Path) -> Result<FeatureTable> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| ToolError::file_access(path, e))?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or_else(|| ToolError::BadFormat {
        what: "sensitivity data",
        detail: format!("{} is empty", path.display()),
    })?;
    let names: Vec<String> = header
        .split(',')
        .skip(1)
        .map(|cell| cell.trim())
        .filter(|cell| !cell.is_empty())
        .map(|cell| cell.to_string())
        .collect();

    let mut values = Vec::new();
    for line in lines {
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() < names.len() + 1 {
            return Err(ToolError::BadFormat {
                what: "sensitivity data",
                detail: format!(
                    "row has {} cells but the header names {} features",
                    cells.len(),
                    names.len()
                ),
            });
        }
        let mut row = Vec::with_capacity(names.len());
        for cell in &cells[1..=names.len()] {
            if cell.contains("PASSED") || cell.contains("FAILED") {
                row.push(0.0);
            } else {
                row.push(num_check(parse_float(cell)?));
            }
        }
        values.push(row);
    }
    Ok(FeatureTable { names, values })
}

/// Per-parameter mean and standard deviation of one feature across the
/// nominal sets.
#[derive(Debug, Clone)]
pub struct FeatureStats {
    pub means: Vec<f64>,
    pub stdevs: Vec<f64>,
}

pub fn sense_stats(tables: &[FeatureTable], feature: usize) -> Result<FeatureStats> {
    let first = tables.first().ok_or_else(|| ToolError::BadFormat {
        what: "sensitivity data",
        detail: "no nominal sets to average over".to_string(),
    })?;
    let params = first.params();
    for table in tables {
        if table.params() != params {
            return Err(ToolError::BadFormat {
                what: "sensitivity data",
                detail: format!(
                    "nominal sets disagree on parameter count: {} vs {}",
                    params,
                    table.params()
                ),
            });
        }
        if feature >= table.features() {
            return Err(ToolError::BadFormat {
                what: "sensitivity data",
                detail: format!(
                    "feature {} out of range, file has {}",
                    feature,
                    table.features()
                ),
            });
        }
    }

    let count = tables.len() as f64;
    let mut means = vec![0.0; params];
    let mut stdevs = vec![0.0; params];
    for p in 0..params {
        means[p] = tables.iter().map(|t| t.values[p][feature]).sum::<f64>() / count;
        let sum_sq: f64 = tables
            .iter()
            .map(|t| (t.values[p][feature] - means[p]).powi(2))
            .sum();
        stdevs[p] = (sum_sq / count).sqrt();
    }
    Ok(FeatureStats { means, stdevs })
}
