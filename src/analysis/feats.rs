//! Readers and statistics for the `.feats` files the simulation dumps:
//! oscillation features sampled per cell position, and the
//! synchronization grid.

use std::path::{Path, PathBuf};

use crate::error::{parse_float, parse_int, Result, ToolError};

/// Positions along the tissue are pooled into this many buckets, the
/// posterior plus eight anterior windows.
pub const FEATURE_BUCKETS: usize = 9;

/// The oscillation features the simulation measures per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TissueFeature {
    Period,
    Amplitude,
}

impl TissueFeature {
    pub fn label(self) -> &'static str {
        match self {
            TissueFeature::Period => "period",
            TissueFeature::Amplitude => "amplitude",
        }
    }

    /// Which features a command-line selector asks for; anything that
    /// is not a single feature name means both.
    pub fn selection(name: &str) -> Vec<TissueFeature> {
        match name {
            "period" => vec![TissueFeature::Period],
            "amplitude" => vec![TissueFeature::Amplitude],
            _ => vec![TissueFeature::Period, TissueFeature::Amplitude],
        }
    }
}

/// Where a mutant's feature measurements for one parameter set live.
pub fn feature_file(folder: &Path, mutant: &str, set: usize, feature: TissueFeature) -> PathBuf {
    folder
        .join(mutant)
        .join(format!("set_{}_{}_mh1.feats", set, feature.label()))
}

/// Where a mutant's synchronization grid for one parameter set lives.
pub fn sync_file(folder: &Path, mutant: &str, set: usize) -> PathBuf {
    folder.join(mutant).join(format!("set_{set}_sync_mh1.feats"))
}

/// One feature file: measurements keyed by cell position.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatsSeries {
    pub height: usize,
    pub width: usize,
    pub points: Vec<(i64, f64)>,
}

fn bad_feats(detail: String) -> ToolError {
    ToolError::BadFormat {
        what: "feature file",
        detail,
    }
}

fn grid_size(cell: &str, what: &str, path: &Path) -> Result<usize> {
    let value = parse_int(cell.trim())?;
    if value < 0 {
        return Err(bad_feats(format!(
            "{} negative {what} in {}",
            value,
            path.display()
        )));
    }
    Ok(value as usize)
}

/// Read a feature file: a `height,width` header, then alternating rows
/// of cell positions and measured values. The cell after the last comma
/// of each row carries no data. A dangling position row without its
/// value row is dropped.
pub fn read_feature_points(path: &Path) -> Result<FeatsSeries> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ToolError::file_access(path, source))?;
    let mut lines = content.lines();
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| bad_feats(format!("{} is empty", path.display())))?
        .split(',')
        .collect();
    if header.len() < 2 {
        return Err(bad_feats(format!(
            "{} is missing the height,width header",
            path.display()
        )));
    }
    let height = grid_size(header[0], "height", path)?;
    let width = grid_size(header[1], "width", path)?;

    let rows: Vec<&str> = lines.collect();
    let mut points = Vec::new();
    for pair in rows.chunks(2) {
        let [positions, values] = pair else { break };
        let position_cells: Vec<&str> = positions.split(',').collect();
        let value_cells: Vec<&str> = values.split(',').collect();
        let cols = position_cells.len().saturating_sub(1);
        if value_cells.len() < cols + 1 {
            return Err(bad_feats(format!(
                "value row with {} cells under {} positions in {}",
                value_cells.len(),
                cols,
                path.display()
            )));
        }
        for col in 0..cols {
            let pos = parse_int(position_cells[col].trim())?;
            let val = parse_float(value_cells[col].trim())?;
            points.push((pos, val));
        }
    }
    Ok(FeatsSeries {
        height,
        width,
        points,
    })
}

/// Mean of every measurement in the posterior, before normalization.
/// The wildtype's value is the normalizer for all mutants.
pub fn posterior_mean(series: &[FeatsSeries], post_width: usize) -> Result<f64> {
    let mut sum = 0.0;
    let mut count = 0usize;
    for file in series {
        for &(pos, val) in &file.points {
            if pos < post_width as i64 {
                sum += val;
                count += 1;
            }
        }
    }
    if count == 0 {
        return Err(bad_feats(
            "no posterior measurements to normalize against".to_string(),
        ));
    }
    Ok(sum / count as f64)
}

/// Bucketed feature statistics for one mutant, normalized against the
/// wildtype posterior.
#[derive(Debug, Clone)]
pub struct FeatureBuckets {
    /// Bucket centers for every bucket, kept or not; the data file
    /// header lists all of them.
    pub all_indexes: Vec<f64>,
    /// Centers, means and standard errors for the kept buckets only.
    pub indexes: Vec<f64>,
    pub averages: Vec<f64>,
    pub stderr: Vec<f64>,
    /// Plots cut off at ninety percent of the tissue width.
    pub x_max: f64,
}

fn bucket_of(pos: i64, post_width: usize, chunk: usize) -> usize {
    if pos < post_width as i64 {
        0
    } else {
        (((pos as usize - post_width) / chunk) + 1).min(FEATURE_BUCKETS - 1)
    }
}

/// Pool one mutant's measurements into position buckets: the whole
/// posterior is the first bucket and the anterior splits into eight
/// windows. Buckets past ninety percent of the tissue are dropped, and
/// so is everything after an anterior window with no period data;
/// amplitude buckets without data stay as zeroes.
pub fn feature_buckets(
    series: &[FeatsSeries],
    post_width: usize,
    normalizer: f64,
    feature: TissueFeature,
) -> Result<FeatureBuckets> {
    let first = series
        .first()
        .ok_or_else(|| bad_feats("no parameter sets to analyze".to_string()))?;
    let width = first.width;
    let chunk = width.saturating_sub(post_width) / (FEATURE_BUCKETS - 1);
    if chunk == 0 {
        return Err(bad_feats(format!(
            "posterior width {post_width} leaves no room in a {width}-cell tissue"
        )));
    }
    if normalizer == 0.0 {
        return Err(bad_feats("the wildtype posterior averages zero".to_string()));
    }

    let mut all_indexes = Vec::with_capacity(FEATURE_BUCKETS);
    for bucket in 0..FEATURE_BUCKETS {
        if bucket == 0 {
            all_indexes.push((post_width / 2) as f64);
        } else {
            all_indexes.push((post_width + (bucket - 1) * chunk) as f64 + chunk as f64 / 2.0);
        }
    }

    let mut averages = vec![0.0f64; FEATURE_BUCKETS];
    let mut counts = vec![0usize; FEATURE_BUCKETS];
    for file in series {
        for &(pos, val) in &file.points {
            let bucket = bucket_of(pos, post_width, chunk);
            averages[bucket] += val / normalizer;
            counts[bucket] += 1;
        }
    }

    let x_max = 0.9 * width as f64;
    let mut kept = FEATURE_BUCKETS;
    for bucket in 0..FEATURE_BUCKETS {
        let window_end =
            post_width as f64 + (bucket as f64 - 1.0) * chunk as f64 + chunk as f64 - 1.0;
        if window_end > x_max {
            kept -= 1;
        } else if counts[bucket] > 0 {
            averages[bucket] /= counts[bucket] as f64;
        } else if feature == TissueFeature::Amplitude {
            averages[bucket] = 0.0;
        } else {
            kept -= 1;
        }
    }

    let mut stderr = vec![0.0f64; FEATURE_BUCKETS];
    for file in series {
        for &(pos, val) in &file.points {
            let bucket = bucket_of(pos, post_width, chunk);
            let dev = val / normalizer - averages[bucket];
            stderr[bucket] += dev * dev;
        }
    }
    for bucket in 0..kept {
        if counts[bucket] > 0 {
            stderr[bucket] =
                (stderr[bucket] / counts[bucket] as f64).sqrt() / (counts[bucket] as f64).sqrt();
        } else {
            stderr[bucket] = 0.0;
        }
    }

    Ok(FeatureBuckets {
        indexes: all_indexes[..kept].to_vec(),
        averages: averages[..kept].to_vec(),
        stderr: stderr[..kept].to_vec(),
        all_indexes,
        x_max,
    })
}

/// One synchronization file: per-column scores over `height` rows.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncGrid {
    pub height: usize,
    pub interval: f64,
    pub columns: usize,
    pub rows: Vec<Vec<f64>>,
}

fn bad_sync(detail: String) -> ToolError {
    ToolError::BadFormat {
        what: "synchronization file",
        detail,
    }
}

/// Read a synchronization grid: a `height,interval` header, then
/// `height` comma-separated rows. The column count comes from the first
/// data row, whose cell after the last comma carries no data.
pub fn read_sync_grid(path: &Path) -> Result<SyncGrid> {
    let content =
        std::fs::read_to_string(path).map_err(|source| ToolError::file_access(path, source))?;
    let mut lines = content.lines();
    let header: Vec<&str> = lines
        .next()
        .ok_or_else(|| bad_sync(format!("{} is empty", path.display())))?
        .split(',')
        .collect();
    if header.len() < 2 {
        return Err(bad_sync(format!(
            "{} is missing the height,interval header",
            path.display()
        )));
    }
    let height = grid_size(header[0], "height", path)?;
    let interval = parse_float(header[1].trim())?;

    let data_rows: Vec<&str> = lines.collect();
    if data_rows.len() < height || height == 0 {
        return Err(bad_sync(format!(
            "{} has {} data rows, expected {height}",
            path.display(),
            data_rows.len()
        )));
    }
    let columns = data_rows[0].split(',').count().saturating_sub(1);
    let mut rows = Vec::with_capacity(height);
    for line in &data_rows[..height] {
        let cells: Vec<&str> = line.split(',').collect();
        if cells.len() < columns {
            return Err(bad_sync(format!(
                "row with {} cells, expected {columns} in {}",
                cells.len(),
                path.display()
            )));
        }
        let mut row = Vec::with_capacity(columns);
        for cell in &cells[..columns] {
            row.push(parse_float(cell.trim())?);
        }
        rows.push(row);
    }
    Ok(SyncGrid {
        height,
        interval,
        columns,
        rows,
    })
}

/// Synchronization means and standard errors per column, pooled over
/// every parameter set of a mutant.
#[derive(Debug, Clone)]
pub struct SyncStats {
    /// Column centers in minutes.
    pub indexes: Vec<f64>,
    pub averages: Vec<f64>,
    pub stderr: Vec<f64>,
    pub x_max: f64,
}

pub fn sync_stats(grids: &[SyncGrid]) -> Result<SyncStats> {
    let first = grids
        .first()
        .ok_or_else(|| bad_sync("no parameter sets to analyze".to_string()))?;
    let height = first.height;
    let columns = first.columns;
    let interval = first.interval;
    for grid in grids {
        if grid.rows.len() < height || grid.columns < columns {
            return Err(bad_sync(format!(
                "grids disagree on the tissue size, {}x{} after {height}x{columns}",
                grid.rows.len(),
                grid.columns
            )));
        }
    }

    let samples = (height * grids.len()) as f64;
    let half = interval / 2.0;
    let mut indexes = Vec::with_capacity(columns);
    let mut averages = vec![0.0f64; columns];
    for col in 0..columns {
        // window midpoint, converted from time steps to minutes
        indexes.push((half * col as f64 * 2.0 + interval) / 2.0 / 6.0);
        for grid in grids {
            for row in &grid.rows[..height] {
                averages[col] += row[col];
            }
        }
        averages[col] /= samples;
    }

    let mut stderr = vec![0.0f64; columns];
    for col in 0..columns {
        for grid in grids {
            for row in &grid.rows[..height] {
                let dev = row[col] - averages[col];
                stderr[col] += dev * dev;
            }
        }
        stderr[col] = (stderr[col] / samples).sqrt() / samples.sqrt();
    }

    Ok(SyncStats {
        indexes,
        averages,
        stderr,
        x_max: (columns + 1) as f64 * half / 6.0,
    })
}
