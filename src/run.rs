//! The two end-to-end analysis workflows: fan sensitivity runs out
//! across workers, wait for the data files they leave behind, then turn
//! those files into figures and spreadsheets.

use std::path::PathBuf;

use crate::analysis::{num_check, param_label, parse_feature_file, sanitize, sense_stats, FeatureTable};
use crate::config::DispatchConfig;
use crate::dispatch::{partition, Dispatcher, SetRange, WorkerTemplate};
use crate::error::{Result, ToolError};
use crate::plot::{elasticity_lines, sensitivity_bars, write_bar_data, YBounds};

/// An elasticity run perturbs this fixed number of parameter
/// dimensions, one `dim_<n>` data file each.
const ELASTIC_DIMS: usize = 44;

/// Options shared by the sensitivity and elasticity workflows.
#[derive(Debug, Clone)]
pub struct SenseOptions {
    /// File of nominal parameter sets the analysis perturbs.
    pub nominal_file: PathBuf,
    /// How many nominal sets the file holds.
    pub nominal_count: usize,
    /// Where the analysis program writes its data files.
    pub data_dir: PathBuf,
    /// Where the figures go.
    pub image_dir: PathBuf,
    /// Maximum perturbation as a percentage of the nominal value.
    pub percent: u32,
    /// Perturbation steps on each side of the nominal value.
    pub points: u32,
    /// Plot one oscillation feature instead of all of them.
    pub feature: Option<usize>,
    /// The sensitivity analysis executable.
    pub analysis_exec: PathBuf,
    /// The simulation executable the analysis drives.
    pub sim_exec: PathBuf,
    /// Extra arguments forwarded to the analysis program verbatim.
    pub extra_args: Vec<String>,
    /// Skip the runs and graph data files that already exist.
    pub graph_only: bool,
    pub y_bounds: YBounds,
    pub dispatch: DispatchConfig,
}

/// Run the sensitivity analysis over every nominal set, then draw one
/// bar chart per oscillation feature from the normalized and absolute
/// sensitivity files.
pub async fn run_sensitivity(options: &SenseOptions) -> Result<()> {
    ensure_dirs(options)?;

    if !options.graph_only {
        let template = worker_template(options, false);
        let ranges = partition(options.nominal_count, options.dispatch.workers);
        let report = Dispatcher::new(options.dispatch.clone())
            .run(&template.commands(&ranges, None))
            .await?;
        tracing::info!(
            workers = report.workers,
            elapsed_ms = report.elapsed_ms,
            "Sensitivity runs complete"
        );
    }

    tracing::info!("Generating sensitivity graphs");
    graph_sensitivity(options, "normalized", true)?;
    graph_sensitivity(options, "LSA", false)?;
    Ok(())
}

/// Run the analysis in data-generation mode for every nominal set, then
/// draw the perturbed-over-nominal line plots for every parameter and
/// feature combination.
pub async fn run_elasticity(options: &SenseOptions) -> Result<()> {
    ensure_dirs(options)?;

    if !options.graph_only {
        collect_elasticity(options).await?;
        tracing::info!("Elasticity data collection complete");
    }

    tracing::info!("Generating elasticity graphs");
    graph_elasticity(options)
}

fn ensure_dirs(options: &SenseOptions) -> Result<()> {
    std::fs::create_dir_all(&options.data_dir)
        .map_err(|e| ToolError::file_access(&options.data_dir, e))?;
    std::fs::create_dir_all(&options.image_dir)
        .map_err(|e| ToolError::file_access(&options.image_dir, e))
}

/// The invocation both workflows share. On top of this template each
/// worker receives its share of the nominal sets as `-c <count>
/// -k <start>`, and elasticity workers a `-D <dir>` output directory.
fn worker_template(options: &SenseOptions, generate_only: bool) -> WorkerTemplate {
    let mut trailing = Vec::new();
    if generate_only {
        trailing.push("--generate-only".to_string());
    }
    trailing.push("-p".to_string());
    trailing.push(options.percent.to_string());
    trailing.push("-P".to_string());
    trailing.push(options.points.to_string());
    trailing.extend(options.extra_args.iter().cloned());
    // The analysis program hands everything after -a to the simulation,
    // so the argument list always closes with it.
    if !options.extra_args.iter().any(|arg| arg == "-a") {
        trailing.push("-a".to_string());
    }

    WorkerTemplate {
        program: options.analysis_exec.clone(),
        fixed_args: vec![
            "-n".to_string(),
            options.nominal_file.display().to_string(),
            "-d".to_string(),
            options.data_dir.display().to_string(),
            "-l".to_string(),
            options.dispatch.ppn.to_string(),
            "-e".to_string(),
            options.sim_exec.display().to_string(),
        ],
        trailing_args: trailing,
        log_stem: "sensitivity".to_string(),
    }
}

/// Draw the bar charts for one family of sensitivity files
/// (`normalized_<set>` or `LSA_<set>`) and dump the plotted numbers to
/// a spreadsheet next to the data.
fn graph_sensitivity(options: &SenseOptions, stem: &str, normalized: bool) -> Result<()> {
    let mut tables = Vec::with_capacity(options.nominal_count);
    for set in 0..options.nominal_count {
        tables.push(parse_feature_file(&options.data_dir.join(format!("{stem}_{set}")))?);
    }
    let Some(first) = tables.first() else {
        return Err(ToolError::BadFormat {
            what: "sensitivity data",
            detail: "no nominal sets to graph".to_string(),
        });
    };
    let names = first.names.clone();
    let params = first.params();

    let selected: Vec<usize> = match options.feature {
        Some(feature) => vec![feature],
        None => (0..names.len()).collect(),
    };

    let mut plotted_names = Vec::with_capacity(selected.len());
    let mut means = Vec::with_capacity(selected.len());
    let mut errors = Vec::with_capacity(selected.len());
    for &feature in &selected {
        let stats = sense_stats(&tables, feature)?;
        let name = sanitize(&names[feature]);
        let (file, y_label) = if normalized {
            (format!("{name}.png"), "Normalized Sensitivity (%)")
        } else {
            (format!("absolute_{name}.png"), "Absolute Sensitivity")
        };
        sensitivity_bars(
            &options.image_dir.join(file),
            &name,
            y_label,
            &stats.means,
            &stats.stdevs,
            options.y_bounds,
        )?;
        plotted_names.push(names[feature].clone());
        means.push(stats.means);
        errors.push(stats.stdevs);
    }
    tracing::info!(features = plotted_names.len(), stem, "Sensitivity bar charts written");

    let csv = if normalized {
        "bar_graph_data_normalized.csv"
    } else {
        "bar_graph_data_absolute.csv"
    };
    let labels: Vec<String> = (0..params).map(param_label).collect();
    write_bar_data(&options.data_dir.join(csv), &plotted_names, &means, &errors, &labels)
}

fn elastic_dir(options: &SenseOptions, set: usize) -> PathBuf {
    options.data_dir.join(format!("elastic_data_{set}"))
}

/// Dispatch one analysis instance per nominal set so the per-set output
/// directories never collide, in batches of at most the worker count.
async fn collect_elasticity(options: &SenseOptions) -> Result<()> {
    let template = worker_template(options, true);
    let dispatcher = Dispatcher::new(options.dispatch.clone());
    let batch_size = options.dispatch.workers.max(1);

    let mut batch = Vec::with_capacity(batch_size);
    for set in 0..options.nominal_count {
        batch.push(set);
        if batch.len() == batch_size || set + 1 == options.nominal_count {
            let ranges: Vec<SetRange> = batch
                .iter()
                .map(|&start| SetRange { start, count: 1 })
                .collect();
            let dirs: Vec<PathBuf> = batch.iter().map(|&set| elastic_dir(options, set)).collect();
            dispatcher.run(&template.commands(&ranges, Some(&dirs))).await?;
            batch.clear();
        }
    }
    Ok(())
}

/// Load every per-set `dim_<n>` and `nominal_0` file and draw one line
/// plot per parameter and feature combination.
fn graph_elasticity(options: &SenseOptions) -> Result<()> {
    let mut dims_by_set = Vec::with_capacity(options.nominal_count);
    let mut nominals = Vec::with_capacity(options.nominal_count);
    for set in 0..options.nominal_count {
        let dir = elastic_dir(options, set);
        let mut dims = Vec::with_capacity(ELASTIC_DIMS);
        for dim in 0..ELASTIC_DIMS {
            dims.push(parse_feature_file(&dir.join(format!("dim_{dim}")))?);
        }
        dims_by_set.push(dims);
        nominals.push(parse_feature_file(&dir.join("nominal_0"))?);
    }
    let Some(first) = dims_by_set.first() else {
        return Err(ToolError::BadFormat {
            what: "elasticity data",
            detail: "no nominal sets to graph".to_string(),
        });
    };
    let names = first[0].names.clone();
    let points = options.points as usize;

    for parameter in 0..ELASTIC_DIMS {
        for (feature, name) in names.iter().enumerate() {
            let sets = perturbation_ratios(&dims_by_set, &nominals, parameter, feature, points)?;
            let file = format!("{}_{parameter}on{feature}.png", sanitize(name));
            elasticity_lines(
                &options.image_dir.join(file),
                name,
                &format!("{} perturbation (%)", param_label(parameter)),
                options.percent as f64,
                points,
                &sets,
                options.y_bounds,
            )?;
        }
    }
    tracing::info!(
        parameters = ELASTIC_DIMS,
        features = names.len(),
        "Elasticity plots written"
    );
    Ok(())
}

/// The perturbed-over-nominal ratios for one parameter and feature, one
/// series per nominal set. The middle point is the nominal itself, so
/// every series is `2 * points + 1` long and centered on 1.
fn perturbation_ratios(
    dims_by_set: &[Vec<FeatureTable>],
    nominals: &[FeatureTable],
    parameter: usize,
    feature: usize,
    points: usize,
) -> Result<Vec<Vec<f64>>> {
    let mut sets = Vec::with_capacity(dims_by_set.len());
    for (set, dims) in dims_by_set.iter().enumerate() {
        let nominal = nominal_value(&nominals[set], set, feature)?;
        let table = &dims[parameter];
        if table.values.len() < 2 * points {
            return Err(ToolError::BadFormat {
                what: "elasticity data",
                detail: format!(
                    "dim_{parameter} of set {set} has {} perturbation rows, expected {}",
                    table.values.len(),
                    2 * points
                ),
            });
        }
        let ratio = |row: usize| -> Result<f64> {
            let value = table.values[row].get(feature).copied().ok_or_else(|| {
                ToolError::BadFormat {
                    what: "elasticity data",
                    detail: format!("dim_{parameter} of set {set} is missing feature {feature}"),
                }
            })?;
            Ok(num_check(value / nominal))
        };

        let mut series = Vec::with_capacity(2 * points + 1);
        for row in 0..points {
            series.push(ratio(row)?);
        }
        series.push(1.0);
        for row in points..2 * points {
            series.push(ratio(row)?);
        }
        sets.push(series);
    }
    Ok(sets)
}

fn nominal_value(table: &FeatureTable, set: usize, feature: usize) -> Result<f64> {
    table
        .values
        .first()
        .and_then(|row| row.get(feature))
        .copied()
        .ok_or_else(|| ToolError::BadFormat {
            what: "elasticity data",
            detail: format!("nominal_0 of set {set} is missing feature {feature}"),
        })
}
