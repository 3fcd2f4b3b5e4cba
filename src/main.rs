use clap::{Parser, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use somite_tools::analysis::{
    count_passes, extract_good_sets, feature_buckets, feature_file, posterior_mean,
    read_feature_points, read_sync_grid, sync_file, sync_stats, write_robust_sets, FeatsSeries,
    RobustnessConfig, TissueFeature,
};
use somite_tools::batch::{GradientBatch, SeedBatch};
use somite_tools::config::{DispatchConfig, DispatchMode};
use somite_tools::cons::read_cons;
use somite_tools::error::{Result, ToolError};
use somite_tools::params::{convert_file, read_float_sets, read_ranges, refine, write_ranges};
use somite_tools::pbs::QueueCli;
use somite_tools::plot::{
    average_trace, build_density_table, cell_traces, error_bar_chart, palette::MUTANTS,
    render_density, render_snapshots, write_mutant_csv, DensityOptions, LegendCorner,
    MutantSeries, YBounds,
};
use somite_tools::run::{run_elasticity, run_sensitivity, SenseOptions};

#[derive(Parser, Debug)]
#[command(name = "somite")]
#[command(version)]
#[command(about = "Analysis and cluster tooling for a segmentation clock simulator")]
#[command(propagate_version = true)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Perturbation analyses: run the simulations, then graph them
    Run {
        #[command(subcommand)]
        command: RunCommands,
    },

    /// Queue large simulation batches
    Batch {
        #[command(flatten)]
        report: ReportArgs,

        #[command(subcommand)]
        command: BatchCommands,
    },

    /// Parameter-set file chores
    Sets {
        #[command(flatten)]
        report: ReportArgs,

        #[command(subcommand)]
        command: SetsCommands,
    },

    /// Graph simulation output
    Plot {
        #[command(subcommand)]
        command: PlotCommands,
    },
}

// =============================================================================
// Run Arguments
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum RunCommands {
    /// Perturb every parameter around each nominal set and chart how
    /// strongly each oscillation feature reacts
    Sensitivity(SenseArgs),

    /// Chart each feature against the size of a single-parameter
    /// perturbation, one curve per nominal set
    Elasticity(SenseArgs),
}

#[derive(Parser, Debug)]
struct SenseArgs {
    /// File of nominal parameter sets, one set per line
    #[arg(long, short = 'n', default_value = "nominal.params")]
    nominal_file: PathBuf,

    /// How many sets from the nominal file to analyze
    #[arg(long, short = 'c', default_value = "1")]
    nominal_count: usize,

    /// Largest perturbation, as a percentage of each nominal value
    #[arg(long, short = 'p', default_value = "20")]
    percent: u32,

    /// Perturbation steps on each side of the nominal value
    #[arg(long, short = 'P', default_value = "4")]
    points: u32,

    /// Chart a single feature, by column index, instead of all of them
    #[arg(long, short = 'f')]
    feature: Option<usize>,

    /// The sensitivity analysis executable
    #[arg(long, short = 'e', default_value = "./sensitivity")]
    exec: PathBuf,

    /// The simulation executable the analysis drives
    #[arg(long, short = 's', default_value = "./simulation")]
    sim: PathBuf,

    /// Directory the charts are written to
    #[arg(long, short = 'd', default_value = "plots")]
    image_dir: PathBuf,

    /// Directory the analysis programs write their data files to
    #[arg(long, short = 'D', default_value = "sense-for-plot")]
    data_dir: PathBuf,

    /// Lower bound for the chart's y axis
    #[arg(long)]
    ymin: Option<f64>,

    /// Upper bound for the chart's y axis
    #[arg(long)]
    ymax: Option<f64>,

    /// Skip the simulation runs and graph data files that already exist
    #[arg(long, short = 'g')]
    graph_only: bool,

    #[command(flatten)]
    dispatch: DispatchArgs,

    /// Extra arguments handed through to the analysis program, after --
    #[arg(last = true)]
    sim_args: Vec<String>,
}

impl SenseArgs {
    fn options(&self) -> SenseOptions {
        SenseOptions {
            nominal_file: self.nominal_file.clone(),
            nominal_count: self.nominal_count,
            data_dir: self.data_dir.clone(),
            image_dir: self.image_dir.clone(),
            percent: self.percent,
            points: self.points,
            feature: self.feature,
            analysis_exec: self.exec.clone(),
            sim_exec: self.sim.clone(),
            extra_args: self.sim_args.clone(),
            graph_only: self.graph_only,
            y_bounds: YBounds::new(self.ymin, self.ymax),
            dispatch: self.dispatch.config(),
        }
    }
}

#[derive(Parser, Debug)]
struct DispatchArgs {
    /// Number of workers to fan the nominal sets out across
    #[arg(long, short = 'N', default_value = "1")]
    nodes: usize,

    /// Batch queue to submit workers to; omit to run them as local
    /// child processes
    #[arg(long, short = 'C')]
    cluster_name: Option<String>,

    /// Job name the queue listing is scanned for
    #[arg(long, short = 'j', default_value = "PLOT_SA")]
    job_name: String,

    /// Processors requested per queued worker
    #[arg(long, short = 'l', default_value = "2")]
    ppn: u32,

    /// Directory the generated job files are written to
    #[arg(long, default_value = ".")]
    job_dir: PathBuf,
}

impl DispatchArgs {
    fn config(&self) -> DispatchConfig {
        let mode = match &self.cluster_name {
            Some(queue) => DispatchMode::Queued {
                queue: queue.clone(),
            },
            None => DispatchMode::Local,
        };
        DispatchConfig::new(self.nodes, mode)
            .with_job_name(self.job_name.clone())
            .with_job_dir(self.job_dir.clone())
            .with_ppn(self.ppn)
    }
}

// =============================================================================
// Batch Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum BatchCommands {
    /// Rerun the same parameter sets under several random seeds
    Seeds(SeedsArgs),

    /// Rerun the same parameter sets under perturbed gradient files
    Gradients(GradientsArgs),
}

#[derive(Parser, Debug)]
struct SeedsArgs {
    /// Parameter sets to rerun
    #[arg(long, short = 'i')]
    input_file: PathBuf,

    /// Values per parameter set
    #[arg(long, short = 'n')]
    num_params: usize,

    /// Parameter sets per queued job
    #[arg(long, short = 'p')]
    pars_per_job: usize,

    /// Directory the chunked set files and job files are written to
    #[arg(long, short = 'd')]
    directory: PathBuf,

    /// Simulation executable each job runs
    #[arg(long, short = 's')]
    simulation: String,

    /// How many seeds to rerun each chunk under
    #[arg(long, short = 'S')]
    seeds: usize,

    /// Queue the jobs are submitted to
    #[arg(long, default_value = "biomath")]
    queue: String,

    /// Write the job files without submitting them
    #[arg(long)]
    prepare_only: bool,

    /// Extra arguments handed through to the simulation, after --
    #[arg(last = true)]
    sim_args: Vec<String>,
}

#[derive(Parser, Debug)]
struct GradientsArgs {
    /// Parameter sets to rerun
    #[arg(long, short = 's')]
    sets: PathBuf,

    /// Directory the gradient files and job files are written to
    #[arg(long, short = 'o')]
    output_dir: PathBuf,

    /// Gradient file the perturbed copies are derived from
    #[arg(long, short = 'g')]
    base_gradients: Option<PathBuf>,

    /// Simulation executable each job runs
    #[arg(long, short = 'S', default_value = "./simulation")]
    simulation: String,

    /// Queue the jobs are submitted to
    #[arg(long, default_value = "biomath")]
    queue: String,

    /// Write the job files without submitting them
    #[arg(long)]
    prepare_only: bool,

    /// Extra arguments handed through to the simulation, after --
    #[arg(last = true)]
    sim_args: Vec<String>,
}

// =============================================================================
// Sets Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum SetsCommands {
    /// Rewrite a parameter-set file at a different parameter count
    Convert {
        /// File to read sets from
        input: PathBuf,

        /// File to write the converted sets to
        output: PathBuf,

        /// Values per set in the output
        num_params: usize,
    },

    /// Narrow a ranges file around the sets that survived a search
    Refine(RefineArgs),

    /// Count the seeds each set passed under and keep the robust ones
    Robustness(RobustnessArgs),

    /// Pull the good sets out of an evolutionary-search log
    ExtractGood {
        /// Search log to scan
        input: PathBuf,

        /// File to write the sets to
        output: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct RefineArgs {
    /// Parameter sets the new ranges are fitted to
    #[arg(long, short = 's')]
    sets: PathBuf,

    /// Ranges file being refined
    #[arg(long, short = 'c')]
    current_ranges: PathBuf,

    /// Where the refined ranges are written
    #[arg(long, short = 'n')]
    new_ranges: PathBuf,

    /// Standard deviations kept on each side of the mean
    #[arg(long, short = 'd', default_value = "2")]
    standard_dev: f64,

    /// Decimal places the new bounds are rounded to
    #[arg(long, short = 'r', default_value = "5")]
    round_to: i32,
}

#[derive(Parser, Debug)]
struct RobustnessArgs {
    /// How many seeds each set was rerun under
    #[arg(long, short = 'S')]
    seeds: usize,

    /// How many parameter sets were scored
    #[arg(long, short = 'n')]
    num_sets: usize,

    /// How many score files each seed's run was split into
    #[arg(long, short = 'f')]
    num_files: usize,

    /// Directory holding the score files
    #[arg(long, short = 'd')]
    directory: PathBuf,

    /// Largest total score that still counts as a pass
    #[arg(long, short = 'm')]
    max_score: f64,

    /// Parameter-set file the scores belong to
    #[arg(long, short = 'i')]
    input_file: PathBuf,

    /// Keep sets that passed under at least this many seeds
    #[arg(long, short = 't')]
    threshold: usize,

    /// Where the surviving sets are written
    #[arg(long, short = 'o')]
    output_file: PathBuf,
}

// =============================================================================
// Plot Commands
// =============================================================================

#[derive(clap::Subcommand, Debug)]
enum PlotCommands {
    /// Trace each cell's concentration over time, plus the tissue average
    Cells(CellsArgs),

    /// Error-bar charts of period and amplitude across the tissue,
    /// one line per mutant
    Features(FeaturesArgs),

    /// Error-bar chart of synchronization across the tissue, one line
    /// per mutant
    Sync(SyncArgs),

    /// Density map of the tissue as it grows
    Densities(DensitiesArgs),

    /// One tissue image per recorded time step
    Snapshots(SnapshotsArgs),
}

#[derive(Parser, Debug)]
struct CellsArgs {
    /// Concentrations file to read
    cons_file: PathBuf,

    /// Directory the images are written to
    directory: PathBuf,

    /// Base name for the images
    image_name: String,

    /// Minutes per time step
    step_size: f64,
}

#[derive(Parser, Debug)]
struct FeaturesArgs {
    /// Directory of per-mutant feature files
    folder: PathBuf,

    /// How many parameter sets were run per mutant
    parsets: usize,

    /// Base name for the chart images
    image_name: String,

    /// Which feature to chart: period, amplitude, or all
    feature: String,

    /// Directory the charts and spreadsheets are written to
    ofolder: PathBuf,

    /// Width in cells of the posterior region
    post_width: usize,

    /// Base name for the spreadsheet files
    excel_name: String,
}

#[derive(Parser, Debug)]
struct SyncArgs {
    /// Directory of per-mutant synchronization files
    folder: PathBuf,

    /// How many parameter sets were run per mutant
    parsets: usize,

    /// Directory the chart and spreadsheet are written to
    ofolder: PathBuf,

    /// Name for the chart image
    image_name: String,

    /// Base name for the spreadsheet file
    excel_name: String,
}

#[derive(Parser, Debug)]
struct DensitiesArgs {
    /// Concentrations file to read
    #[arg(long, short = 'c')]
    cons_file: PathBuf,

    /// Name of the image, written as <name>.png
    #[arg(long, short = 'f', default_value = "densities")]
    figure_name: String,

    /// Image width in pixels
    #[arg(long, short = 'w', default_value = "1000")]
    image_width: u32,

    /// Image height in pixels
    #[arg(long, short = 'H', default_value = "250")]
    image_height: u32,

    /// Time step the tissue starts growing at
    #[arg(long, short = 'G', default_value = "60000")]
    steps_til_growth: usize,

    /// Time steps between cell splits while growing
    #[arg(long, short = 'S', default_value = "600")]
    steps_to_split: usize,

    /// Tissue width before growth begins
    #[arg(long, short = 'n', default_value = "10")]
    initial_width: usize,

    /// Keep every n-th time step
    #[arg(long, short = 'g', default_value = "1")]
    granularity: usize,

    /// First time step to include
    #[arg(long, short = 's', default_value = "0")]
    start_step: usize,

    /// Last time step to include
    #[arg(long, short = 'e', default_value = "60000")]
    end_step: usize,
}

#[derive(Parser, Debug)]
struct SnapshotsArgs {
    /// Concentrations file to read
    cons_file: PathBuf,

    /// Directory the snapshot images are written to
    directory: PathBuf,
}

// =============================================================================
// Output Format
// =============================================================================

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Output format
    #[arg(long, default_value = "table")]
    output: OutputFormat,
}

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

// =============================================================================
// JSON Output Types
// =============================================================================

#[derive(Serialize)]
struct ConvertOutput {
    sets_converted: usize,
    values_per_set: usize,
}

#[derive(Serialize)]
struct RefineOutput {
    sets_read: usize,
    ranges_written: usize,
}

#[derive(Serialize)]
struct RobustnessOutput {
    sets_checked: usize,
    survivors: usize,
    threshold: usize,
}

#[derive(Serialize)]
struct GoodSetsOutput {
    sets_found: usize,
}

#[derive(Serialize)]
struct BatchOutput {
    jobs_written: usize,
    jobs_submitted: Option<usize>,
}

// =============================================================================
// Helper Functions
// =============================================================================

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| ToolError::BadFormat {
        what: "json output",
        detail: e.to_string(),
    })?;
    println!("{text}");
    Ok(())
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| ToolError::file_access(dir, e))
}

fn read_mutant_features(
    folder: &Path,
    mutant: &str,
    parsets: usize,
    feature: TissueFeature,
) -> Result<Vec<FeatsSeries>> {
    (0..parsets)
        .map(|set| read_feature_points(&feature_file(folder, mutant, set, feature)))
        .collect()
}

fn bucket_points(indexes: &[f64], averages: &[f64], stderr: &[f64]) -> Vec<(f64, f64, f64)> {
    indexes
        .iter()
        .zip(averages)
        .zip(stderr)
        .map(|((&x, &y), &e)| (x, y, e))
        .collect()
}

fn report_batch(written: usize, submitted: Option<usize>, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&BatchOutput {
            jobs_written: written,
            jobs_submitted: submitted,
        }),
        OutputFormat::Table => {
            match submitted {
                Some(accepted) => println!("Submitted {accepted} of {written} job files"),
                None => println!("Wrote {written} job files"),
            }
            Ok(())
        }
    }
}

// =============================================================================
// Batch Command Handlers
// =============================================================================

async fn handle_batch_seeds(args: &SeedsArgs, format: &OutputFormat) -> Result<()> {
    let batch = SeedBatch {
        input: args.input_file.clone(),
        num_params: args.num_params,
        pars_per_job: args.pars_per_job,
        directory: args.directory.clone(),
        simulation: args.simulation.clone(),
        sim_args: args.sim_args.clone(),
        seeds: args.seeds,
        queue: args.queue.clone(),
    };
    let jobs = batch.prepare()?;
    let submitted = if args.prepare_only {
        None
    } else {
        Some(batch.submit_paths(&QueueCli::new(), &jobs).await?)
    };
    report_batch(jobs.len(), submitted, format)
}

async fn handle_batch_gradients(args: &GradientsArgs, format: &OutputFormat) -> Result<()> {
    let mut batch = GradientBatch::new(args.sets.clone(), args.output_dir.clone());
    batch.base_gradients = args.base_gradients.clone();
    batch.simulation = args.simulation.clone();
    batch.sim_args = args.sim_args.clone();
    batch.queue = args.queue.clone();
    let jobs = batch.prepare()?;
    let submitted = if args.prepare_only {
        None
    } else {
        Some(batch.submit_paths(&QueueCli::new(), &jobs).await?)
    };
    report_batch(jobs.len(), submitted, format)
}

// =============================================================================
// Sets Command Handlers
// =============================================================================

fn handle_sets_convert(
    input: &Path,
    output: &Path,
    num_params: usize,
    format: &OutputFormat,
) -> Result<()> {
    let converted = convert_file(input, output, num_params)?;
    match format {
        OutputFormat::Json => print_json(&ConvertOutput {
            sets_converted: converted,
            values_per_set: num_params,
        }),
        OutputFormat::Table => {
            println!("Converted {converted} sets to {num_params} values each");
            Ok(())
        }
    }
}

fn handle_sets_refine(args: &RefineArgs, format: &OutputFormat) -> Result<()> {
    let ranges = read_ranges(&args.current_ranges)?;
    let sets = read_float_sets(&args.sets)?;
    let refined = refine(&ranges, &sets, args.standard_dev, args.round_to)?;
    write_ranges(&args.new_ranges, &refined)?;
    match format {
        OutputFormat::Json => print_json(&RefineOutput {
            sets_read: sets.len(),
            ranges_written: refined.len(),
        }),
        OutputFormat::Table => {
            println!(
                "Refined {} ranges around {} sets into {}",
                refined.len(),
                sets.len(),
                args.new_ranges.display()
            );
            Ok(())
        }
    }
}

fn handle_sets_robustness(args: &RobustnessArgs, format: &OutputFormat) -> Result<()> {
    let config = RobustnessConfig {
        seeds: args.seeds,
        sets: args.num_sets,
        files: args.num_files,
        scores_dir: args.directory.clone(),
        max_score: args.max_score,
    };
    let counts = count_passes(&config)?;
    let survivors =
        write_robust_sets(&args.input_file, &args.output_file, &counts, args.threshold)?;
    match format {
        OutputFormat::Json => print_json(&RobustnessOutput {
            sets_checked: counts.len(),
            survivors,
            threshold: args.threshold,
        }),
        OutputFormat::Table => {
            println!(
                "{} of {} sets passed under at least {} seeds",
                survivors,
                counts.len(),
                args.threshold
            );
            Ok(())
        }
    }
}

fn handle_sets_extract_good(input: &Path, output: &Path, format: &OutputFormat) -> Result<()> {
    let found = extract_good_sets(input, output)?;
    match format {
        OutputFormat::Json => print_json(&GoodSetsOutput { sets_found: found }),
        OutputFormat::Table => {
            println!("Found {} good sets in {}", found, input.display());
            Ok(())
        }
    }
}

// =============================================================================
// Plot Command Handlers
// =============================================================================

fn handle_plot_cells(args: &CellsArgs) -> Result<()> {
    let data = read_cons(&args.cons_file)?;
    ensure_dir(&args.directory)?;
    let traces = args.directory.join(format!("{}.png", args.image_name));
    let average = args.directory.join(format!("{}_avg.png", args.image_name));
    cell_traces(&traces, &data, args.step_size)?;
    average_trace(&average, &args.image_name, &data, args.step_size)?;
    tracing::info!(
        cells = data.cells(),
        steps = data.steps.len(),
        "Cell traces written"
    );
    Ok(())
}

fn handle_plot_features(args: &FeaturesArgs) -> Result<()> {
    ensure_dir(&args.ofolder)?;
    for feature in TissueFeature::selection(&args.feature) {
        let normalizer = {
            let wildtype = read_mutant_features(&args.folder, MUTANTS[0], args.parsets, feature)?;
            posterior_mean(&wildtype, args.post_width)?
        };

        let mut header = Vec::new();
        let mut series = Vec::new();
        let mut rows = Vec::new();
        let mut x_max = 0.0;
        for (color, mutant) in MUTANTS.iter().enumerate() {
            let files = read_mutant_features(&args.folder, mutant, args.parsets, feature)?;
            let buckets = feature_buckets(&files, args.post_width, normalizer, feature)?;
            if color == 0 {
                header = buckets.all_indexes.clone();
            }
            x_max = buckets.x_max;
            series.push(MutantSeries {
                name: (*mutant).to_string(),
                color,
                points: bucket_points(&buckets.indexes, &buckets.averages, &buckets.stderr),
            });
            rows.push(((*mutant).to_string(), buckets.averages, buckets.stderr));
        }

        let image = args
            .ofolder
            .join(format!("{}_{}.png", args.image_name, feature.label()));
        error_bar_chart(&image, x_max, &series, LegendCorner::UpperLeft)?;
        let sheet = args
            .ofolder
            .join(format!("{}-{}.csv", args.excel_name, feature.label()));
        write_mutant_csv(&sheet, &header, &rows)?;
        tracing::info!(
            feature = feature.label(),
            mutants = MUTANTS.len(),
            "Feature chart written"
        );
    }
    Ok(())
}

fn handle_plot_sync(args: &SyncArgs) -> Result<()> {
    ensure_dir(&args.ofolder)?;
    let mut header = Vec::new();
    let mut series = Vec::new();
    let mut rows = Vec::new();
    let mut x_max = 0.0;
    for (color, mutant) in MUTANTS.iter().enumerate() {
        let grids = (0..args.parsets)
            .map(|set| read_sync_grid(&sync_file(&args.folder, mutant, set)))
            .collect::<Result<Vec<_>>>()?;
        let stats = sync_stats(&grids)?;
        if color == 0 {
            header = stats.indexes.clone();
        }
        x_max = stats.x_max;
        series.push(MutantSeries {
            name: (*mutant).to_string(),
            color,
            points: bucket_points(&stats.indexes, &stats.averages, &stats.stderr),
        });
        rows.push(((*mutant).to_string(), stats.averages, stats.stderr));
    }

    let image = args.ofolder.join(format!("{}.png", args.image_name));
    error_bar_chart(&image, x_max, &series, LegendCorner::LowerLeft)?;
    let sheet = args.ofolder.join(format!("{}-sync.csv", args.excel_name));
    write_mutant_csv(&sheet, &header, &rows)?;
    tracing::info!(mutants = MUTANTS.len(), "Synchronization chart written");
    Ok(())
}

fn handle_plot_densities(args: &DensitiesArgs) -> Result<()> {
    let data = read_cons(&args.cons_file)?;
    let options = DensityOptions {
        steps_til_growth: args.steps_til_growth,
        steps_to_split: args.steps_to_split,
        initial_width: args.initial_width,
        granularity: args.granularity,
        start_step: args.start_step,
        end_step: args.end_step,
    };
    let table = build_density_table(&data, &options)?;
    let image = PathBuf::from(format!("{}.png", args.figure_name));
    render_density(&image, &table, args.image_width, args.image_height)?;
    tracing::info!(
        image = %image.display(),
        rows = table.rows.len(),
        "Density map written"
    );
    Ok(())
}

fn handle_plot_snapshots(args: &SnapshotsArgs) -> Result<()> {
    let data = read_cons(&args.cons_file)?;
    ensure_dir(&args.directory)?;
    let images = render_snapshots(&args.directory, &data)?;
    tracing::info!(images = images.len(), "Tissue snapshots written");
    Ok(())
}

// =============================================================================
// Main Entry Point
// =============================================================================

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    if let Err(err) = run(args).await {
        eprintln!("Error: {err}");
        std::process::exit(err.exit_code());
    }
}

async fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Run { command } => match command {
            RunCommands::Sensitivity(args) => run_sensitivity(&args.options()).await?,
            RunCommands::Elasticity(args) => run_elasticity(&args.options()).await?,
        },
        Commands::Batch { report, command } => match command {
            BatchCommands::Seeds(args) => handle_batch_seeds(&args, &report.output).await?,
            BatchCommands::Gradients(args) => handle_batch_gradients(&args, &report.output).await?,
        },
        Commands::Sets { report, command } => match command {
            SetsCommands::Convert {
                input,
                output,
                num_params,
            } => handle_sets_convert(&input, &output, num_params, &report.output)?,
            SetsCommands::Refine(args) => handle_sets_refine(&args, &report.output)?,
            SetsCommands::Robustness(args) => handle_sets_robustness(&args, &report.output)?,
            SetsCommands::ExtractGood { input, output } => {
                handle_sets_extract_good(&input, &output, &report.output)?
            }
        },
        Commands::Plot { command } => match command {
            PlotCommands::Cells(args) => handle_plot_cells(&args)?,
            PlotCommands::Features(args) => handle_plot_features(&args)?,
            PlotCommands::Sync(args) => handle_plot_sync(&args)?,
            PlotCommands::Densities(args) => handle_plot_densities(&args)?,
            PlotCommands::Snapshots(args) => handle_plot_snapshots(&args)?,
        },
    }
    Ok(())
}
