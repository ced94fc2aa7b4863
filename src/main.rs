use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::{error, warn};

use skeltune::config::{RunnerConfig, TrialParameters};
use skeltune::io::{write_vessel_and_centerline, SkeletonData};
use skeltune::operations::query::ComputeMetrics;
use skeltune::runner::{compare_point_clouds, TrialRunner};

#[derive(Parser)]
#[command(name = "skeltune")]
#[command(version, about = "Skeletonization hyperparameter trials and skeleton metrics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one trial over every input mesh and report its score
    Trial {
        /// Runner configuration (YAML)
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Trial parameters as JSON, or @FILE
        #[arg(short, long, value_name = "JSON")]
        params: String,

        /// Trial identifier used for the output directory
        #[arg(long, env = "NNI_TRIAL_JOB_ID", default_value = "local")]
        trial_id: String,
    },

    /// Compute skeleton metrics of one skeleton JSON file
    Metrics {
        /// Skeleton data JSON
        #[arg(value_name = "JSON")]
        input: PathBuf,

        /// Average degree to report when there are no bifurcations
        #[arg(long, value_name = "FLOAT")]
        fallback_degree: Option<f64>,
    },

    /// Export vessel and centerline VTK files from a skeleton JSON file
    Vtk {
        /// Skeleton data JSON
        #[arg(value_name = "JSON")]
        input: PathBuf,

        /// Case name used for the output file names
        #[arg(long)]
        case: String,

        /// Output directory
        #[arg(short, long, value_name = "DIR", default_value = ".")]
        out: PathBuf,
    },

    /// Score a skeleton against a reference centerline with the comparison tool
    Compare {
        /// Runner configuration (YAML) supplying the executable and timeout
        #[arg(short, long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Comparison executable, overriding `compare_exe` from the configuration
        #[arg(long, value_name = "EXE")]
        exe: Option<PathBuf>,

        /// Skeleton data JSON
        json: PathBuf,

        /// Reference centerline VTK
        vtk: PathBuf,

        /// Seconds before the comparison is killed [default: configured timeout]
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn main() -> ExitCode {
    // Default: WARN for everything, INFO for skeltune.
    // Override with RUST_LOG (e.g. RUST_LOG=skeltune=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("skeltune=info".parse().unwrap_or_default());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> skeltune::Result<()> {
    match command {
        Commands::Trial {
            config,
            params,
            trial_id,
        } => {
            let handle = RunnerConfig::load_or_default(config.as_deref())?;
            for warning in &handle.warnings {
                warn!("{warning}");
            }
            let params = TrialParameters::parse(&params)?;
            let outcome = TrialRunner::from_config(handle.config).run(&trial_id, &params)?;
            println!("{}", outcome.final_result);
        }
        Commands::Metrics {
            input,
            fallback_degree,
        } => {
            let graph = SkeletonData::load(&input)?.to_graph()?;
            let mut query = ComputeMetrics::new();
            if let Some(degree) = fallback_degree {
                query = query.with_fallback_degree(degree);
            }
            let metrics = query.execute(&graph)?;
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        Commands::Vtk { input, case, out } => {
            let data = SkeletonData::load(&input)?;
            std::fs::create_dir_all(&out)?;
            let (vessel, centerline) = write_vessel_and_centerline(&data, &case, &out)?;
            println!("{}", vessel.display());
            println!("{}", centerline.display());
        }
        Commands::Compare {
            config,
            exe,
            json,
            vtk,
            timeout,
        } => {
            let handle = RunnerConfig::load_or_default(config.as_deref())?;
            for warning in &handle.warnings {
                warn!("{warning}");
            }
            let exe = handle.config.resolve_compare_exe(exe)?;
            let timeout = Duration::from_secs(timeout.unwrap_or(handle.config.timeout_secs));
            let score = compare_point_clouds(&exe, &json, &vtk, timeout);
            println!("{score}");
        }
    }
    Ok(())
}
