//! Command-line entry point for scalar, GPU and benchmark simulation runs.
//!
//! - `gbmsim scalar` runs the sequential backend and prints timing and terminal statistics.
//! - `gbmsim gpu` runs the compute backend.
//! - `gbmsim bench` compares both over the configured path counts.
//! - `gbmsim plot` runs the compute backend and writes projected plot points as CSV.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use gbmsim::bench::BenchmarkOutcome;
use gbmsim::config::SimulationConfig;
use gbmsim::core::{Result, SimulationError, SimulationParameters, TerminalSummary};
use gbmsim::engines::gpu::{GpuContext, PointCloud, ResultRenderer};

#[derive(Parser)]
#[command(name = "gbmsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = "gbmsim.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides applied on top of the configured parameters.
#[derive(clap::Args, Debug, Default)]
struct ParamArgs {
    /// Initial asset price
    #[arg(long)]
    entry_price: Option<f64>,

    /// Annualised drift
    #[arg(long)]
    average_return: Option<f64>,

    /// Annualised volatility
    #[arg(long)]
    volatility: Option<f64>,

    /// Time steps per path
    #[arg(long)]
    days: Option<usize>,

    /// Number of simulated paths
    #[arg(short = 'n', long)]
    paths: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the sequential CPU backend
    Scalar {
        #[command(flatten)]
        params: ParamArgs,

        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Run the GPU compute backend
    Gpu {
        #[command(flatten)]
        params: ParamArgs,
    },

    /// Compare both backends over several path counts
    Bench {
        /// Path counts to benchmark (defaults to the configured sizes)
        #[arg(short, long, value_delimiter = ',')]
        sizes: Vec<usize>,
    },

    /// Run the GPU backend and write plot points as CSV
    Plot {
        #[command(flatten)]
        params: ParamArgs,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, retryable = e.is_retryable(), "gbmsim failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = SimulationConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Scalar { params, seed } => {
            let params = resolve_params(&config, &params)?;
            let mut engine = config.scalar_engine();
            if seed.is_some() {
                engine.seed = seed;
            }
            let run = engine.run(&params)?;
            println!("scalar time: {:.4} ms", run.elapsed_ms);
            print_summary(&run.paths.summary());
        }
        Commands::Gpu { params } => {
            let params = resolve_params(&config, &params)?;
            let mut ctx = acquire_device(&config)?;
            let run = config.parallel_engine().run_blocking(&mut ctx, &params)?;
            println!(
                "gpu time: {:.4} ms ({} workgroups)",
                run.elapsed_ms,
                run.geometry.group_count()
            );
            print_summary(&run.prices.summary());
        }
        Commands::Bench { sizes } => {
            let sizes = if sizes.is_empty() {
                config.benchmark.sizes.clone()
            } else {
                sizes
            };
            let runner = config.benchmark_runner()?;
            let mut ctx = acquire_device(&config)?;
            let report = runner.run_blocking(&mut ctx, &sizes);

            println!(
                "{:>10}  {:>14}  {:>14}  {:>8}",
                "paths", "scalar (ms)", "gpu (ms)", "speedup"
            );
            for outcome in &report.outcomes {
                match outcome {
                    BenchmarkOutcome::Completed(r) => println!(
                        "{:>10}  {:>14.4}  {:>14.4}  {:>7.2}x",
                        r.path_count, r.scalar_time_ms, r.parallel_time_ms, r.speedup_ratio
                    ),
                    BenchmarkOutcome::Failed {
                        path_count,
                        stage,
                        error,
                    } => println!("{path_count:>10}  failed in {stage} backend: {error}"),
                }
            }
        }
        Commands::Plot { params, output } => {
            let params = resolve_params(&config, &params)?;
            let mut ctx = acquire_device(&config)?;
            let run = config.parallel_engine().run_blocking(&mut ctx, &params)?;

            let mut cloud = PointCloud::new(config.render.price_divisor);
            let count = cloud.render(&run.prices, params.path_count());
            let written = match &output {
                Some(path) => File::create(path)
                    .and_then(|f| cloud.write_csv(BufWriter::new(f))),
                None => cloud.write_csv(io::stdout().lock()),
            };
            written.map_err(|e| SimulationError::Io(format!("writing plot points: {e}")))?;
            info!(points = count, "plot points written");
        }
    }

    io::stdout().flush().ok();
    Ok(())
}

fn acquire_device(config: &SimulationConfig) -> Result<GpuContext> {
    let ctx = GpuContext::new_blocking(&config.gpu.options())?;
    let adapter = ctx.adapter_info();
    info!(
        adapter = %adapter.name,
        backend = ?adapter.backend,
        driver = %adapter.driver,
        "running on compute adapter"
    );
    Ok(ctx)
}

fn resolve_params(config: &SimulationConfig, args: &ParamArgs) -> Result<SimulationParameters> {
    let base = config.parameters()?;
    SimulationParameters::new(
        args.entry_price.unwrap_or(base.entry_price()),
        args.average_return.unwrap_or(base.average_return()),
        args.volatility.unwrap_or(base.volatility()),
        args.days.unwrap_or(base.days()),
        args.paths.unwrap_or(base.path_count()),
    )
}

fn print_summary(summary: &TerminalSummary) {
    println!(
        "terminal prices: n={} mean={:.4} sd={:.4} min={:.4} max={:.4}",
        summary.count, summary.mean, summary.std_dev, summary.min, summary.max
    );
}
