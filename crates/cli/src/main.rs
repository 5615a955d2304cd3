//! spatialstats CLI - spatial autocorrelation statistics from JSON inputs

mod input;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use spatialstats_algorithms::statistics::{
    BivariateMoran, Geary, GetisOrd, GlobalStatistic, GlobalSummary, LocalBivariateMoran,
    LocalGeary, LocalMoran, LocalStatistic, Moran, MultivariateGeary, DEFAULT_PERMUTATIONS,
};
use spatialstats_core::{Error, MemorySource, WeightsMatrix};
use spatialstats_parallel::ProcessingMode;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "spatialstats")]
#[command(author, version, about = "Spatial autocorrelation statistics", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a weights file
    Info {
        /// Weights JSON file
        #[arg(short, long)]
        weights: PathBuf,
    },
    /// Global statistics: one value for the whole dataset
    Global {
        #[arg(value_enum)]
        statistic: GlobalKind,
        #[command(flatten)]
        args: StatArgs,
    },
    /// Local statistics: one value per observation
    Local {
        #[arg(value_enum)]
        statistic: LocalKind,
        #[command(flatten)]
        args: StatArgs,
        /// Getis-Ord only: force G* (true) or G (false) instead of detecting
        /// it from the weights diagonal
        #[arg(long)]
        star: Option<bool>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum GlobalKind {
    Moran,
    Geary,
    BivariateMoran,
}

#[derive(Clone, Copy, ValueEnum)]
enum LocalKind {
    Moran,
    GetisOrd,
    Geary,
    BivariateMoran,
    MultivariateGeary,
}

#[derive(Args)]
struct StatArgs {
    /// Weights JSON file
    #[arg(short, long)]
    weights: PathBuf,
    /// Values JSON file
    #[arg(long)]
    values: PathBuf,
    /// Field to analyze; bivariate statistics take x then y, multivariate
    /// Geary takes any number
    #[arg(short, long = "field", required = true)]
    fields: Vec<String>,
    /// Number of random permutations
    #[arg(short, long, default_value_t = DEFAULT_PERMUTATIONS)]
    permutations: usize,
    /// Seed for reproducible permutations
    #[arg(short, long)]
    seed: Option<u64>,
    /// Row-standardize the weights before computing
    #[arg(long)]
    standardize: bool,
    /// Worker threads (1 = sequential, default = all cores)
    #[arg(short, long)]
    threads: Option<usize>,
    /// Also report expectation, variance and z-score where a closed form exists
    #[arg(long)]
    analytic: bool,
}

// ─── Output ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WeightsInfo {
    n: usize,
    nnz: usize,
    total_weight: f64,
    trace: f64,
    islands: usize,
}

#[derive(Serialize)]
struct Analytic<T> {
    expectation: T,
    variance: T,
    z: T,
}

#[derive(Serialize)]
struct GlobalReport {
    statistic: &'static str,
    n: usize,
    permutations: usize,
    seed: Option<u64>,
    #[serde(flatten)]
    summary: GlobalSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    analytic: Option<Analytic<f64>>,
}

#[derive(Serialize)]
struct LocalRow {
    key: String,
    stat: f64,
    p: f64,
    group: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    analytic: Option<Analytic<f64>>,
}

#[derive(Serialize)]
struct LocalReport {
    statistic: &'static str,
    n: usize,
    permutations: usize,
    seed: Option<u64>,
    observations: Vec<LocalRow>,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .context("Invalid progress template")?,
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

struct Inputs {
    weights: WeightsMatrix<String>,
    values: MemorySource<String>,
}

impl Inputs {
    fn load(args: &StatArgs) -> Result<Self> {
        let weights = input::read_weights(&args.weights)?;
        let weights = if args.standardize {
            weights.standardize()
        } else {
            weights
        };
        let values = input::read_values(&args.values)?;
        info!("Loaded {} observations", weights.n());
        Ok(Self { weights, values })
    }
}

fn single_field(args: &StatArgs) -> Result<&str> {
    match args.fields.as_slice() {
        [field] => Ok(field.as_str()),
        _ => bail!("Expected exactly one --field, got {}", args.fields.len()),
    }
}

fn field_pair(args: &StatArgs) -> Result<(&str, &str)> {
    match args.fields.as_slice() {
        [x, y] => Ok((x.as_str(), y.as_str())),
        _ => bail!("Expected two --field values (x then y), got {}", args.fields.len()),
    }
}

/// Treat a missing closed form as absent instead of fatal
fn optional<T>(result: spatialstats_core::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e @ (Error::NotImplemented { .. } | Error::NotComputable { .. })) => {
            warn!("{}", e);
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

fn global_analytic<S: GlobalStatistic>(stat: &mut S) -> Result<Option<Analytic<f64>>> {
    let Some(expectation) = optional(stat.expectation())? else {
        return Ok(None);
    };
    let Some(variance) = optional(stat.variance())? else {
        return Ok(None);
    };
    let z = optional(stat.z_score())?.unwrap_or(f64::NAN);
    Ok(Some(Analytic {
        expectation,
        variance,
        z,
    }))
}

fn local_analytic<S: LocalStatistic>(stat: &mut S) -> Result<Option<Analytic<Vec<f64>>>> {
    let Some(expectation) = optional(stat.expectation())? else {
        return Ok(None);
    };
    let Some(variance) = optional(stat.variance())? else {
        return Ok(None);
    };
    let z = stat.z_score()?;
    Ok(Some(Analytic {
        expectation,
        variance,
        z,
    }))
}

// ─── Runners ────────────────────────────────────────────────────────────

fn report_global<S: GlobalStatistic>(mut stat: S, args: &StatArgs) -> Result<GlobalReport> {
    stat.set_processing_mode(ProcessingMode::from_threads(args.threads));

    let pb = spinner(&format!("{}: {} permutations", S::NAME, args.permutations))?;
    let start = Instant::now();
    let summary = stat
        .summary(args.permutations, args.seed)
        .with_context(|| format!("Failed to compute {}", S::NAME))?;
    pb.finish_and_clear();
    info!("{} computed in {:.2?}", S::NAME, start.elapsed());

    let analytic = if args.analytic {
        global_analytic(&mut stat)?
    } else {
        None
    };

    Ok(GlobalReport {
        statistic: S::NAME,
        n: stat.n(),
        permutations: args.permutations,
        seed: args.seed,
        summary,
        analytic,
    })
}

fn report_local<S>(mut stat: S, args: &StatArgs) -> Result<LocalReport>
where
    S: LocalStatistic<Key = String>,
{
    stat.set_processing_mode(ProcessingMode::from_threads(args.threads));

    let pb = spinner(&format!(
        "{}: {} conditional permutations x {} observations",
        S::NAME,
        args.permutations,
        stat.n()
    ))?;
    let start = Instant::now();
    let summary = stat
        .summary(args.permutations, args.seed)
        .with_context(|| format!("Failed to compute {}", S::NAME))?;
    pb.finish_and_clear();
    info!("{} computed in {:.2?}", S::NAME, start.elapsed());

    let analytic = if args.analytic {
        local_analytic(&mut stat)?
    } else {
        None
    };

    let observations = summary
        .into_iter()
        .enumerate()
        .map(|(i, s)| LocalRow {
            key: s.key,
            stat: s.stat,
            p: s.p,
            group: s.group.label(),
            analytic: analytic.as_ref().map(|a| Analytic {
                expectation: a.expectation[i],
                variance: a.variance[i],
                z: a.z[i],
            }),
        })
        .collect();

    Ok(LocalReport {
        statistic: S::NAME,
        n: stat.n(),
        permutations: args.permutations,
        seed: args.seed,
        observations,
    })
}

fn run_global(kind: GlobalKind, args: &StatArgs) -> Result<GlobalReport> {
    let inputs = Inputs::load(args)?;
    let w = &inputs.weights;

    match kind {
        GlobalKind::Moran => {
            let mut stat = Moran::new(w);
            stat.resolve_x(&inputs.values, single_field(args)?)?;
            report_global(stat, args)
        }
        GlobalKind::Geary => {
            let mut stat = Geary::new(w);
            stat.resolve_x(&inputs.values, single_field(args)?)?;
            report_global(stat, args)
        }
        GlobalKind::BivariateMoran => {
            let (x, y) = field_pair(args)?;
            let mut stat = BivariateMoran::new(w);
            stat.resolve_x(&inputs.values, x)?;
            stat.resolve_y(&inputs.values, y)?;
            report_global(stat, args)
        }
    }
}

fn run_local(kind: LocalKind, args: &StatArgs, star: Option<bool>) -> Result<LocalReport> {
    let inputs = Inputs::load(args)?;
    let w = &inputs.weights;

    if star.is_some() && !matches!(kind, LocalKind::GetisOrd) {
        warn!("--star only applies to getis-ord; ignoring");
    }

    match kind {
        LocalKind::Moran => {
            let mut stat = LocalMoran::new(w);
            stat.resolve_x(&inputs.values, single_field(args)?)?;
            report_local(stat, args)
        }
        LocalKind::GetisOrd => {
            let mut stat = match star {
                Some(star) => GetisOrd::with_star(w, star),
                None => GetisOrd::new(w),
            };
            info!("Getis-Ord variant: {}", if stat.is_star() { "G*" } else { "G" });
            stat.resolve_x(&inputs.values, single_field(args)?)?;
            report_local(stat, args)
        }
        LocalKind::Geary => {
            let mut stat = LocalGeary::new(w);
            stat.resolve_x(&inputs.values, single_field(args)?)?;
            report_local(stat, args)
        }
        LocalKind::BivariateMoran => {
            let (x, y) = field_pair(args)?;
            let mut stat = LocalBivariateMoran::new(w);
            stat.resolve_x(&inputs.values, x)?;
            stat.resolve_y(&inputs.values, y)?;
            report_local(stat, args)
        }
        LocalKind::MultivariateGeary => {
            let fields: Vec<&str> = args.fields.iter().map(String::as_str).collect();
            let mut stat = MultivariateGeary::new(w);
            stat.resolve_fields(&inputs.values, &fields)?;
            report_local(stat, args)
        }
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { weights } => {
            let w = input::read_weights(&weights)?;
            let islands = (0..w.n())
                .filter(|&i| w.neighbors(i).map(|row| row.is_empty()).unwrap_or(false))
                .count();
            let report = WeightsInfo {
                n: w.n(),
                nnz: w.sparse().nnz(),
                total_weight: w.total_weight(),
                trace: w.trace(),
                islands,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Global { statistic, args } => {
            let report = run_global(statistic, &args)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Commands::Local {
            statistic,
            args,
            star,
        } => {
            let report = run_local(statistic, &args, star)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
