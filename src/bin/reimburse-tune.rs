//! reimburse-tune: coefficient calibrator
//!
//! Fits the reimbursement formula's coefficients to labeled cases by
//! simulated annealing with restarts, then persists them on success.
//!
//! ## Usage
//!
//! ```bash
//! # Default search against public_cases.json
//! reimburse-tune
//!
//! # Parallel restarts, regenerate private results on success
//! reimburse-tune --jobs 4 --results-cases private_cases.json
//!
//! # Continue from a previous run's coefficients
//! reimburse-tune --start-from coefficients.toml --restarts 3
//! ```
//!
//! ## Outputs (success only)
//!
//! ```text
//! coefficients.toml     # [coefficients] table read by `reimburse`
//! README.md             # **Score:** line patched in place
//! private_results.txt   # one prediction per line, with --results-cases
//! ```
//!
//! A failed calibration prints the best score seen and exits with status 1,
//! leaving every file untouched.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use tracing_subscriber::EnvFilter;

use reimburse::persist::{self, DEFAULT_COEFFICIENTS_FILE};
use reimburse::training::{Calibrator, ProgressReporter, plot_history};
use reimburse::{Coefficients, TuneConfig, dataset};

#[derive(Parser, Debug)]
#[command(name = "reimburse-tune")]
#[command(about = "Calibrate reimbursement coefficients by simulated annealing")]
struct Args {
    /// Labeled cases to fit against
    #[arg(long, default_value = "public_cases.json")]
    cases: PathBuf,

    /// Settings file (defaults to ./reimburse.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Iteration cap per restart
    #[arg(long)]
    iterations: Option<usize>,

    /// Number of restarts
    #[arg(long)]
    restarts: Option<usize>,

    /// Restarts to run in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Base seed; restart r uses seed + r
    #[arg(long)]
    seed: Option<u64>,

    /// Clip polisher moves to coefficient bounds
    #[arg(long)]
    clip_polish: bool,

    /// Seed the search from an existing coefficients file
    #[arg(long, value_name = "PATH")]
    start_from: Option<PathBuf>,

    /// Where to write tuned coefficients
    #[arg(long, default_value = DEFAULT_COEFFICIENTS_FILE)]
    coefficients_out: PathBuf,

    /// Summary file whose score line is patched
    #[arg(long, default_value = "README.md")]
    summary: PathBuf,

    /// Cases to predict with the tuned formula
    #[arg(long, value_name = "FILE")]
    results_cases: Option<PathBuf>,

    /// Output for --results-cases predictions
    #[arg(long, default_value = "private_results.txt")]
    results_out: PathBuf,

    /// Render a PNG of per-restart scores (needs the plotters feature)
    #[arg(long, value_name = "PATH")]
    plot: Option<PathBuf>,

    /// Suppress per-iteration status lines
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Apply command-line overrides on top of file settings.
    fn apply(&self, config: &mut TuneConfig) {
        if let Some(iterations) = self.iterations {
            config.iterations = iterations;
        }
        if let Some(restarts) = self.restarts {
            config.restarts = restarts;
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(seed) = self.seed {
            config.seed_base = seed;
        }
        if self.clip_polish {
            config.clip_polish = true;
        }
    }
}

fn load_config(args: &Args) -> Result<(TuneConfig, Option<PathBuf>)> {
    let (mut config, source) = match &args.config {
        Some(path) => (TuneConfig::load_file(path)?, Some(path.clone())),
        None => TuneConfig::load(Path::new("."))?,
    };
    args.apply(&mut config);
    Ok((config, source))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    println!();
    println!("{}", " REIMBURSE COEFFICIENT CALIBRATION ".bold().on_magenta());
    println!();

    let (config, source) = load_config(&args)?;
    let examples = dataset::load_examples(&args.cases)?;
    let seed = match &args.start_from {
        Some(path) => persist::load_coefficients(path)?,
        None => Coefficients::default(),
    };

    println!("Configuration:");
    println!("   Cases: {} ({} examples)", args.cases.display(), examples.len());
    println!("{}", config.display_summary(source.as_deref()));
    if let Some(path) = &args.start_from {
        println!("   Seed: {}", path.display());
    }
    println!();

    let progress = ProgressReporter::new(!args.quiet, config.progress_interval);
    let calibrator = Calibrator::new(&examples, &config, seed)?.with_progress(progress);
    let outcome = calibrator.run()?;

    outcome.history.final_summary(outcome.success);
    if let Some(path) = &args.plot {
        if let Err(e) = plot_history(&outcome.history, &path.to_string_lossy()) {
            eprintln!("{} plot failed: {}", "warning:".yellow(), e);
        }
    }

    let best = match outcome.best.as_ref().filter(|_| outcome.success) {
        Some(best) => best,
        None => {
            println!("Need more tuning - best so far {:.2}", outcome.reported_train());
            std::process::exit(1);
        }
    };

    persist::save_coefficients(&args.coefficients_out, &best.coefficients)?;
    println!("💾 Coefficients saved to {}", args.coefficients_out.display());

    let card = calibrator.evaluate_all(&best.coefficients);
    if persist::patch_summary(&args.summary, best.scores.train, card.exact, card.count)? {
        println!("📝 Score line updated in {}", args.summary.display());
    }

    if let Some(cases) = &args.results_cases {
        let inputs = dataset::load_inputs(cases)?;
        let predictions: Vec<f64> = inputs.iter().map(|i| i.predict(&best.coefficients)).collect();
        persist::write_results(&args.results_out, &predictions)
            .with_context(|| format!("Failed to generate results for {}", cases.display()))?;
        println!("📄 {} predictions written to {}", predictions.len(), args.results_out.display());
    }

    println!(
        "Final Score: {:.2}  Val: {:.2}  Runtime: {:.2}s",
        best.scores.train,
        best.scores.val,
        outcome.elapsed.as_secs_f64()
    );
    Ok(())
}
