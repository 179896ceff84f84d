//! reimburse CLI - compute a travel reimbursement
//!
//! Loads tuned coefficients from `coefficients.toml` (or the built-in seed
//! values when the file is absent) and either prices a single trip or
//! scores the formula against a labeled case file.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use reimburse::persist::{DEFAULT_COEFFICIENTS_FILE, load_or_default};
use reimburse::training::Scorer;
use reimburse::{TripInput, TuneConfig, dataset};

/// Compute a travel reimbursement from trip duration, mileage and receipts
///
/// Examples:
///   reimburse 3 93 1.42                    # Price one trip
///   reimburse --cases public_cases.json    # Score the formula on labeled cases
#[derive(Parser, Debug)]
#[command(name = "reimburse")]
#[command(version)]
#[command(about, long_about = None)]
pub struct Cli {
    /// Trip duration in days
    #[arg(value_name = "DAYS", requires_all = ["miles", "receipts"])]
    pub days: Option<f64>,

    /// Miles traveled
    #[arg(value_name = "MILES")]
    pub miles: Option<f64>,

    /// Total receipts amount
    #[arg(value_name = "RECEIPTS")]
    pub receipts: Option<f64>,

    /// Tuned coefficients file
    ///
    /// Falls back to the built-in seed values when the file does not exist.
    #[arg(long, value_name = "PATH", default_value = DEFAULT_COEFFICIENTS_FILE)]
    pub coefficients: PathBuf,

    /// Score the formula against a labeled cases file instead
    #[arg(long, value_name = "FILE", conflicts_with = "days")]
    pub cases: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let (coefficients, from_file) = load_or_default(&cli.coefficients)?;
    tracing::debug!(path = %cli.coefficients.display(), from_file, "coefficients ready");

    if let Some(cases) = &cli.cases {
        let examples = dataset::load_examples(cases)?;
        let card = Scorer::new(&examples, TuneConfig::default().exact_tolerance).evaluate_all(&coefficients);
        println!("Score:      {:.2}", card.score);
        println!("Avg error:  {:.2}", card.avg_error);
        println!("Exact:      {}/{}", card.exact, card.count);
        println!("Max error:  {:.2}", card.max_error);
        return Ok(());
    }

    let (Some(days), Some(miles), Some(receipts)) = (cli.days, cli.miles, cli.receipts) else {
        bail!("Usage: reimburse <DAYS> <MILES> <RECEIPTS>  (or --cases FILE)");
    };

    let amount = TripInput::new(days, miles, receipts).predict(&coefficients);
    println!("{:.2}", amount);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_single_trip() {
        let cli = Cli::parse_from(["reimburse", "3", "93", "1.42"]);
        assert_eq!(cli.days, Some(3.0));
        assert_eq!(cli.miles, Some(93.0));
        assert_eq!(cli.receipts, Some(1.42));
        assert_eq!(cli.coefficients, PathBuf::from("coefficients.toml"));
        assert!(cli.cases.is_none());
    }

    #[test]
    fn test_cli_cases_mode() {
        let cli = Cli::parse_from(["reimburse", "--cases", "public_cases.json"]);
        assert_eq!(cli.cases, Some(PathBuf::from("public_cases.json")));
        assert!(cli.days.is_none());
    }

    #[test]
    fn test_cli_custom_coefficients() {
        let cli = Cli::parse_from(["reimburse", "--coefficients", "/tmp/c.toml", "1", "2", "3"]);
        assert_eq!(cli.coefficients, PathBuf::from("/tmp/c.toml"));
    }

    #[test]
    fn test_cli_partial_trip_rejected() {
        assert!(Cli::try_parse_from(["reimburse", "3", "93"]).is_err());
    }

    #[test]
    fn test_cli_cases_conflicts_with_trip() {
        assert!(Cli::try_parse_from(["reimburse", "--cases", "x.json", "1", "2", "3"]).is_err());
    }
}
