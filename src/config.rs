//! Calibration settings loaded from reimburse.toml.
//!
//! All search constants live in one `[tune]` table. Keys are kebab-case and
//! every key is optional; anything omitted keeps its default.
//!
//! ## Example
//!
//! ```toml
//! [tune]
//! iterations = 30000
//! restarts = 10
//! start-temperature = 15000.0
//! cooling = 0.97
//! success-threshold = 6500.0
//! jobs = 4
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::formula::Coefficient;

/// Name of the settings file looked up in the working directory.
pub const CONFIG_FILE: &str = "reimburse.toml";

/// Search constants for one calibration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct TuneConfig {
    /// Iteration cap per restart.
    pub iterations: usize,
    /// Number of independent restarts.
    pub restarts: usize,
    /// Temperature at the start of every restart.
    pub start_temperature: f64,
    /// Multiplicative cooling applied after every iteration.
    pub cooling: f64,

    /// Training folds drawn per restart.
    pub folds: usize,
    /// Size of each fold as a fraction of the training pool.
    pub fold_fraction: f64,
    /// Fraction of all examples held out for validation.
    pub validation_fraction: f64,

    /// Coefficients perturbed per proposal.
    pub moves_per_step: usize,
    /// Relative perturbation half-width: values scale by `1 + U(-s, s)`.
    pub step_scale: f64,
    /// Decimal places proposals are rounded to.
    pub proposal_decimals: i32,

    /// Absolute step tried by the polisher in each direction.
    pub polish_step: f64,
    /// Clip polisher moves to declared bounds.
    pub clip_polish: bool,

    /// Validation score may not exceed this multiple of the training score.
    pub overfit_ratio: f64,
    /// Training score must be strictly below this for success.
    pub success_threshold: f64,
    /// Predictions closer than this to the label count as exact.
    pub exact_tolerance: f64,

    /// Iterations between status lines.
    pub progress_interval: usize,
    /// Seed for the train/validation permutation.
    pub split_seed: u64,
    /// Restart `r` seeds its random source with `seed_base + r`.
    pub seed_base: u64,
    /// Worker threads for restarts (1 = sequential).
    pub jobs: usize,
}

impl Default for TuneConfig {
    fn default() -> Self {
        Self {
            iterations: 30_000,
            restarts: 10,
            start_temperature: 15_000.0,
            cooling: 0.97,

            folds: 5,
            fold_fraction: 0.8,
            validation_fraction: 0.1,

            moves_per_step: 3,
            step_scale: 0.15,
            proposal_decimals: 4,

            polish_step: 0.01,
            clip_polish: false,

            overfit_ratio: 1.05,
            success_threshold: 6_500.0,
            exact_tolerance: 0.01,

            progress_interval: 500,
            split_seed: 0,
            seed_base: 0,
            jobs: 1,
        }
    }
}

/// Wrapper for the reimburse.toml structure.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    tune: Option<TuneConfig>,
}

impl TuneConfig {
    /// Load settings from `reimburse.toml` in the given directory.
    ///
    /// A missing file yields defaults; an unreadable or malformed one is an
    /// error rather than a silent fallback.
    pub fn load(directory: &Path) -> Result<(Self, Option<PathBuf>)> {
        let path = directory.join(CONFIG_FILE);
        if !path.exists() {
            return Ok((Self::default(), None));
        }
        let config = Self::load_file(&path)?;
        Ok((config, Some(path)))
    }

    /// Load settings from an explicit file.
    pub fn load_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Invalid config: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).context("Failed to parse TOML")?;
        let config = file.tune.unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the search cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.restarts == 0 {
            bail!("restarts must be at least 1");
        }
        if self.folds == 0 {
            bail!("folds must be at least 1");
        }
        if !(self.cooling > 0.0 && self.cooling <= 1.0) {
            bail!("cooling must be in (0, 1], got {}", self.cooling);
        }
        if !(self.start_temperature > 0.0) {
            bail!("start-temperature must be positive, got {}", self.start_temperature);
        }
        if !(self.fold_fraction > 0.0 && self.fold_fraction <= 1.0) {
            bail!("fold-fraction must be in (0, 1], got {}", self.fold_fraction);
        }
        if !(0.0..1.0).contains(&self.validation_fraction) {
            bail!("validation-fraction must be in [0, 1), got {}", self.validation_fraction);
        }
        if self.moves_per_step == 0 || self.moves_per_step > Coefficient::COUNT {
            bail!(
                "moves-per-step must be in 1..={}, got {}",
                Coefficient::COUNT,
                self.moves_per_step
            );
        }
        if !(self.step_scale >= 0.0) || !(self.polish_step > 0.0) {
            bail!("step-scale must be non-negative and polish-step positive");
        }
        if self.progress_interval == 0 {
            bail!("progress-interval must be at least 1");
        }
        if self.jobs == 0 {
            bail!("jobs must be at least 1");
        }
        Ok(())
    }

    /// True when `val` stays within the overfitting allowance of `train`.
    pub fn passes_overfit_guard(&self, train: f64, val: f64) -> bool {
        val <= self.overfit_ratio * train
    }

    /// True when a (train, val) pair is good enough to stop searching.
    pub fn is_converged(&self, train: f64, val: f64) -> bool {
        train < self.success_threshold && self.passes_overfit_guard(train, val)
    }

    /// Format settings for verbose display.
    pub fn display_summary(&self, source: Option<&Path>) -> String {
        let mut lines = Vec::new();
        match source {
            Some(path) => lines.push(format!("   Config: {}", path.display())),
            None => lines.push("   Config: (defaults)".to_string()),
        }
        lines.push(format!(
            "   Search: {} restarts × {} iterations, T0 {} cooling {}",
            self.restarts, self.iterations, self.start_temperature, self.cooling
        ));
        lines.push(format!(
            "   Folds: {} × {:.0}% of training pool, {:.0}% held out",
            self.folds,
            self.fold_fraction * 100.0,
            self.validation_fraction * 100.0
        ));
        lines.push(format!(
            "   Gate: train < {} and val ≤ {:.2} × train",
            self.success_threshold, self.overfit_ratio
        ));
        if self.jobs > 1 {
            lines.push(format!("   Jobs: {}", self.jobs));
        }
        lines.join("\n")
    }
}
