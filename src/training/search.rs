//! Restarts, the acceptance gate, and the calibration driver.
//!
//! ## Control Flow
//!
//! ```text
//! DatasetSplit (once)
//!   └─ restart r (seed_base + r):
//!        draw folds → anneal ⇄ score → polish ⇄ score → rescore
//!   └─ gate: strictly lower train AND guard → new global best
//!   └─ stop once the global best is converged, or restarts run out
//! ```
//!
//! Restarts share nothing but the read-only examples and validation set,
//! so with `jobs > 1` they run on a rayon pool. Results are still fed to the
//! gate in restart order with the same early stop, which makes the outcome
//! identical to a sequential run.

use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::anneal::Annealer;
use super::polish::polish;
use super::progress::{ProgressReporter, RunHistory};
use super::scoring::{Objective, ScoreCard, Scorer, Scores};
use super::split::DatasetSplit;
use crate::config::TuneConfig;
use crate::formula::Coefficients;
use crate::types::Example;

/// Outcome of one restart after polishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestartResult {
    pub restart: usize,
    pub coefficients: Coefficients,
    /// Scores of the polished vector on this restart's folds
    pub scores: Scores,
    /// Scores at the end of annealing, before polishing
    pub annealed: Scores,
    /// Lowest guarded training score seen while annealing
    pub best_local_train: f64,
    pub iterations: usize,
    pub accepted: usize,
    pub converged_early: bool,
    pub polish_moves: usize,
}

/// The best restart admitted by the gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalBest {
    pub restart: usize,
    pub coefficients: Coefficients,
    pub scores: Scores,
}

/// Global stopping rule across restarts.
///
/// A restart replaces the global best only when its training score is
/// strictly lower and its validation score passes the overfitting guard.
#[derive(Debug, Clone, Default)]
pub struct AcceptanceGate {
    best: Option<GlobalBest>,
}

impl AcceptanceGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a restart result; returns true if it became the global best.
    pub fn offer(&mut self, result: &RestartResult, config: &TuneConfig) -> bool {
        let best_train = self.best.as_ref().map_or(f64::INFINITY, |b| b.scores.train);
        let admitted = result.scores.train < best_train
            && config.passes_overfit_guard(result.scores.train, result.scores.val);

        if admitted {
            self.best = Some(GlobalBest {
                restart: result.restart,
                coefficients: result.coefficients.clone(),
                scores: result.scores,
            });
        }
        tracing::debug!(
            restart = result.restart,
            train = result.scores.train,
            val = result.scores.val,
            admitted,
            "gate decision"
        );
        admitted
    }

    /// True once the global best meets the absolute threshold and the guard.
    pub fn is_satisfied(&self, config: &TuneConfig) -> bool {
        self.best
            .as_ref()
            .is_some_and(|b| config.is_converged(b.scores.train, b.scores.val))
    }

    pub fn best(&self) -> Option<&GlobalBest> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<GlobalBest> {
        self.best
    }
}

/// Everything a calibration run produced.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    pub success: bool,
    pub best: Option<GlobalBest>,
    /// Lowest training score of any restart, guarded or not (diagnostics)
    pub best_attempt_train: f64,
    /// Restarts consumed by the gate, in order
    pub restarts: Vec<RestartResult>,
    pub history: RunHistory,
    pub elapsed: Duration,
}

impl CalibrationOutcome {
    /// Training score to report: the global best if any, else the best attempt.
    pub fn reported_train(&self) -> f64 {
        self.best.as_ref().map_or(self.best_attempt_train, |b| b.scores.train)
    }
}

/// Drives restarts over a fixed dataset split.
pub struct Calibrator<'a> {
    examples: &'a [Example],
    config: &'a TuneConfig,
    seed: Coefficients,
    split: DatasetSplit,
    progress: ProgressReporter,
}

impl<'a> Calibrator<'a> {
    pub fn new(examples: &'a [Example], config: &'a TuneConfig, seed: Coefficients) -> Result<Self> {
        if examples.is_empty() {
            bail!("Cannot calibrate against an empty dataset");
        }
        config.validate().context("Invalid tuning configuration")?;

        let split = DatasetSplit::new(examples.len(), config.validation_fraction, config.split_seed);
        tracing::info!(
            examples = examples.len(),
            validation = split.validation.len(),
            training_pool = split.training_pool.len(),
            "dataset split"
        );

        Ok(Self {
            examples,
            config,
            seed,
            split,
            progress: ProgressReporter::silent(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn split(&self) -> &DatasetSplit {
        &self.split
    }

    fn scorer(&self) -> Scorer<'a> {
        Scorer::new(self.examples, self.config.exact_tolerance)
    }

    /// Full-dataset evaluation, used for the exact-match count on success.
    pub fn evaluate_all(&self, coefficients: &Coefficients) -> ScoreCard {
        self.scorer().evaluate_all(coefficients)
    }

    /// Run one restart: folds, annealing, polishing, rescoring.
    pub fn run_restart(&self, restart: usize) -> RestartResult {
        let config = self.config;
        let mut rng = StdRng::seed_from_u64(config.seed_base.wrapping_add(restart as u64));
        let folds = self.split.draw_folds(&mut rng, config.folds, config.fold_fraction);
        let objective = Objective::new(self.scorer(), &folds, &self.split.validation);

        tracing::debug!(restart, folds = folds.len(), "restart started");

        let annealer = Annealer::new(config, objective, self.progress);
        let annealed = annealer.run(&self.seed, restart, &mut rng);
        let polished = polish(&annealed.current, &objective, config);
        let scores = objective.scores(&polished.coefficients);

        RestartResult {
            restart,
            coefficients: polished.coefficients,
            scores,
            annealed: annealed.scores,
            best_local_train: annealed.best_local_scores.train,
            iterations: annealed.iterations,
            accepted: annealed.accepted,
            converged_early: annealed.converged,
            polish_moves: polished.moves,
        }
    }

    /// Run restarts until the gate is satisfied or the budget is spent.
    pub fn run(&self) -> Result<CalibrationOutcome> {
        let start = Instant::now();
        let config = self.config;

        let mut gate = AcceptanceGate::new();
        let mut history = RunHistory::new();
        let mut consumed = Vec::new();
        let mut best_attempt_train = f64::INFINITY;

        let mut consume = |result: RestartResult, gate: &mut AcceptanceGate| -> bool {
            let admitted = gate.offer(&result, config);
            let exact = self.evaluate_all(&result.coefficients).exact;
            history.record(result.scores, exact);
            best_attempt_train = best_attempt_train.min(result.scores.train);
            self.progress.restart_finished(&result, admitted);
            consumed.push(result);
            gate.is_satisfied(config)
        };

        if config.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.jobs)
                .build()
                .context("failed to build rayon threadpool")?;
            let results: Vec<RestartResult> =
                pool.install(|| (0..config.restarts).into_par_iter().map(|r| self.run_restart(r)).collect());
            for result in results {
                if consume(result, &mut gate) {
                    break;
                }
            }
        } else {
            for restart in 0..config.restarts {
                if consume(self.run_restart(restart), &mut gate) {
                    break;
                }
            }
        }

        let success = gate.is_satisfied(config);
        let best = gate.into_best();
        let elapsed = start.elapsed();

        tracing::info!(
            success,
            restarts = consumed.len(),
            best_train = best.as_ref().map(|b| b.scores.train),
            elapsed_s = elapsed.as_secs_f64(),
            "calibration finished"
        );

        Ok(CalibrationOutcome {
            success,
            best,
            best_attempt_train,
            restarts: consumed,
            history,
            elapsed,
        })
    }
}

/// Convenience wrapper: split, search, and gate in one call.
pub fn calibrate(examples: &[Example], config: &TuneConfig, seed: &Coefficients) -> Result<CalibrationOutcome> {
    Calibrator::new(examples, config, seed.clone())?.run()
}
