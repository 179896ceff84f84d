//! Coefficient calibration.
//!
//! This module fits the reimbursement formula's coefficients to labeled
//! cases by:
//! 1. Splitting cases into a fixed validation holdout and a training pool
//! 2. Scoring candidates with a composite error metric
//! 3. Annealing from the seed vector with random restarts
//! 4. Polishing each restart with coordinate-wise hill climbing
//! 5. Gating restarts on an absolute threshold and an overfitting guard
//!
//! ## Overfitting Guard
//!
//! Every restart trains on its own bootstrap-style folds, but validation is
//! always the same held-out slice. A candidate whose validation score is more
//! than `overfit_ratio` × its training score is memorizing the folds rather
//! than learning the formula, and is never recorded as a best.
//!
//! ## Usage
//!
//! ```bash
//! # Default search, write coefficients.toml on success
//! reimburse-tune --cases public_cases.json
//!
//! # Quick parallel run with a custom budget
//! reimburse-tune --cases public_cases.json --iterations 5000 --restarts 4 --jobs 4
//! ```

pub mod anneal;
pub mod polish;
pub mod progress;
pub mod scoring;
pub mod search;
pub mod split;

pub use anneal::{AnnealOutcome, Annealer, metropolis_accept, propose};
pub use polish::{PolishOutcome, polish};
pub use progress::{ProgressReporter, RunHistory, plot_history};
pub use scoring::{Objective, ScoreCard, Scorer, Scores};
pub use search::{AcceptanceGate, CalibrationOutcome, Calibrator, GlobalBest, RestartResult, calibrate};
pub use split::{DatasetSplit, FoldCollection, IndexSet};
