//! reimburse - travel reimbursement formula and its calibrator
//!
//! A closed-form piecewise formula reproduces a legacy reimbursement system
//! from (days, miles, receipts). Its 25 coefficients are fitted against
//! labeled cases by simulated annealing with restarts, then persisted for the
//! production calculator to load.
//!
//! # Architecture
//!
//! ```text
//! Cases → Split → (per restart) Folds → Anneal ⇄ Score → Polish ⇄ Score → Gate
//!   ↓       ↓                      ↓        ↓                 ↓            ↓
//!  serde  seeded                 bootstrap Metropolis     coordinate   threshold +
//!  json   permutation            subsamples criterion     hill climb   overfit guard
//! ```
//!
//! On success the winning coefficients go to a TOML table that
//! [`formula::reimburse`] callers load at startup.
//!
//! # Performance Strategies
//!
//! - Restarts are independent and run on a rayon pool when `jobs > 1`
//! - Validation is only scored for accepted proposals
//! - Examples are borrowed, never cloned, by every scorer

pub mod config;
pub mod dataset;
pub mod formula;
pub mod persist;
pub mod training;
pub mod types;

// Re-export core types
pub use config::TuneConfig;
pub use formula::{Bounds, Coefficient, Coefficients, reimburse};
pub use types::{Example, TripInput};

// Re-export calibration entry points
pub use training::{CalibrationOutcome, Calibrator, calibrate};
