//! Simulated annealing over the coefficient vector.
//!
//! ## One restart
//!
//! ```text
//! Initialize: current = seed, T = T0
//!   └─ converged already? → stop (0 iterations)
//! Iterate (≤ iterations):
//!   propose   pick k distinct coefficients, scale each by 1 + U(-s, s),
//!             round, clip bounded ones into range
//!   accept    always if train improves, else with p = exp((cur − prop) / T)
//!   cool      T *= cooling (every iteration, accepted or not)
//!   exit      train < threshold and val ≤ ratio × train
//! ```
//!
//! Cooling is iteration-indexed and never reheats within a restart. The
//! restart-local best only records states that pass the overfitting guard.

use rand::prelude::*;

use super::progress::ProgressReporter;
use super::scoring::{Objective, Scores};
use crate::config::TuneConfig;
use crate::formula::{Coefficient, Coefficients, round_to};

/// Final state of one annealing run.
#[derive(Debug, Clone)]
pub struct AnnealOutcome {
    /// Last accepted vector (seeds the polisher)
    pub current: Coefficients,
    pub scores: Scores,
    /// Lowest-train guarded state seen during the run
    pub best_local: Coefficients,
    pub best_local_scores: Scores,
    /// Iterations executed
    pub iterations: usize,
    /// Proposals accepted
    pub accepted: usize,
    /// Stopped because the early-exit condition held
    pub converged: bool,
    pub final_temperature: f64,
}

/// Build a proposal differing from `current` in `moves_per_step` positions.
pub fn propose<R: Rng>(current: &Coefficients, config: &TuneConfig, rng: &mut R) -> Coefficients {
    let mut proposal = current.clone();
    let picks = rand::seq::index::sample(rng, Coefficient::COUNT, config.moves_per_step);

    for pos in picks.iter() {
        let coefficient = Coefficient::ALL[pos];
        let u: f64 = rng.r#gen();
        let factor = 1.0 + config.step_scale * (2.0 * u - 1.0);
        let mut value = round_to(current.get(coefficient) * factor, config.proposal_decimals);
        if let Some(bounds) = coefficient.bounds() {
            value = bounds.clip(value);
        }
        proposal.set(coefficient, value);
    }

    proposal
}

/// Metropolis criterion on training scores (lower is better).
///
/// The random draw only happens for non-improving proposals.
pub fn metropolis_accept<R: Rng>(current: f64, proposed: f64, temperature: f64, rng: &mut R) -> bool {
    if proposed < current {
        return true;
    }
    let u: f64 = rng.r#gen();
    u < ((current - proposed) / temperature).exp()
}

/// Runs the annealing phase of a restart against a fixed objective.
pub struct Annealer<'a> {
    config: &'a TuneConfig,
    objective: Objective<'a>,
    progress: ProgressReporter,
}

impl<'a> Annealer<'a> {
    pub fn new(config: &'a TuneConfig, objective: Objective<'a>, progress: ProgressReporter) -> Self {
        Self {
            config,
            objective,
            progress,
        }
    }

    pub fn run<R: Rng>(&self, seed: &Coefficients, restart: usize, rng: &mut R) -> AnnealOutcome {
        let config = self.config;
        let mut current = seed.clone();
        let mut cur = self.objective.scores(&current);
        let mut best_local = current.clone();
        let mut best_local_scores = cur;
        let mut temperature = config.start_temperature;
        let mut iterations = 0;
        let mut accepted = 0;
        let mut converged = config.is_converged(cur.train, cur.val);

        if converged {
            tracing::debug!(restart, train = cur.train, val = cur.val, "seed already converged");
        }

        while !converged && iterations < config.iterations {
            let i = iterations;
            let proposal = propose(&current, config, rng);
            let prop_train = self.objective.train_score(&proposal);

            if metropolis_accept(cur.train, prop_train, temperature, rng) {
                cur = Scores {
                    train: prop_train,
                    val: self.objective.val_score(&proposal),
                };
                current = proposal;
                accepted += 1;

                if cur.train < best_local_scores.train
                    && config.passes_overfit_guard(cur.train, cur.val)
                {
                    best_local = current.clone();
                    best_local_scores = cur;
                }
            }

            temperature *= config.cooling;
            iterations += 1;

            self.progress.iteration(restart, i, cur, best_local_scores.train);
            converged = config.is_converged(cur.train, cur.val);
        }

        tracing::debug!(
            restart,
            iterations,
            accepted,
            converged,
            train = cur.train,
            val = cur.val,
            "annealing finished"
        );

        AnnealOutcome {
            current,
            scores: cur,
            best_local,
            best_local_scores,
            iterations,
            accepted,
            converged,
            final_temperature: temperature,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::scoring::Scorer;
    use crate::training::split::FoldCollection;
    use crate::types::Example;

    fn examples_from(c: &Coefficients, offset: f64) -> Vec<Example> {
        (0..12)
            .map(|i| {
                let days = (i % 7 + 1) as f64;
                let miles = 40.0 + 75.0 * i as f64;
                let receipts = 25.0 + 130.0 * i as f64;
                let mut e = Example::new(days, miles, receipts, 0.0);
                e.expected_output = e.input.predict(c) + offset;
                e
            })
            .collect()
    }

    fn folds() -> FoldCollection {
        FoldCollection {
            folds: vec![(0..8).collect(), (2..10).collect()],
        }
    }

    #[test]
    fn test_propose_changes_at_most_k_positions() {
        let config = TuneConfig::default();
        let seed = Coefficients::default();
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            let proposal = propose(&seed, &config, &mut rng);
            let changed = Coefficient::ALL
                .iter()
                .filter(|&&c| proposal.get(c) != seed.get(c))
                .count();
            assert!(changed <= 3);
        }
    }

    #[test]
    fn test_propose_rounds_to_four_places() {
        let config = TuneConfig::default();
        let mut rng = StdRng::seed_from_u64(1);
        let seed = Coefficients::default();
        let proposal = propose(&seed, &config, &mut rng);
        let moved: Vec<f64> = Coefficient::ALL
            .iter()
            .filter(|&&c| proposal.get(c) != seed.get(c))
            .map(|&c| proposal.get(c))
            .collect();
        assert!(!moved.is_empty());
        for v in moved {
            assert!((v * 1e4 - (v * 1e4).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_bounded_coefficients_stay_in_range() {
        let config = TuneConfig {
            moves_per_step: 25,
            step_scale: 0.5,
            ..TuneConfig::default()
        };
        let mut rng = StdRng::seed_from_u64(2);
        let mut current = Coefficients::default();
        for _ in 0..2_000 {
            current = propose(&current, &config, &mut rng);
            assert!(current.out_of_bounds().is_empty());
        }
    }

    #[test]
    fn test_metropolis_always_takes_improvement() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(metropolis_accept(10.0, 9.0, 1e-12, &mut rng));
    }

    #[test]
    fn test_metropolis_rejects_large_uphill_when_cold() {
        let mut rng = StdRng::seed_from_u64(0);
        let accepted = (0..1000)
            .filter(|_| metropolis_accept(10.0, 1_000.0, 1.0, &mut rng))
            .count();
        assert_eq!(accepted, 0);
    }

    #[test]
    fn test_metropolis_accepts_uphill_when_hot() {
        let mut rng = StdRng::seed_from_u64(0);
        let accepted = (0..1000)
            .filter(|_| metropolis_accept(10.0, 11.0, 1e9, &mut rng))
            .count();
        assert!(accepted > 990);
    }

    #[test]
    fn test_converged_seed_skips_iterations() {
        let seed = Coefficients::default();
        let examples = examples_from(&seed, 0.0);
        let folds = folds();
        let validation = vec![10, 11];
        let objective = Objective::new(Scorer::new(&examples, 0.01), &folds, &validation);
        let config = TuneConfig::default();
        let annealer = Annealer::new(&config, objective, ProgressReporter::silent());

        let outcome = annealer.run(&seed, 0, &mut StdRng::seed_from_u64(0));
        assert_eq!(outcome.iterations, 0);
        assert!(outcome.converged);
        assert_eq!(outcome.scores, Scores { train: 0.0, val: 0.0 });
        assert_eq!(outcome.current, seed);
    }

    #[test]
    fn test_iteration_cap_and_cooling() {
        let seed = Coefficients::default();
        let examples = examples_from(&seed, 1_000.0);
        let folds = folds();
        let validation = vec![10, 11];
        let objective = Objective::new(Scorer::new(&examples, 0.01), &folds, &validation);
        let config = TuneConfig {
            iterations: 40,
            start_temperature: 100.0,
            cooling: 0.5,
            success_threshold: 0.0,
            ..TuneConfig::default()
        };
        let annealer = Annealer::new(&config, objective, ProgressReporter::silent());

        let outcome = annealer.run(&seed, 0, &mut StdRng::seed_from_u64(0));
        assert_eq!(outcome.iterations, 40);
        assert!(!outcome.converged);
        assert!((outcome.final_temperature - 100.0 * 0.5f64.powi(40)).abs() < 1e-12);
        assert!(outcome.best_local_scores.train <= objective.train_score(&seed));
    }

    #[test]
    fn test_same_seed_same_trajectory() {
        let seed = Coefficients::default();
        let examples = examples_from(&seed, 3.0);
        let folds = folds();
        let validation = vec![10, 11];
        let objective = Objective::new(Scorer::new(&examples, 0.01), &folds, &validation);
        let config = TuneConfig {
            iterations: 200,
            success_threshold: 0.0,
            ..TuneConfig::default()
        };
        let annealer = Annealer::new(&config, objective, ProgressReporter::silent());

        let a = annealer.run(&seed, 0, &mut StdRng::seed_from_u64(5));
        let b = annealer.run(&seed, 0, &mut StdRng::seed_from_u64(5));
        assert_eq!(a.current, b.current);
        assert_eq!(a.accepted, b.accepted);
        assert_eq!(a.scores, b.scores);
    }
}
