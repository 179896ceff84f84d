//! Coordinate-wise hill climbing after annealing.
//!
//! Each sweep visits every coefficient in canonical order and tries
//! `value − step` then `value + step`. The first direction that strictly
//! lowers the training score while keeping validation within the
//! overfitting allowance is taken on the spot, and the sweep moves on to the
//! next coefficient. A sweep with no accepted move ends polishing.
//!
//! Moves are not clipped to declared bounds unless `clip_polish` is set.

use super::scoring::{Objective, Scores};
use crate::config::TuneConfig;
use crate::formula::{Coefficient, Coefficients, round_to};

/// Result of polishing one vector.
#[derive(Debug, Clone)]
pub struct PolishOutcome {
    pub coefficients: Coefficients,
    pub scores: Scores,
    /// Accepted moves
    pub moves: usize,
    /// Full sweeps run, including the final unproductive one
    pub sweeps: usize,
}

/// Greedy first-improvement polishing of `start`.
///
/// The returned vector is either `start` unchanged or one whose validation
/// score passes the overfitting guard, with a training score no higher.
pub fn polish(start: &Coefficients, objective: &Objective<'_>, config: &TuneConfig) -> PolishOutcome {
    let mut best = start.clone();
    let mut best_scores = objective.scores(&best);
    let mut moves = 0;
    let mut sweeps = 0;

    loop {
        sweeps += 1;
        let mut improved = false;

        for &coefficient in Coefficient::ALL.iter() {
            for delta in [-config.polish_step, config.polish_step] {
                let Some(candidate) = step(&best, coefficient, delta, config) else {
                    continue;
                };
                let train = objective.train_score(&candidate);
                if train >= best_scores.train {
                    continue;
                }
                let val = objective.val_score(&candidate);
                if config.passes_overfit_guard(train, val) {
                    tracing::trace!(%coefficient, delta, train, val, "polish move");
                    best = candidate;
                    best_scores = Scores { train, val };
                    moves += 1;
                    improved = true;
                    break;
                }
            }
        }

        if !improved {
            break;
        }
    }

    tracing::debug!(moves, sweeps, train = best_scores.train, val = best_scores.val, "polish finished");

    PolishOutcome {
        coefficients: best,
        scores: best_scores,
        moves,
        sweeps,
    }
}

/// One polisher move, or `None` when it would leave the vector unchanged.
fn step(base: &Coefficients, coefficient: Coefficient, delta: f64, config: &TuneConfig) -> Option<Coefficients> {
    let current = base.get(coefficient);
    let mut value = round_to(current + delta, config.proposal_decimals);
    if config.clip_polish {
        if let Some(bounds) = coefficient.bounds() {
            value = bounds.clip(value);
        }
    }
    (value != current).then(|| base.with(coefficient, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::scoring::Scorer;
    use crate::training::split::FoldCollection;
    use crate::types::Example;

    fn shifted_examples(truth: &Coefficients) -> Vec<Example> {
        (0..10)
            .map(|i| {
                let mut e = Example::new((i % 5 + 1) as f64, 60.0 + 40.0 * i as f64, 50.0 + 90.0 * i as f64, 0.0);
                e.expected_output = e.input.predict(truth);
                e
            })
            .collect()
    }

    fn fixture() -> (Vec<Example>, FoldCollection, Vec<usize>) {
        let truth = Coefficients::default();
        let truth = truth.with(Coefficient::BasePd, truth.base_pd + 0.05);
        let examples = shifted_examples(&truth);
        let folds = FoldCollection {
            folds: vec![(0..8).collect(), (1..9).collect()],
        };
        (examples, folds, vec![9])
    }

    #[test]
    fn test_polish_never_worsens_train() {
        let (examples, folds, validation) = fixture();
        let objective = Objective::new(Scorer::new(&examples, 0.01), &folds, &validation);
        let config = TuneConfig::default();
        let start = Coefficients::default();
        let before = objective.scores(&start);

        let outcome = polish(&start, &objective, &config);
        assert!(outcome.scores.train <= before.train);
        assert_eq!(outcome.scores, objective.scores(&outcome.coefficients));
        if outcome.moves > 0 {
            assert!(config.passes_overfit_guard(outcome.scores.train, outcome.scores.val));
        }
    }

    #[test]
    fn test_polish_moves_toward_truth() {
        let (examples, folds, validation) = fixture();
        let objective = Objective::new(Scorer::new(&examples, 0.01), &folds, &validation);
        let config = TuneConfig {
            overfit_ratio: f64::INFINITY,
            ..TuneConfig::default()
        };
        let outcome = polish(&Coefficients::default(), &objective, &config);
        assert!(outcome.moves > 0);
        assert!(outcome.sweeps >= 2);
        assert!(outcome.scores.train < objective.train_score(&Coefficients::default()));
    }

    #[test]
    fn test_polish_fixed_point_at_zero() {
        let truth = Coefficients::default();
        let examples = shifted_examples(&truth);
        let folds = FoldCollection {
            folds: vec![(0..9).collect()],
        };
        let validation = vec![9];
        let objective = Objective::new(Scorer::new(&examples, 0.01), &folds, &validation);
        let outcome = polish(&truth, &objective, &TuneConfig::default());
        assert_eq!(outcome.moves, 0);
        assert_eq!(outcome.sweeps, 1);
        assert_eq!(outcome.coefficients, truth);
    }

    #[test]
    fn test_step_unclipped_by_default() {
        let config = TuneConfig::default();
        let at_edge = Coefficients::default().with(Coefficient::Mult1d, 1.5);
        let moved = step(&at_edge, Coefficient::Mult1d, 0.01, &config).unwrap();
        assert_eq!(moved.mult_1d, 1.51);
    }

    #[test]
    fn test_step_clipped_when_enabled() {
        let config = TuneConfig {
            clip_polish: true,
            ..TuneConfig::default()
        };
        let at_edge = Coefficients::default().with(Coefficient::Mult1d, 1.5);
        assert!(step(&at_edge, Coefficient::Mult1d, 0.01, &config).is_none());
        let moved = step(&at_edge, Coefficient::Mult1d, -0.01, &config).unwrap();
        assert_eq!(moved.mult_1d, 1.49);
    }
}
