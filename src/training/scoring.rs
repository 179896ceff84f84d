//! Composite error metric for a coefficient vector.
//!
//! ```text
//! score = mean(|pred − expected|) × 100 + (count − exact) × 0.1
//! ```
//!
//! The first term rewards being close on average, the second rewards
//! hitting labels exactly (within the exact-match tolerance). A perfect fit
//! scores 0; anything else scores strictly more.
//!
//! `train_score` averages the score across a restart's folds,
//! `val_score` scores the fixed validation set.

use serde::{Deserialize, Serialize};

use super::split::FoldCollection;
use crate::formula::Coefficients;
use crate::types::Example;

/// Weight on the mean absolute error.
pub const AVG_ERROR_WEIGHT: f64 = 100.0;
/// Penalty per example that is not an exact match.
pub const MISS_PENALTY: f64 = 0.1;

/// Detailed evaluation of one coefficient vector over one index set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    /// Examples evaluated
    pub count: usize,
    /// Predictions within tolerance of the label
    pub exact: usize,
    /// Mean absolute error
    pub avg_error: f64,
    /// Largest absolute error
    pub max_error: f64,
    /// Composite score (lower is better)
    pub score: f64,
}

impl ScoreCard {
    fn from_errors(errors: impl Iterator<Item = f64>, tolerance: f64) -> Self {
        let mut count = 0usize;
        let mut exact = 0usize;
        let mut sum = 0.0;
        let mut max_error = 0.0f64;
        for err in errors {
            count += 1;
            sum += err;
            max_error = max_error.max(err);
            if err < tolerance {
                exact += 1;
            }
        }

        // An empty set has nothing to get wrong.
        if count == 0 {
            return Self::default();
        }

        let avg_error = sum / count as f64;
        Self {
            count,
            exact,
            avg_error,
            max_error,
            score: avg_error * AVG_ERROR_WEIGHT + (count - exact) as f64 * MISS_PENALTY,
        }
    }
}

/// Training and validation scores of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub train: f64,
    pub val: f64,
}

/// Scores coefficient vectors against a borrowed example set.
#[derive(Debug, Clone, Copy)]
pub struct Scorer<'a> {
    examples: &'a [Example],
    tolerance: f64,
}

impl<'a> Scorer<'a> {
    pub fn new(examples: &'a [Example], tolerance: f64) -> Self {
        Self { examples, tolerance }
    }

    /// Full evaluation over the selected examples.
    pub fn evaluate(&self, coefficients: &Coefficients, indices: &[usize]) -> ScoreCard {
        ScoreCard::from_errors(
            indices.iter().map(|&i| self.examples[i].abs_error(coefficients)),
            self.tolerance,
        )
    }

    /// Evaluation over every example.
    pub fn evaluate_all(&self, coefficients: &Coefficients) -> ScoreCard {
        ScoreCard::from_errors(
            self.examples.iter().map(|e| e.abs_error(coefficients)),
            self.tolerance,
        )
    }

    pub fn score(&self, coefficients: &Coefficients, indices: &[usize]) -> f64 {
        self.evaluate(coefficients, indices).score
    }
}

/// A scorer bound to one restart's folds and the run's validation set.
#[derive(Debug, Clone, Copy)]
pub struct Objective<'a> {
    scorer: Scorer<'a>,
    folds: &'a FoldCollection,
    validation: &'a [usize],
}

impl<'a> Objective<'a> {
    pub fn new(scorer: Scorer<'a>, folds: &'a FoldCollection, validation: &'a [usize]) -> Self {
        Self {
            scorer,
            folds,
            validation,
        }
    }

    /// Mean score across the folds.
    pub fn train_score(&self, coefficients: &Coefficients) -> f64 {
        if self.folds.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .folds
            .iter()
            .map(|fold| self.scorer.score(coefficients, fold))
            .sum();
        total / self.folds.len() as f64
    }

    pub fn val_score(&self, coefficients: &Coefficients) -> f64 {
        self.scorer.score(coefficients, self.validation)
    }

    pub fn scores(&self, coefficients: &Coefficients) -> Scores {
        Scores {
            train: self.train_score(coefficients),
            val: self.val_score(coefficients),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Coefficient;

    fn exact_examples(c: &Coefficients) -> Vec<Example> {
        [(1.0, 50.0, 10.0), (3.0, 120.0, 300.5), (5.0, 600.0, 900.0), (8.0, 900.0, 1500.0)]
            .iter()
            .map(|&(d, m, r)| {
                let mut e = Example::new(d, m, r, 0.0);
                e.expected_output = e.input.predict(c);
                e
            })
            .collect()
    }

    #[test]
    fn test_perfect_fit_scores_zero() {
        let c = Coefficients::default();
        let examples = exact_examples(&c);
        let scorer = Scorer::new(&examples, 0.01);
        let card = scorer.evaluate(&c, &[0, 1, 2, 3]);
        assert_eq!(card.score, 0.0);
        assert_eq!(card.exact, 4);
        assert_eq!(card.count, 4);
    }

    #[test]
    fn test_score_formula() {
        let c = Coefficients::default();
        let mut examples = exact_examples(&c);
        examples[0].expected_output += 2.0;
        examples[1].expected_output -= 0.005;
        let scorer = Scorer::new(&examples, 0.01);
        let card = scorer.evaluate(&c, &[0, 1]);
        assert_eq!(card.exact, 1);
        let expected = (2.0 + 0.005) / 2.0 * 100.0 + 0.1;
        assert!((card.score - expected).abs() < 1e-6);
        assert!((card.max_error - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_index_set_scores_zero() {
        let examples = exact_examples(&Coefficients::default());
        let scorer = Scorer::new(&examples, 0.01);
        assert_eq!(scorer.score(&Coefficients::default(), &[]), 0.0);
    }

    #[test]
    fn test_train_score_averages_folds() {
        let c = Coefficients::default();
        let mut examples = exact_examples(&c);
        examples[2].expected_output += 1.0;
        let scorer = Scorer::new(&examples, 0.01);
        let folds = FoldCollection {
            folds: vec![vec![0, 1], vec![2, 3]],
        };
        let validation: Vec<usize> = vec![];
        let objective = Objective::new(scorer, &folds, &validation);
        let fold_b = scorer.score(&c, &[2, 3]);
        assert!((objective.train_score(&c) - fold_b / 2.0).abs() < 1e-9);
        assert_eq!(objective.val_score(&c), 0.0);
    }

    #[test]
    fn test_worse_coefficients_score_higher() {
        let c = Coefficients::default();
        let examples = exact_examples(&c);
        let scorer = Scorer::new(&examples, 0.01);
        let shifted = c.with(Coefficient::BasePd, c.base_pd + 5.0);
        assert!(scorer.score(&shifted, &[0, 1, 2, 3]) > 0.0);
    }
}
