//! Core types for labeled reimbursement cases.
//!
//! The on-disk shape mirrors the public case files:
//!
//! ```json
//! {
//!   "input": {"trip_duration_days": 3, "miles_traveled": 93, "total_receipts_amount": 1.42},
//!   "expected_output": 364.51
//! }
//! ```
//!
//! Examples are loaded once and never mutated; the search addresses them by
//! position in the loaded slice.

use serde::{Deserialize, Serialize};

use crate::formula::{self, Coefficients};

/// The three numeric inputs of one trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TripInput {
    pub trip_duration_days: f64,
    pub miles_traveled: f64,
    pub total_receipts_amount: f64,
}

impl TripInput {
    pub fn new(days: f64, miles: f64, receipts: f64) -> Self {
        Self {
            trip_duration_days: days,
            miles_traveled: miles,
            total_receipts_amount: receipts,
        }
    }

    /// Evaluate the formula for this trip.
    pub fn predict(&self, coefficients: &Coefficients) -> f64 {
        formula::reimburse(
            coefficients,
            self.trip_duration_days,
            self.miles_traveled,
            self.total_receipts_amount,
        )
    }
}

/// One labeled case: trip inputs plus the amount the legacy system paid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub input: TripInput,
    pub expected_output: f64,
}

impl Example {
    pub fn new(days: f64, miles: f64, receipts: f64, expected_output: f64) -> Self {
        Self {
            input: TripInput::new(days, miles, receipts),
            expected_output,
        }
    }

    /// Absolute difference between the formula's prediction and the label.
    pub fn abs_error(&self, coefficients: &Coefficients) -> f64 {
        (self.input.predict(coefficients) - self.expected_output).abs()
    }
}

/// A case without a label, as found in private result inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnlabeledCase {
    pub input: TripInput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_example_json() {
        let json = r#"{"input": {"trip_duration_days": 3, "miles_traveled": 93, "total_receipts_amount": 1.42}, "expected_output": 364.51}"#;
        let example: Example = serde_json::from_str(json).unwrap();
        assert_eq!(example.input.trip_duration_days, 3.0);
        assert_eq!(example.input.miles_traveled, 93.0);
        assert_eq!(example.expected_output, 364.51);
    }

    #[test]
    fn test_unlabeled_ignores_missing_output() {
        let json = r#"{"input": {"trip_duration_days": 1, "miles_traveled": 2, "total_receipts_amount": 3}}"#;
        let case: UnlabeledCase = serde_json::from_str(json).unwrap();
        assert_eq!(case.input, TripInput::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_abs_error_zero_on_own_prediction() {
        let c = Coefficients::default();
        let input = TripInput::new(4.0, 180.0, 420.0);
        let example = Example {
            input,
            expected_output: input.predict(&c),
        };
        assert_eq!(example.abs_error(&c), 0.0);
    }
}
