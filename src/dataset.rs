//! Loading labeled and unlabeled case files.
//!
//! Case files are JSON arrays. A missing or malformed file is fatal: nothing
//! downstream can score against a partial dataset.

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::types::{Example, TripInput, UnlabeledCase};

/// Load labeled examples from a JSON array of `{input, expected_output}`.
pub fn load_examples(path: &Path) -> Result<Vec<Example>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cases file: {}", path.display()))?;
    let examples = parse_examples(&content)
        .with_context(|| format!("Failed to parse cases file: {}", path.display()))?;
    tracing::debug!(path = %path.display(), count = examples.len(), "loaded labeled cases");
    Ok(examples)
}

/// Parse labeled examples from JSON text.
pub fn parse_examples(content: &str) -> Result<Vec<Example>> {
    let examples: Vec<Example> =
        serde_json::from_str(content).context("Failed to parse labeled cases JSON")?;
    if examples.is_empty() {
        bail!("Cases file contains no examples");
    }
    if let Some((i, _)) = examples.iter().enumerate().find(|(_, e)| !is_finite_example(e)) {
        bail!("Case {} has a non-finite field", i);
    }
    Ok(examples)
}

/// Unlabeled case files come either wrapped like labeled ones or as bare
/// trip objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum InputRecord {
    Wrapped(UnlabeledCase),
    Bare(TripInput),
}

impl From<InputRecord> for TripInput {
    fn from(record: InputRecord) -> Self {
        match record {
            InputRecord::Wrapped(case) => case.input,
            InputRecord::Bare(input) => input,
        }
    }
}

/// Load trip inputs, ignoring any `expected_output` that may be present.
pub fn load_inputs(path: &Path) -> Result<Vec<TripInput>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read cases file: {}", path.display()))?;
    parse_inputs(&content).with_context(|| format!("Failed to parse cases file: {}", path.display()))
}

pub fn parse_inputs(content: &str) -> Result<Vec<TripInput>> {
    let records: Vec<InputRecord> = serde_json::from_str(content).context("Failed to parse cases JSON")?;
    Ok(records.into_iter().map(TripInput::from).collect())
}

fn is_finite_example(example: &Example) -> bool {
    example.input.trip_duration_days.is_finite()
        && example.input.miles_traveled.is_finite()
        && example.input.total_receipts_amount.is_finite()
        && example.expected_output.is_finite()
}
