//! Persisting calibration results.
//!
//! Tuned coefficients are written to a TOML file as a `[coefficients]`
//! table keyed by the canonical constant names. Any other top-level keys in
//! that file are carried over untouched; the production CLI reads the same
//! table back at startup.
//!
//! ```toml
//! [meta]
//! owner = "finance"
//!
//! [coefficients]
//! BASE_PD = 99.9158
//! BONUS_DAY5 = 44.08837
//! # ... all 25 constants in canonical order
//! ```
//!
//! Nothing here runs unless calibration succeeded.

use std::path::Path;

use anyhow::{Context, Result, bail};
use regex::Regex;

use crate::formula::Coefficients;

/// Table holding the tuned constants.
pub const COEFFICIENTS_TABLE: &str = "coefficients";

/// Default location of the coefficients file.
pub const DEFAULT_COEFFICIENTS_FILE: &str = "coefficients.toml";

/// Marker the summary score line starts with.
pub const SCORE_MARKER: &str = "**Score:**";

/// Write `coefficients` into the `[coefficients]` table at `path`.
///
/// The file is replaced atomically via a sibling temp file, so a failed
/// write never leaves a half-written table behind.
pub fn save_coefficients(path: &Path, coefficients: &Coefficients) -> Result<()> {
    let mut document = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read coefficients file: {}", path.display()))?;
        content
            .parse::<toml::Table>()
            .with_context(|| format!("Refusing to overwrite malformed TOML: {}", path.display()))?
    } else {
        toml::Table::new()
    };

    let table = toml::Value::try_from(coefficients).context("Failed to encode coefficients")?;
    document.insert(COEFFICIENTS_TABLE.to_string(), table);

    let text = toml::to_string_pretty(&document).context("Failed to serialize coefficients file")?;
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, text).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;

    tracing::info!(path = %path.display(), "saved coefficients");
    Ok(())
}

/// Read the `[coefficients]` table from `path`.
pub fn load_coefficients(path: &Path) -> Result<Coefficients> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read coefficients file: {}", path.display()))?;
    parse_coefficients(&content).with_context(|| format!("Invalid coefficients file: {}", path.display()))
}

pub fn parse_coefficients(content: &str) -> Result<Coefficients> {
    let mut document: toml::Table = content.parse().context("Failed to parse TOML")?;
    let Some(table) = document.remove(COEFFICIENTS_TABLE) else {
        bail!("Missing [{}] table", COEFFICIENTS_TABLE);
    };
    table
        .try_into::<Coefficients>()
        .context("Coefficients table must set every constant")
}

/// Load tuned coefficients, falling back to the built-in seed when absent.
///
/// Returns the coefficients and whether they came from the file.
pub fn load_or_default(path: &Path) -> Result<(Coefficients, bool)> {
    if path.exists() {
        Ok((load_coefficients(path)?, true))
    } else {
        Ok((Coefficients::default(), false))
    }
}

/// Summary line recording the achieved score.
pub fn format_score_line(train_score: f64, exact: usize, total: usize) -> String {
    format!("{} {:.2} (public, exact {}/{})", SCORE_MARKER, train_score, exact, total)
}

/// Replace the first score line in `text`, if there is one.
pub fn patch_score_text(text: &str, train_score: f64, exact: usize, total: usize) -> Result<Option<String>> {
    let pattern = Regex::new(r"\*\*Score:\*\*[^\n]*").context("Invalid score-line pattern")?;
    if !pattern.is_match(text) {
        return Ok(None);
    }
    let line = format_score_line(train_score, exact, total);
    Ok(Some(pattern.replacen(text, 1, regex::NoExpand(&line)).into_owned()))
}

/// Patch the score line of a summary file in place.
///
/// Returns false, leaving the file alone, when it is missing or carries no
/// score line.
pub fn patch_summary(path: &Path, train_score: f64, exact: usize, total: usize) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read summary: {}", path.display()))?;
    match patch_score_text(&text, train_score, exact, total)? {
        Some(patched) => {
            std::fs::write(path, patched)
                .with_context(|| format!("Failed to write summary: {}", path.display()))?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Write one prediction per line.
pub fn write_results(path: &Path, predictions: &[f64]) -> Result<()> {
    let mut out = String::with_capacity(predictions.len() * 8);
    for p in predictions {
        out.push_str(&format!("{:.2}\n", p));
    }
    std::fs::write(path, out).with_context(|| format!("Failed to write results: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::Coefficient;

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coefficients.toml");
        let tuned = Coefficients::default().with(Coefficient::Mult9d, 0.8123);

        save_coefficients(&path, &tuned).unwrap();
        assert_eq!(load_coefficients(&path).unwrap(), tuned);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_save_preserves_other_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coefficients.toml");
        std::fs::write(&path, "[meta]\nowner = \"finance\"\n\n[coefficients]\nBASE_PD = 1.0\n").unwrap();

        save_coefficients(&path, &Coefficients::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let document: toml::Table = text.parse().unwrap();
        assert_eq!(document["meta"]["owner"].as_str(), Some("finance"));
        assert_eq!(document["coefficients"]["BASE_PD"].as_float(), Some(99.9158));
    }

    #[test]
    fn test_saved_keys_follow_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coefficients.toml");
        save_coefficients(&path, &Coefficients::default()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let positions: Vec<usize> = Coefficient::ALL
            .iter()
            .map(|c| text.find(&format!("{} =", c.name())).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_malformed_existing_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("coefficients.toml");
        std::fs::write(&path, "not = [valid").unwrap();
        assert!(save_coefficients(&path, &Coefficients::default()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not = [valid");
    }

    #[test]
    fn test_incomplete_table_rejected() {
        assert!(parse_coefficients("[coefficients]\nBASE_PD = 1.0\n").is_err());
        assert!(parse_coefficients("[other]\nBASE_PD = 1.0\n").is_err());
    }

    #[test]
    fn test_load_or_default_missing() {
        let (coeffs, from_file) = load_or_default(Path::new("/nonexistent/coefficients.toml")).unwrap();
        assert!(!from_file);
        assert_eq!(coeffs, Coefficients::default());
    }

    #[test]
    fn test_patch_score_text() {
        let text = "# Reimbursement\n\n**Score:** 8123.40 (public, exact 2/1000)\n\nMore text\n";
        let patched = patch_score_text(text, 6012.346, 17, 1000).unwrap().unwrap();
        assert_eq!(
            patched,
            "# Reimbursement\n\n**Score:** 6012.35 (public, exact 17/1000)\n\nMore text\n"
        );
    }

    #[test]
    fn test_patch_score_text_without_marker() {
        assert!(patch_score_text("# Title\nno score\n", 1.0, 1, 1).unwrap().is_none());
    }

    #[test]
    fn test_patch_summary_missing_file() {
        assert!(!patch_summary(Path::new("/nonexistent/README.md"), 1.0, 1, 1).unwrap());
    }

    #[test]
    fn test_write_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.txt");
        write_results(&path, &[364.51, 126.0]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "364.51\n126.00\n");
    }
}
