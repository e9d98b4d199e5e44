//! CSV output for prediction scores and labels.
//!
//! The probability file mirrors numpy's `%.4g` float formatting so rows
//! read the same as the established output format: four significant
//! digits, trailing zeros stripped, and scores under 0.001 flattened to
//! a literal `0`.

use super::Prediction;
use crate::error::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Scores below this are written as `0`.
pub const PROBABILITY_FLOOR: f32 = 0.001;

/// Write one header row of category names, then one score row per example.
pub fn write_probability_csv(
    path: impl AsRef<Path>,
    categories: &[String],
    prediction: &Prediction,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", categories.join(","))?;

    for row in 0..prediction.rows() {
        let line = prediction
            .probability_row(row)
            .iter()
            .map(|&v| format_probability(v))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
    }

    out.flush()?;
    Ok(())
}

/// Write the thresholded 0/1 label matrix with the same header.
pub fn write_label_csv(
    path: impl AsRef<Path>,
    categories: &[String],
    prediction: &Prediction,
) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut out = BufWriter::new(file);
    writeln!(out, "{}", categories.join(","))?;

    for row in 0..prediction.rows() {
        let line = prediction
            .label_row(row)
            .iter()
            .map(|l| l.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
    }

    out.flush()?;
    Ok(())
}

/// Four significant digits in fixed notation, trailing zeros trimmed.
///
/// Sigmoid scores live in (0, 1), and everything under the floor is
/// already flattened to zero, so the scientific branch of `%.4g` never
/// applies here.
fn format_probability(value: f32) -> String {
    if value < PROBABILITY_FLOOR {
        return "0".to_string();
    }

    let exponent = value.abs().log10().floor() as i32;
    let decimals = (3 - exponent).max(0) as usize;
    let mut s = format!("{value:.decimals$}");
    if s.contains('.') {
        while s.ends_with('0') {
            s.pop();
        }
        if s.ends_with('.') {
            s.pop();
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn four_significant_digits() {
        assert_eq!(format_probability(0.5), "0.5");
        assert_eq!(format_probability(0.12345), "0.1235");
        assert_eq!(format_probability(0.875), "0.875");
        assert_eq!(format_probability(0.01234), "0.01234");
        assert_eq!(format_probability(0.001), "0.001");
        assert_eq!(format_probability(0.009999), "0.009999");
    }

    #[test]
    fn whole_numbers_lose_the_point() {
        assert_eq!(format_probability(1.0), "1");
        assert_eq!(format_probability(0.99999), "1");
    }

    #[test]
    fn floored_scores_are_zero() {
        assert_eq!(format_probability(0.0009), "0");
        assert_eq!(format_probability(0.0), "0");
        assert_eq!(format_probability(0.0000001), "0");
    }

    #[test]
    fn probability_rows_match_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probability_0.csv");
        let categories = vec!["science".to_string(), "sports".to_string()];
        let prediction =
            Prediction::from_probabilities(2, vec![0.5, 0.0005, 0.25, 1.0]);

        write_probability_csv(&path, &categories, &prediction).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["science,sports", "0.5,0", "0.25,1"]);
    }

    #[test]
    fn label_rows_are_zero_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("labels_0.csv");
        let categories = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let prediction =
            Prediction::from_probabilities(3, vec![0.9, 0.2, 0.5, 0.1, 0.6, 0.4]);

        write_label_csv(&path, &categories, &prediction).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec!["a,b,c", "1,0,1", "0,1,0"]);
    }

    #[test]
    fn empty_prediction_still_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("probability_empty.csv");
        let categories = vec!["only".to_string()];
        let prediction = Prediction::from_probabilities(1, vec![]);

        write_probability_csv(&path, &categories, &prediction).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "only\n");
    }
}
