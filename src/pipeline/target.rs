//! Churn outcome mapping
//!
//! The raw `Churn` column carries free-form yes/no text. This module maps it
//! to binary labels: the event value maps to 1, the non-event value to 0 and
//! anything else (including nulls) is left unlabeled.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::loader::{column_to_string_vec, has_column};
use crate::error::{ChurnError, Result};

/// Name of the outcome column
pub const OUTCOME_COLUMN: &str = "Churn";

/// Mapping configuration for converting outcome values to binary 0/1
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetMapping {
    /// Value that maps to 1 (churned)
    pub event_value: String,
    /// Value that maps to 0 (retained)
    pub non_event_value: String,
}

impl TargetMapping {
    /// Create a new target mapping
    pub fn new(event_value: String, non_event_value: String) -> Self {
        Self {
            event_value,
            non_event_value,
        }
    }

    /// Map a raw outcome value, comparing trimmed and case-insensitively
    pub fn label(&self, raw: &str) -> Option<usize> {
        let value = raw.trim();
        if value.eq_ignore_ascii_case(&self.event_value) {
            Some(1)
        } else if value.eq_ignore_ascii_case(&self.non_event_value) {
            Some(0)
        } else {
            None
        }
    }
}

impl Default for TargetMapping {
    fn default() -> Self {
        Self::new("yes".to_string(), "no".to_string())
    }
}

/// Whether the DataFrame carries the outcome column
pub fn has_outcome(df: &DataFrame) -> bool {
    has_column(df, OUTCOME_COLUMN)
}

/// Create a binary target mask based on the mapping
///
/// Returns a Vec<Option<usize>> where:
/// - Some(1) for event values
/// - Some(0) for non-event values
/// - None for values that match neither
pub fn create_target_mask(
    df: &DataFrame,
    target: &str,
    mapping: &TargetMapping,
) -> Result<Vec<Option<usize>>> {
    if !has_column(df, target) {
        return Err(ChurnError::MissingOutcomeColumn);
    }
    let target_col = df.column(target)?;

    let mask = column_to_string_vec(target_col)?
        .iter()
        .map(|v| v.as_deref().and_then(|s| mapping.label(s)))
        .collect();

    Ok(mask)
}

/// Outcome mask for the `Churn` column with the default yes/no mapping
pub fn outcome_mask(df: &DataFrame) -> Result<Vec<Option<usize>>> {
    create_target_mask(df, OUTCOME_COLUMN, &TargetMapping::default())
}

/// Count churned, retained and unlabeled entries of a mask
pub fn count_labels(mask: &[Option<usize>]) -> (usize, usize, usize) {
    mask.iter().fold((0, 0, 0), |(events, non_events, ignored), v| match v {
        Some(1) => (events + 1, non_events, ignored),
        Some(_) => (events, non_events + 1, ignored),
        None => (events, non_events, ignored + 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_is_trimmed_and_case_insensitive() {
        let mapping = TargetMapping::default();
        assert_eq!(mapping.label("Yes"), Some(1));
        assert_eq!(mapping.label("  YES "), Some(1));
        assert_eq!(mapping.label("no"), Some(0));
        assert_eq!(mapping.label("maybe"), None);
        assert_eq!(mapping.label(""), None);
    }

    #[test]
    fn test_create_target_mask() {
        let df = df! {
            "Churn" => [Some("Yes"), Some("No"), Some("yes"), None, Some("unknown")],
            "tenure" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
        }
        .unwrap();

        let mask = outcome_mask(&df).unwrap();
        assert_eq!(mask, vec![Some(1), Some(0), Some(1), None, None]);
    }

    #[test]
    fn test_count_labels() {
        let df = df! {
            "Churn" => ["Yes", "No", "No", "No", "?", "?"],
        }
        .unwrap();

        let (events, non_events, ignored) = count_labels(&outcome_mask(&df).unwrap());

        assert_eq!(events, 1);
        assert_eq!(non_events, 3);
        assert_eq!(ignored, 2);
    }

    #[test]
    fn test_missing_outcome_column() {
        let df = df! {
            "tenure" => [1.0f64, 2.0],
        }
        .unwrap();

        assert!(!has_outcome(&df));
        assert!(matches!(
            outcome_mask(&df),
            Err(ChurnError::MissingOutcomeColumn)
        ));
    }

    #[test]
    fn test_custom_mapping() {
        let df = df! {
            "status" => ["left", "stayed", "left"],
        }
        .unwrap();
        let mapping = TargetMapping::new("left".to_string(), "stayed".to_string());
        let mask = create_target_mask(&df, "status", &mapping).unwrap();
        assert_eq!(mask, vec![Some(1), Some(0), Some(1)]);
    }
}
