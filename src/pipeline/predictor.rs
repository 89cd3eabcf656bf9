//! Inference on raw customer records with a trained pipeline

use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::loader::records_to_dataframe;
use super::preprocess::{transform, FeatureTable};
use super::target::outcome_mask;
use super::trainer::TrainedPipeline;
use crate::error::{ChurnError, Result};

/// Probability above which a customer is high risk
pub const HIGH_RISK_THRESHOLD: f64 = 0.7;
/// Probability above which a customer is medium risk
pub const MEDIUM_RISK_THRESHOLD: f64 = 0.3;

/// Coarse bucket derived from a churn probability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Strict comparisons: exactly 0.7 is Medium, exactly 0.3 is Low
    pub fn from_probability(probability: f64) -> Self {
        if probability > HIGH_RISK_THRESHOLD {
            Self::High
        } else if probability > MEDIUM_RISK_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Outcome of scoring one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Churn probability in [0, 1]
    pub probability: f64,
    /// Predicted to churn
    pub churn: bool,
    pub risk: RiskLevel,
}

impl Prediction {
    fn from_probability(probability: f64) -> Self {
        Self {
            probability,
            churn: probability > 0.5,
            risk: RiskLevel::from_probability(probability),
        }
    }
}

/// Score every row of a raw table.
///
/// The table is encoded with the pipeline's registry, then aligned to the
/// model's feature list: absent features are zero-filled and extra columns
/// dropped before the ensemble sees it.
pub fn predict(df: &DataFrame, pipeline: &TrainedPipeline) -> Result<Vec<Prediction>> {
    score(&transform(df, &pipeline.registry)?, pipeline)
}

/// Score JSON records (same schema as training input, minus the outcome).
///
/// Records with no fields at all score as an all-zero feature row.
pub fn predict_records(
    records: &[Map<String, Value>],
    pipeline: &TrainedPipeline,
) -> Result<Vec<Prediction>> {
    let df = records_to_dataframe(records)?;
    // a frame without columns has no rows either
    let features = if df.width() == 0 {
        FeatureTable::from_columns(Vec::new(), Vec::new(), records.len())?
    } else {
        transform(&df, &pipeline.registry)?
    };

    let predictions = score(&features, pipeline)?;
    if predictions.len() != records.len() {
        return Err(ChurnError::InvalidRecord(format!(
            "{} predictions for {} records",
            predictions.len(),
            records.len()
        )));
    }
    Ok(predictions)
}

fn score(features: &FeatureTable, pipeline: &TrainedPipeline) -> Result<Vec<Prediction>> {
    let aligned = features.align(pipeline.model.feature_names());
    Ok(pipeline
        .model
        .predict_proba(aligned.values())?
        .into_iter()
        .map(Prediction::from_probability)
        .collect())
}

/// Accuracy in percent over the rows with a yes/no outcome, rounded to 2 dp
pub fn evaluate_accuracy(df: &DataFrame, pipeline: &TrainedPipeline) -> Result<f64> {
    let mask = outcome_mask(df)?;
    let labeled_rows: Vec<usize> = mask
        .iter()
        .enumerate()
        .filter_map(|(i, label)| label.map(|_| i))
        .collect();
    if labeled_rows.is_empty() {
        return Err(ChurnError::EmptyLabels);
    }

    let features = transform(df, &pipeline.registry)?
        .align(pipeline.model.feature_names())
        .select_rows(&labeled_rows);
    let predicted = pipeline.model.predict(features.values())?;

    let correct = predicted
        .iter()
        .zip(mask.iter().flatten())
        .filter(|(p, actual)| p == actual)
        .count();

    let accuracy = correct as f64 / labeled_rows.len() as f64 * 100.0;
    Ok((accuracy * 100.0).round() / 100.0)
}
