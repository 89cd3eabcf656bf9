//! Label encoders and the registry that pairs them with a trained model

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::loader::parse_number;
use crate::error::{ChurnError, Result};

/// Maps the categories observed at training time to integer codes.
///
/// Classes are kept sorted; a category's code is its index in that order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit an encoder over the distinct observed values
    pub fn fit<S: AsRef<str>>(values: &[S]) -> Self {
        let classes: BTreeSet<&str> = values.iter().map(AsRef::as_ref).collect();
        Self {
            classes: classes.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Code for a value, or `None` if it was never seen while fitting.
    ///
    /// A numeric value also matches a class spelling the same number, so
    /// `1` from a JSON record finds a `1.0` category read from CSV.
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
            .or_else(|| {
                let number = parse_number(value)?;
                self.classes
                    .iter()
                    .position(|class| parse_number(class) == Some(number))
            })
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }
}

/// Fitted preprocessing state: one encoder per categorical column plus the
/// training-time mean of every numeric column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodingRegistry {
    encoders: BTreeMap<String, LabelEncoder>,
    numeric_means: BTreeMap<String, f64>,
}

impl EncodingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_encoder(&mut self, column: &str, encoder: LabelEncoder) {
        self.encoders.insert(column.to_string(), encoder);
    }

    pub fn insert_mean(&mut self, column: &str, mean: f64) {
        self.numeric_means.insert(column.to_string(), mean);
    }

    pub fn encoder(&self, column: &str) -> Option<&LabelEncoder> {
        self.encoders.get(column)
    }

    pub fn mean(&self, column: &str) -> Option<f64> {
        self.numeric_means.get(column).copied()
    }

    /// Names of the categorical columns, sorted
    pub fn categorical_columns(&self) -> impl Iterator<Item = &str> {
        self.encoders.keys().map(String::as_str)
    }

    /// Names of the numeric columns with a recorded mean, sorted
    pub fn numeric_columns(&self) -> impl Iterator<Item = &str> {
        self.numeric_means.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty() && self.numeric_means.is_empty()
    }

    /// Encode one value of a categorical column.
    ///
    /// Fails with `UnseenCategory` rather than guessing a code.
    pub fn encode(&self, column: &str, value: &str) -> Result<f64> {
        let encoder = self.encoders.get(column).ok_or_else(|| {
            ChurnError::InvalidRecord(format!("column '{}' has no fitted encoder", column))
        })?;

        encoder
            .encode(value)
            .map(|code| code as f64)
            .ok_or_else(|| ChurnError::UnseenCategory {
                column: column.to_string(),
                value: value.to_string(),
            })
    }
}
