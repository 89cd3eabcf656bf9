//! Preprocessing raw customer tables into numeric feature tables
//!
//! `fit_transform` learns an [`EncodingRegistry`] from a labeled upload;
//! `transform` replays that registry on new records. Categorical columns are
//! label encoded, everything else is coerced to f64 with mean imputation.

use ndarray::Array2;
use polars::prelude::*;

use super::encoding::{EncodingRegistry, LabelEncoder};
use super::loader::{column_to_f64_vec, column_to_string_vec};
use super::target::OUTCOME_COLUMN;
use crate::error::{ChurnError, Result};

/// Identifier column, matched case-insensitively. Never a feature.
pub const IDENTIFIER_COLUMN: &str = "customerID";

/// Columns always treated as categorical when present
pub const CATEGORICAL_COLUMNS: [&str; 15] = [
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
];

/// Numeric-only table aligned row-for-row with the source dataset
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    names: Vec<String>,
    values: Array2<f64>,
}

impl FeatureTable {
    /// Assemble a table from per-column values
    pub fn from_columns(names: Vec<String>, columns: Vec<Vec<f64>>, rows: usize) -> Result<Self> {
        if names.len() != columns.len() {
            return Err(ChurnError::InvalidRecord(format!(
                "{} feature names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        if let Some((name, _)) = names
            .iter()
            .zip(columns.iter())
            .find(|(_, col)| col.len() != rows)
        {
            return Err(ChurnError::InvalidRecord(format!(
                "feature '{}' does not have {} rows",
                name, rows
            )));
        }

        let values = Array2::from_shape_fn((rows, columns.len()), |(r, c)| columns[c][r]);
        Ok(Self { names, values })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.values.ncols()
    }

    /// Values of one named feature
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.names.iter().position(|n| n == name)?;
        Some(self.values.column(idx).to_vec())
    }

    /// Reorder and subset to exactly `expected`, zero-filling absent features
    pub fn align(&self, expected: &[String]) -> Self {
        let positions: Vec<Option<usize>> = expected
            .iter()
            .map(|name| self.names.iter().position(|n| n == name))
            .collect();

        let values = Array2::from_shape_fn((self.n_rows(), expected.len()), |(r, c)| {
            positions[c].map_or(0.0, |src| self.values[[r, src]])
        });

        Self {
            names: expected.to_vec(),
            values,
        }
    }

    /// Keep only the given rows, in order
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            values: self.values.select(ndarray::Axis(0), rows),
        }
    }
}

/// Whether a column name is the customer identifier
pub fn is_identifier(name: &str) -> bool {
    name.eq_ignore_ascii_case(IDENTIFIER_COLUMN)
}

/// Columns eligible as model features, in dataset order
pub fn feature_columns(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|c| c.as_str())
        .filter(|name| !is_identifier(name) && *name != OUTCOME_COLUMN)
        .map(str::to_string)
        .collect()
}

/// Fit encoders and means on a training table and encode it
pub fn fit_transform(df: &DataFrame) -> Result<(FeatureTable, EncodingRegistry)> {
    let names = feature_columns(df);
    let mut registry = EncodingRegistry::new();
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(names.len());

    for name in &names {
        let col = df.column(name)?;

        if is_categorical(name, col)? {
            let values = categorical_values(col)?;
            let encoder = LabelEncoder::fit(&values);
            registry.insert_encoder(name, encoder);
            let codes = values
                .iter()
                .map(|v| registry.encode(name, v))
                .collect::<Result<Vec<f64>>>()?;
            columns.push(codes);
        } else {
            let raw = column_to_f64_vec(col)?;
            let mean = present_mean(&raw);
            registry.insert_mean(name, mean);
            columns.push(impute(&raw, mean));
        }
    }

    let table = FeatureTable::from_columns(names, columns, df.height())?;
    Ok((table, registry))
}

/// Encode a table with a previously fitted registry.
///
/// Columns with an encoder are label encoded and fail on unseen categories.
/// Numeric columns impute with the training-time mean, or with the mean of
/// the present values for columns the registry never saw.
pub fn transform(df: &DataFrame, registry: &EncodingRegistry) -> Result<FeatureTable> {
    let names = feature_columns(df);
    let mut columns: Vec<Vec<f64>> = Vec::with_capacity(names.len());

    for name in &names {
        let col = df.column(name)?;

        if registry.encoder(name).is_some() {
            let codes = categorical_values(col)?
                .iter()
                .map(|v| registry.encode(name, v))
                .collect::<Result<Vec<f64>>>()?;
            columns.push(codes);
        } else {
            let raw = column_to_f64_vec(col)?;
            let mean = registry
                .mean(name)
                .unwrap_or_else(|| present_mean(&raw));
            columns.push(impute(&raw, mean));
        }
    }

    FeatureTable::from_columns(names, columns, df.height())
}

/// Known categorical columns, plus text columns that are not purely numeric
fn is_categorical(name: &str, col: &Column) -> Result<bool> {
    if CATEGORICAL_COLUMNS.contains(&name) {
        return Ok(true);
    }
    if !matches!(col.dtype(), DataType::String) {
        return Ok(false);
    }

    let values = column_to_string_vec(col)?;
    let numeric_text = values
        .iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .all(|s| super::loader::parse_number(s).is_some());
    Ok(!numeric_text)
}

/// Category strings for a column; nulls become the empty category
fn categorical_values(col: &Column) -> Result<Vec<String>> {
    Ok(column_to_string_vec(col)?
        .into_iter()
        .map(Option::unwrap_or_default)
        .collect())
}

/// Mean of the present values, 0.0 when none are present
pub fn present_mean(values: &[Option<f64>]) -> f64 {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn impute(values: &[Option<f64>], fill: f64) -> Vec<f64> {
    values.iter().map(|v| v.unwrap_or(fill)).collect()
}
