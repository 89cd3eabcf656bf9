//! Dataset loading for uploaded CSV bytes, files on disk and JSON records

use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;
use serde_json::{Map, Value};

use crate::error::{ChurnError, Result};

/// Rows used for CSV schema inference unless configured otherwise
pub const DEFAULT_INFER_SCHEMA_LENGTH: usize = 10_000;

/// Parse uploaded CSV bytes into a DataFrame
pub fn parse_csv_bytes(bytes: &[u8], infer_schema_length: usize) -> Result<DataFrame> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ChurnError::MalformedUpload("file is empty".to_string()));
    }
    std::str::from_utf8(bytes)
        .map_err(|_| ChurnError::MalformedUpload("file is not valid UTF-8".to_string()))?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(schema_length(infer_schema_length))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()
        .map_err(|e| ChurnError::MalformedUpload(e.to_string()))?;

    if df.height() == 0 {
        return Err(ChurnError::MalformedUpload(
            "file contains a header but no rows".to_string(),
        ));
    }

    Ok(df)
}

/// Load a dataset from a file (CSV or Parquet based on extension)
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    match extension.as_str() {
        "csv" => {
            let bytes = std::fs::read(path)?;
            parse_csv_bytes(&bytes, infer_schema_length)
        }
        "parquet" => Ok(LazyFrame::scan_parquet(path, Default::default())?.collect()?),
        _ => Err(ChurnError::MalformedUpload(format!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ))),
    }
}

/// Build a DataFrame from JSON prediction records.
///
/// Columns appear in first-seen key order. A key whose values are all numbers
/// (or null) becomes a Float64 column, anything else a String column.
/// Records missing a key get a null in that column.
pub fn records_to_dataframe(records: &[Map<String, Value>]) -> Result<DataFrame> {
    if records.is_empty() {
        return Err(ChurnError::InvalidRecord("no records supplied".to_string()));
    }

    let mut keys: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !keys.contains(&key.as_str()) {
                keys.push(key);
            }
        }
    }

    let mut columns: Vec<Column> = Vec::with_capacity(keys.len());
    for key in keys {
        let values: Vec<Option<&Value>> = records
            .iter()
            .map(|r| r.get(key).filter(|v| !v.is_null()))
            .collect();

        if let Some(bad) = values
            .iter()
            .flatten()
            .find(|v| v.is_array() || v.is_object())
        {
            return Err(ChurnError::InvalidRecord(format!(
                "field '{}' must be a scalar, got {}",
                key, bad
            )));
        }

        let all_numeric = values.iter().flatten().all(|v| v.is_number());
        let column = if all_numeric {
            let floats: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.and_then(Value::as_f64))
                .collect();
            Column::new(key.into(), floats)
        } else {
            let strings: Vec<Option<String>> = values
                .iter()
                .map(|v| {
                    v.map(|value| match value {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect();
            Column::new(key.into(), strings)
        };
        columns.push(column);
    }

    Ok(DataFrame::new(columns)?)
}

/// Whether the DataFrame has a column with exactly this name
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Convert a column to a Vec of Option<String> for comparison and encoding
pub fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}

/// Convert a column to numeric values.
///
/// Text is trimmed and parsed; anything unparseable becomes `None`.
pub fn column_to_f64_vec(col: &Column) -> Result<Vec<Option<f64>>> {
    if col.dtype().is_primitive_numeric() {
        let cast = col.cast(&DataType::Float64)?;
        return Ok(cast
            .f64()?
            .into_iter()
            .map(|v| v.filter(|n| n.is_finite()))
            .collect());
    }

    if matches!(col.dtype(), DataType::Boolean) {
        return Ok(col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
            .collect());
    }

    Ok(column_to_string_vec(col)?
        .into_iter()
        .map(|v| v.and_then(|s| parse_number(&s)))
        .collect())
}

/// Parse a trimmed numeric literal, rejecting blanks and non-finite values
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

fn schema_length(infer_schema_length: usize) -> Option<usize> {
    // 0 means a full table scan
    if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    }
}
