//! `predict` subcommand: score JSON records with the persisted model

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Map, Value};

use crate::pipeline::{predict_records, ModelStore, Prediction};

pub fn run_predict(store: &ModelStore, record: &str) -> Result<()> {
    let records = parse_records(record)?;
    let pipeline = store
        .load()
        .context("Failed to load persisted model")?
        .ok_or_else(|| {
            anyhow!(
                "No trained model in {}. Run `churnscope train` first.",
                store.dir().display()
            )
        })?;

    let predictions = predict_records(&records, &pipeline)?;
    let output: Vec<Value> = predictions.iter().map(prediction_json).collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Parse a JSON object or an array of objects
pub fn parse_records(raw: &str) -> Result<Vec<Map<String, Value>>> {
    let value: Value = serde_json::from_str(raw).context("Record is not valid JSON")?;
    match value {
        Value::Object(map) => Ok(vec![map]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(anyhow!("Expected a JSON object, got {}", other)),
            })
            .collect(),
        other => Err(anyhow!("Expected a JSON object or array, got {}", other)),
    }
}

fn prediction_json(prediction: &Prediction) -> Value {
    json!({
        "churnProbability": prediction.probability,
        "prediction": if prediction.churn { "Yes" } else { "No" },
        "riskLevel": prediction.risk,
    })
}
