//! `train` subcommand: fit a model offline and persist it for `serve`

use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use polars::prelude::*;

use crate::pipeline::load_dataset;
use crate::report::TrainingReport;
use crate::service::{ChurnService, ServiceConfig};
use crate::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_step_header, print_step_time, print_success,
};

/// Number of features listed in the training summary
const TOP_FEATURES: usize = 10;

pub fn run_train(input: &Path, config: ServiceConfig) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));

    print_step_header(1, "Load dataset");
    let step_start = Instant::now();
    let bytes = csv_bytes(input, config.infer_schema_length)?;
    print_success(&format!("Read {}", input.display()));
    print_step_time(step_start.elapsed());

    print_step_header(2, "Train model");
    let service = ChurnService::open(config).context("Failed to open churn service")?;
    let step_start = Instant::now();
    let spinner = create_spinner("Fitting tree ensemble...");
    let upload = match service.upload(&bytes) {
        Ok(upload) => upload,
        Err(e) => {
            finish_with_warning(&spinner, "Training failed");
            return Err(e.into());
        }
    };
    if !upload.trained {
        finish_with_warning(&spinner, "No Churn column");
        bail!("Dataset has no 'Churn' column, nothing to train");
    }
    finish_with_success(&spinner, "Model trained and saved");
    let train_time = step_start.elapsed();
    print_step_time(train_time);

    let mut report = TrainingReport::new(upload.rows, upload.columns);
    report.trained = upload.trained;
    report.set_train_time(train_time);
    report.accuracy = Some(service.model_accuracy()?);
    report.top_features = service
        .feature_importance()?
        .into_iter()
        .take(TOP_FEATURES)
        .map(|f| (f.feature, f.importance))
        .collect();
    report.display();

    print_completion(&format!(
        "Model written to {}",
        service.store().dir().display()
    ));
    Ok(())
}

/// Raw CSV bytes for the input, converting Parquet to CSV
fn csv_bytes(input: &Path, infer_schema_length: usize) -> Result<Vec<u8>> {
    let is_csv = input
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        return std::fs::read(input)
            .with_context(|| format!("Failed to read {}", input.display()));
    }

    let mut df = load_dataset(input, infer_schema_length)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let mut buffer = Vec::new();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)
        .context("Failed to convert dataset to CSV")?;
    Ok(buffer)
}
