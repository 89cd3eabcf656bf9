//! `summary` subcommand: churn analytics for a dataset file

use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use serde_json::json;

use crate::pipeline::load_dataset;
use crate::report::{
    billing_analysis, churn_summary, demographic_analysis, display_churn_summary,
    services_analysis, tenure_analysis,
};

pub fn run_summary(input: &Path, infer_schema_length: usize, as_json: bool) -> Result<()> {
    let df = load_dataset(input, infer_schema_length)
        .with_context(|| format!("Failed to load {}", input.display()))?;

    if as_json {
        let report = json!({
            "churnSummary": churn_summary(&df)?,
            "demographicAnalysis": demographic_analysis(&df)?,
            "servicesAnalysis": services_analysis(&df)?,
            "tenureAnalysis": tenure_analysis(&df)?,
            "billingAnalysis": billing_analysis(&df)?,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    display_churn_summary(&churn_summary(&df)?);

    let bands = tenure_analysis(&df)?;
    if !bands.is_empty() {
        println!();
        println!("    {}", style("Churn by tenure").white().bold());
        for band in &bands {
            println!(
                "      {:<6} {:>6} customers  {:>5.1}%",
                band.band, band.customers, band.churn_rate
            );
        }
    }

    let billing = billing_analysis(&df)?;
    println!();
    let average = match billing.avg_monthly_charges {
        Some(value) => format!("{:.2}", value),
        None => "n/a".to_string(),
    };
    println!(
        "    {} {}",
        style("Average monthly charges:").white().bold(),
        average
    );
    println!();
    Ok(())
}
