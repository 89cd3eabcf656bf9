//! Descriptive churn statistics computed straight from the raw dataset
//!
//! These never touch the model. Grouped rates are percentages computed as
//! `mean(churned) * 100` per group; groups with a null key are skipped and an
//! absent column yields an empty breakdown.

use std::collections::BTreeMap;

use polars::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::pipeline::{
    column_to_f64_vec, column_to_string_vec, count_labels, has_outcome, outcome_mask,
};

/// Add-on service columns broken down by the services analysis
pub const ADDITIONAL_SERVICES: [&str; 4] =
    ["OnlineSecurity", "TechSupport", "StreamingTV", "StreamingMovies"];

/// Upper bounds (inclusive) of the tenure bands, in months
const TENURE_BANDS: [(f64, &str); 5] = [
    (12.0, "0-12"),
    (24.0, "13-24"),
    (36.0, "25-36"),
    (48.0, "37-48"),
    (60.0, "49-60"),
];
const TENURE_OVERFLOW_BAND: &str = "60+";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChurnSummary {
    pub total_customers: usize,
    pub churn_rate: Option<f64>,
    pub retention_rate: Option<f64>,
    pub contract_breakdown: Vec<ContractChurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContractChurn {
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "Churn")]
    pub churn_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicAnalysis {
    /// Share of customers per gender, as a fraction of all customers
    pub gender_data: BTreeMap<String, f64>,
    pub senior_data: BTreeMap<String, f64>,
    pub partner_data: BTreeMap<String, f64>,
    pub dependent_data: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesAnalysis {
    pub internet_service_data: BTreeMap<String, f64>,
    pub additional_services_data: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenureBand {
    pub band: String,
    pub customers: usize,
    pub churned: usize,
    pub churn_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingAnalysis {
    pub avg_monthly_charges: Option<f64>,
    pub avg_monthly_charges_churned: Option<f64>,
    pub avg_monthly_charges_retained: Option<f64>,
    pub avg_tenure: Option<f64>,
    pub churned_customers: usize,
    pub retained_customers: usize,
}

/// Overall churn/retention rates plus the per-contract breakdown
pub fn churn_summary(df: &DataFrame) -> Result<ChurnSummary> {
    let total_customers = df.height();

    let (churn_rate, retention_rate) = if has_outcome(df) && total_customers > 0 {
        let (churned, retained, _) = count_labels(&outcome_mask(df)?);
        (
            Some(percentage(churned, total_customers)),
            Some(percentage(retained, total_customers)),
        )
    } else {
        (None, None)
    };

    let contract_breakdown = churn_rate_by(df, "Contract")?
        .into_iter()
        .map(|(contract, churn_rate)| ContractChurn {
            contract,
            churn_rate,
        })
        .collect();

    Ok(ChurnSummary {
        total_customers,
        churn_rate,
        retention_rate,
        contract_breakdown,
    })
}

pub fn demographic_analysis(df: &DataFrame) -> Result<DemographicAnalysis> {
    Ok(DemographicAnalysis {
        gender_data: value_shares(df, "gender")?,
        senior_data: churn_rate_by(df, "SeniorCitizen")?,
        partner_data: churn_rate_by(df, "Partner")?,
        dependent_data: churn_rate_by(df, "Dependents")?,
    })
}

pub fn services_analysis(df: &DataFrame) -> Result<ServicesAnalysis> {
    let mut additional_services_data = BTreeMap::new();
    for service in ADDITIONAL_SERVICES {
        additional_services_data.insert(service.to_string(), churn_rate_by(df, service)?);
    }

    Ok(ServicesAnalysis {
        internet_service_data: churn_rate_by(df, "InternetService")?,
        additional_services_data,
    })
}

/// Churn rate per tenure band; all bands are always reported
pub fn tenure_analysis(df: &DataFrame) -> Result<Vec<TenureBand>> {
    let mut counts: Vec<(usize, usize)> = vec![(0, 0); TENURE_BANDS.len() + 1];

    if let Some(col) = lookup(df, "tenure") {
        let tenure = column_to_f64_vec(col)?;
        let churned = churn_indicator(df)?;

        for (months, churned) in tenure.iter().zip(churned) {
            let Some(months) = months else { continue };
            let idx = TENURE_BANDS
                .iter()
                .position(|(upper, _)| *months <= *upper)
                .unwrap_or(TENURE_BANDS.len());
            counts[idx].0 += 1;
            if churned {
                counts[idx].1 += 1;
            }
        }
    }

    let labels = TENURE_BANDS
        .iter()
        .map(|(_, label)| *label)
        .chain(std::iter::once(TENURE_OVERFLOW_BAND));

    Ok(labels
        .zip(counts)
        .map(|(band, (customers, churned))| TenureBand {
            band: band.to_string(),
            customers,
            churned,
            churn_rate: if customers > 0 {
                percentage(churned, customers)
            } else {
                0.0
            },
        })
        .collect())
}

/// Average charges for churned vs retained customers
pub fn billing_analysis(df: &DataFrame) -> Result<BillingAnalysis> {
    let mask = if has_outcome(df) {
        outcome_mask(df)?
    } else {
        vec![None; df.height()]
    };
    let (churned_customers, retained_customers, _) = count_labels(&mask);

    let charges = match lookup(df, "MonthlyCharges") {
        Some(col) => column_to_f64_vec(col)?,
        None => vec![None; df.height()],
    };
    let tenure = match lookup(df, "tenure") {
        Some(col) => column_to_f64_vec(col)?,
        None => vec![None; df.height()],
    };

    let churned_charges: Vec<Option<f64>> = charges
        .iter()
        .zip(&mask)
        .map(|(c, m)| c.filter(|_| *m == Some(1)))
        .collect();
    let retained_charges: Vec<Option<f64>> = charges
        .iter()
        .zip(&mask)
        .map(|(c, m)| c.filter(|_| *m == Some(0)))
        .collect();

    Ok(BillingAnalysis {
        avg_monthly_charges: mean(&charges),
        avg_monthly_charges_churned: mean(&churned_charges),
        avg_monthly_charges_retained: mean(&retained_charges),
        avg_tenure: mean(&tenure),
        churned_customers,
        retained_customers,
    })
}

/// Churn percentage per distinct value of `column`, keyed in sorted order
pub fn churn_rate_by(df: &DataFrame, column: &str) -> Result<BTreeMap<String, f64>> {
    let Some(col) = lookup(df, column) else {
        return Ok(BTreeMap::new());
    };
    if !has_outcome(df) {
        return Ok(BTreeMap::new());
    }

    let keys = column_to_string_vec(col)?;
    let churned = churn_indicator(df)?;

    let mut groups: BTreeMap<String, (usize, usize)> = BTreeMap::new();
    for (key, churned) in keys.into_iter().zip(churned) {
        let Some(key) = key else { continue };
        let entry = groups.entry(key).or_insert((0, 0));
        entry.0 += 1;
        if churned {
            entry.1 += 1;
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, (total, churned))| (key, percentage(churned, total)))
        .collect())
}

/// Fraction of rows per distinct value of `column`
pub fn value_shares(df: &DataFrame, column: &str) -> Result<BTreeMap<String, f64>> {
    let Some(col) = lookup(df, column) else {
        return Ok(BTreeMap::new());
    };

    let keys = column_to_string_vec(col)?;
    let present = keys.iter().flatten().count();

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in keys.into_iter().flatten() {
        *counts.entry(key).or_insert(0) += 1;
    }

    Ok(counts
        .into_iter()
        .map(|(key, count)| (key, count as f64 / present as f64))
        .collect())
}

fn churn_indicator(df: &DataFrame) -> Result<Vec<bool>> {
    if !has_outcome(df) {
        return Ok(vec![false; df.height()]);
    }
    Ok(outcome_mask(df)?
        .into_iter()
        .map(|v| v == Some(1))
        .collect())
}

/// Column by name, exact match first, then case-insensitive
fn lookup<'a>(df: &'a DataFrame, name: &str) -> Option<&'a Column> {
    if let Ok(col) = df.column(name) {
        return Some(col);
    }
    let actual = df
        .get_column_names()
        .into_iter()
        .find(|c| c.as_str().eq_ignore_ascii_case(name))?
        .clone();
    df.column(actual.as_str()).ok()
}

fn percentage(part: usize, total: usize) -> f64 {
    part as f64 / total as f64 * 100.0
}

fn mean(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}
