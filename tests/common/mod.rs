//! Shared test utilities and fixture generators

#![allow(dead_code)]

use std::path::PathBuf;

use churnscope::pipeline::{parse_csv_bytes, TrainerConfig};
use churnscope::service::{ChurnService, ServiceConfig};
use polars::prelude::*;
use tempfile::TempDir;

/// Three customers: one month-to-month churner, two retained on longer contracts
pub const SMALL_CSV: &str = "\
customerID,gender,Contract,MonthlyCharges,Churn
1,Male,Month-to-month,70.0,Yes
2,Female,Two year,20.0,No
3,Male,One year,45.0,No
";

/// Same shape as [`SMALL_CSV`] without outcomes
pub const UNLABELED_CSV: &str = "\
customerID,gender,Contract,MonthlyCharges
1,Male,Month-to-month,70.0
2,Female,Two year,20.0
";

const CONTRACTS: [&str; 3] = ["Month-to-month", "One year", "Two year"];
const INTERNET: [&str; 3] = ["DSL", "Fiber optic", "No"];

/// Telco-style CSV where churn is fully determined by contract and tenure:
/// month-to-month customers with tenure under 36 months churn.
pub fn telco_csv(rows: usize) -> String {
    let mut csv = String::from(
        "customerID,gender,SeniorCitizen,Partner,Dependents,tenure,PhoneService,\
InternetService,OnlineSecurity,TechSupport,StreamingTV,StreamingMovies,Contract,\
MonthlyCharges,TotalCharges,Churn\n",
    );
    let yes_no = |flag: bool| if flag { "Yes" } else { "No" };
    for i in 0..rows {
        let contract = CONTRACTS[i % 3];
        let tenure = (i * 7) % 72 + 1;
        let monthly = 20.0 + (i % 50) as f64 * 1.5;
        let churn = contract == "Month-to-month" && tenure < 36;
        csv.push_str(&format!(
            "C{:04},{},{},{},{},{},{},{},{},{},{},{},{},{:.2},{:.2},{}\n",
            i,
            if i % 2 == 0 { "Male" } else { "Female" },
            u8::from(i % 5 == 0),
            yes_no(i % 4 < 2),
            yes_no(i % 6 == 0),
            tenure,
            yes_no(i % 10 != 0),
            INTERNET[(i / 3) % 3],
            yes_no((i / 2) % 2 == 0),
            yes_no((i / 4) % 2 == 0),
            yes_no(i % 3 == 1),
            yes_no(i % 7 < 3),
            contract,
            monthly,
            monthly * tenure as f64,
            yes_no(churn),
        ));
    }
    csv
}

pub fn small_dataframe() -> DataFrame {
    parse_csv_bytes(SMALL_CSV.as_bytes(), 100).unwrap()
}

pub fn telco_dataframe(rows: usize) -> DataFrame {
    parse_csv_bytes(telco_csv(rows).as_bytes(), 10_000).unwrap()
}

/// Small ensemble so tests stay fast
pub fn fast_trainer() -> TrainerConfig {
    TrainerConfig {
        n_estimators: 15,
        seed: 7,
        max_depth: None,
    }
}

pub fn service_config(dir: &TempDir) -> ServiceConfig {
    ServiceConfig {
        data_dir: dir.path().join("data"),
        trainer: fast_trainer(),
        ..Default::default()
    }
}

/// A fresh service rooted in a temporary data directory
pub fn open_service() -> (TempDir, ChurnService) {
    let dir = TempDir::new().unwrap();
    let service = ChurnService::open(service_config(&dir)).unwrap();
    (dir, service)
}

/// Create a temporary directory with a CSV file holding `contents`
pub fn create_temp_csv(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("customers.csv");
    std::fs::write(&csv_path, contents).unwrap();
    (temp_dir, csv_path)
}

/// Create a temporary directory with a Parquet copy of `df`
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("customers.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

pub fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-2,
        "expected {} got {}",
        expected,
        actual
    );
}
