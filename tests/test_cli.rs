//! Tests for CLI argument parsing and the offline subcommands

mod common;

use std::path::PathBuf;

use assert_cmd::Command;
use churnscope::cli::{server_config, Cli, Commands};
use clap::Parser;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_serve_defaults() {
    let cli = Cli::parse_from(["churnscope", "serve"]);

    assert_eq!(cli.data_dir, PathBuf::from("data"));
    assert_eq!(cli.infer_schema_length, 10000);
    match cli.command {
        Commands::Serve {
            host,
            port,
            allowed_origins,
            training,
            ..
        } => {
            assert_eq!(host, "127.0.0.1");
            assert_eq!(port, 8000);
            assert!(allowed_origins.is_empty());
            assert_eq!(training.n_estimators, 100);
            assert_eq!(training.seed, 42);
        }
        other => panic!("expected serve, got {:?}", other),
    }
}

#[test]
fn test_cli_serve_default_origins() {
    let config = server_config("0.0.0.0", 9000, &[], 1024, 30);
    assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    assert_eq!(
        config.allowed_origins,
        vec!["http://localhost:5173", "http://localhost:3000"]
    );
}

#[test]
fn test_cli_serve_custom_origins() {
    let cli = Cli::parse_from([
        "churnscope",
        "serve",
        "--allowed-origin",
        "https://dash.example.com/",
        "--allowed-origin",
        "http://localhost:8080",
    ]);
    match cli.command {
        Commands::Serve {
            allowed_origins, ..
        } => assert_eq!(
            allowed_origins,
            vec!["https://dash.example.com", "http://localhost:8080"]
        ),
        other => panic!("expected serve, got {:?}", other),
    }
}

#[test]
fn test_cli_rejects_zero_estimators() {
    assert!(Cli::try_parse_from(["churnscope", "train", "-i", "x.csv", "--n-estimators", "0"]).is_err());
}

#[test]
fn test_cli_rejects_bad_origin() {
    assert!(Cli::try_parse_from(["churnscope", "serve", "--allowed-origin", "localhost"]).is_err());
}

#[test]
fn test_cli_global_data_dir_after_subcommand() {
    let cli = Cli::parse_from(["churnscope", "predict", "--record", "{}", "--data-dir", "/tmp/m"]);
    assert_eq!(cli.data_dir, PathBuf::from("/tmp/m"));
}

#[test]
fn test_summary_json_output() {
    let (_dir, csv) = common::create_temp_csv(common::SMALL_CSV);

    Command::cargo_bin("churnscope")
        .unwrap()
        .args(["summary", "--json", "-i"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"totalCustomers\": 3"))
        .stdout(predicate::str::contains("Month-to-month"));
}

#[test]
fn test_summary_table_output() {
    let (_dir, csv) = common::create_temp_csv(common::SMALL_CSV);

    Command::cargo_bin("churnscope")
        .unwrap()
        .args(["summary", "-i"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("CHURN SUMMARY"))
        .stdout(predicate::str::contains("Average monthly charges: 45.00"));
}

#[test]
fn test_summary_table_without_charges() {
    let (_dir, csv) = common::create_temp_csv("customerID,gender,Churn\n1,Male,Yes\n2,Female,No\n");

    Command::cargo_bin("churnscope")
        .unwrap()
        .args(["summary", "-i"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Average monthly charges: n/a"));
}

#[test]
fn test_predict_without_model_fails() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("churnscope")
        .unwrap()
        .args(["predict", "--record", r#"{"tenure": 1}"#, "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No trained model"));
}

#[test]
fn test_train_then_predict() {
    let (_input_dir, csv) = common::create_temp_csv(&common::telco_csv(90));
    let data_dir = TempDir::new().unwrap();

    Command::cargo_bin("churnscope")
        .unwrap()
        .args(["train", "--n-estimators", "10", "-i"])
        .arg(&csv)
        .arg("--data-dir")
        .arg(data_dir.path())
        .assert()
        .success();

    assert!(data_dir.path().join("model.bin").exists());
    assert!(data_dir.path().join("encoders.json").exists());
    assert!(data_dir.path().join("dataset.csv").exists());

    Command::cargo_bin("churnscope")
        .unwrap()
        .args([
            "predict",
            "--record",
            r#"{"tenure": 2, "Contract": "Month-to-month"}"#,
            "--data-dir",
        ])
        .arg(data_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("churnProbability"));
}

#[test]
fn test_train_parquet_input() {
    let mut df = common::telco_dataframe(60);
    let (_input_dir, parquet) = common::create_temp_parquet(&mut df);
    let data_dir = TempDir::new().unwrap();

    Command::cargo_bin("churnscope")
        .unwrap()
        .args(["train", "--n-estimators", "5", "-i"])
        .arg(&parquet)
        .arg("--data-dir")
        .arg(data_dir.path())
        .assert()
        .success();

    assert!(data_dir.path().join("model.bin").exists());
}
