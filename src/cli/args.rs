//! Command-line argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::{TrainerConfig, DEFAULT_INFER_SCHEMA_LENGTH};
use crate::server::{ServerConfig, DEFAULT_ALLOWED_ORIGINS, DEFAULT_BODY_LIMIT};
use crate::service::ServiceConfig;

/// churnscope - customer churn analytics and prediction
#[derive(Parser, Debug)]
#[command(name = "churnscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding the persisted dataset, model and encoders
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Number of rows to use for CSV schema inference.
    /// Use 0 for full table scan.
    #[arg(long, global = true, default_value_t = DEFAULT_INFER_SCHEMA_LENGTH)]
    pub infer_schema_length: usize,
}

/// Model hyperparameters shared by `serve` and `train`
#[derive(Args, Debug, Clone)]
pub struct TrainingArgs {
    /// Number of trees in the ensemble
    #[arg(long, default_value = "100", value_parser = validate_n_estimators)]
    pub n_estimators: usize,

    /// Seed for bootstrap sampling
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Maximum tree depth (unbounded when omitted)
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl TrainingArgs {
    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig {
            n_estimators: self.n_estimators,
            seed: self.seed,
            max_depth: self.max_depth,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Interface to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Origin allowed by CORS (repeatable).
        /// Defaults to the local dashboard dev servers.
        #[arg(long = "allowed-origin", value_parser = validate_origin)]
        allowed_origins: Vec<String>,

        /// Maximum request body size in bytes
        #[arg(long, default_value_t = DEFAULT_BODY_LIMIT)]
        body_limit: usize,

        /// Per-request timeout in seconds
        #[arg(long, default_value = "300")]
        request_timeout: u64,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Train a model from a dataset and persist it to the data directory
    Train {
        /// Input file path (CSV or Parquet) with a Churn column
        #[arg(short, long)]
        input: PathBuf,

        #[command(flatten)]
        training: TrainingArgs,
    },

    /// Print churn analytics for a dataset
    Summary {
        /// Input file path (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Emit every analytics view as JSON instead of tables
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Score records with the persisted model
    Predict {
        /// A JSON object or array of objects
        #[arg(short, long)]
        record: String,
    },
}

impl Cli {
    pub fn service_config(&self, training: Option<&TrainingArgs>) -> ServiceConfig {
        ServiceConfig {
            data_dir: self.data_dir.clone(),
            trainer: training
                .map(TrainingArgs::trainer_config)
                .unwrap_or_default(),
            infer_schema_length: self.infer_schema_length,
        }
    }
}

/// Server configuration from the `serve` arguments, with default origins
/// when none were given
pub fn server_config(
    host: &str,
    port: u16,
    allowed_origins: &[String],
    body_limit: usize,
    request_timeout: u64,
) -> ServerConfig {
    let allowed_origins = if allowed_origins.is_empty() {
        DEFAULT_ALLOWED_ORIGINS.iter().map(|s| s.to_string()).collect()
    } else {
        allowed_origins.to_vec()
    };
    ServerConfig {
        host: host.to_string(),
        port,
        allowed_origins,
        body_limit,
        request_timeout: std::time::Duration::from_secs(request_timeout),
    }
}

fn validate_n_estimators(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;
    if value == 0 {
        Err("n_estimators must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

fn validate_origin(s: &str) -> Result<String, String> {
    if s.starts_with("http://") || s.starts_with("https://") {
        Ok(s.trim_end_matches('/').to_string())
    } else {
        Err(format!("origin '{}' must start with http:// or https://", s))
    }
}
