//! churnscope: customer churn analytics CLI and HTTP API

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use churnscope::cli::{self, server_config, Cli, Commands};
use churnscope::pipeline::ModelStore;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Serve {
            host,
            port,
            allowed_origins,
            body_limit,
            request_timeout,
            training,
        } => cli::serve::run_serve(
            cli.service_config(Some(training)),
            server_config(host, *port, allowed_origins, *body_limit, *request_timeout),
        ),
        Commands::Train { input, training } => {
            cli::train::run_train(input, cli.service_config(Some(training)))
        }
        Commands::Summary { input, json } => {
            cli::summary::run_summary(input, cli.infer_schema_length, *json)
        }
        Commands::Predict { record } => {
            cli::predict::run_predict(&ModelStore::new(&cli.data_dir), record)
        }
    }
}
