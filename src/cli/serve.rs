//! `serve` subcommand: open the service and run the HTTP API

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::server::{serve, ServerConfig};
use crate::service::{ChurnService, ServiceConfig};
use crate::utils::{print_banner, print_info, print_server_config};

pub fn run_serve(service_config: ServiceConfig, server_config: ServerConfig) -> Result<()> {
    print_banner(env!("CARGO_PKG_VERSION"));
    print_server_config(
        &server_config.bind_addr(),
        &service_config.data_dir,
        &server_config.allowed_origins,
        service_config.trainer.n_estimators,
    );

    let service = ChurnService::open(service_config).context("Failed to open churn service")?;
    if service.has_model() {
        print_info("Restored persisted model");
    } else {
        print_info("No model yet, waiting for an upload with a Churn column");
    }
    let service = Arc::new(service);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime
        .block_on(serve(service, server_config))
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}
