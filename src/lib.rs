//! churnscope: customer churn analytics library
//!
//! Loads tabular customer data, computes churn breakdowns, trains a bagged
//! decision-tree ensemble on the `Churn` outcome and serves everything over
//! an HTTP API.

pub mod cli;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod server;
pub mod service;
pub mod utils;

pub use error::{ChurnError, Result};
