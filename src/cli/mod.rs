//! CLI module - argument parsing and subcommand runners

mod args;
pub mod predict;
pub mod serve;
pub mod summary;
pub mod train;

pub use args::*;
