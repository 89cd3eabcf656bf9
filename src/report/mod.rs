//! Report module - churn analytics and terminal summaries

pub mod analytics;
pub mod summary;

pub use analytics::*;
pub use summary::*;
