//! Pipeline module - encoding, training, inference and persistence

pub mod encoding;
pub mod loader;
pub mod predictor;
pub mod preprocess;
pub mod store;
pub mod target;
pub mod trainer;

pub use encoding::*;
pub use loader::*;
pub use predictor::*;
pub use preprocess::*;
pub use store::*;
pub use target::*;
pub use trainer::*;
