pub mod config;
pub mod duration;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use duration::SimDuration;
pub use error::{AplError, Result};
