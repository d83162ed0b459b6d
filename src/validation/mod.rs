//! Non-fatal diagnostics raised while building and finalizing a rotation

pub mod sink;
pub mod stats;

pub use sink::{EntryValidations, LogLevel, Phase, UuidValidations, Validation, ValidationSink};
pub use stats::{ActionStats, RotationStats};
