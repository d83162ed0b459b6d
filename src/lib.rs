//! APL Engine - action priority list decision engine
//!
//! Chooses and executes behavior for one simulated unit inside a
//! discrete-event combat simulation. Values are typed expression trees,
//! actions form a tree with a finalize/reset/ready/execute contract, and a
//! [`Rotation`] runs the per-tick decision loop over them.

pub mod action;
pub mod core;
pub mod rotation;
pub mod rules;
pub mod sim;
pub mod validation;
pub mod value;

pub use crate::core::error::{AplError, Result};
pub use crate::core::{EngineConfig, SimDuration};
pub use rotation::{Rotation, RotationBuilder};
pub use rules::{load_rotation, Extensions, RotationConfig};
pub use sim::{SandboxUnit, Simulation};
pub use validation::{LogLevel, RotationStats, Validation};
