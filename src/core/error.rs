use thiserror::Error;

use crate::action::ActionKey;

#[derive(Error, Debug)]
pub enum AplError {
    #[error("[USER_ERROR] Infinite loop detected after {limit} actions in one tick, current action:\n{action}")]
    ActionLoopLimit { limit: usize, action: String },

    #[error("Wrong controlling action in pop(): expected {expected:?}, found {found:?}")]
    ControllingStackMismatch {
        expected: ActionKey,
        found: Option<ActionKey>,
    },

    #[error("Rotation halted by an earlier engine failure")]
    Halted,

    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported rotation format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AplError>;
