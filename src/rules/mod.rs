//! Rotation configuration: schema, loading and extension registry

pub mod extensions;
pub mod loader;
pub mod schema;

pub use extensions::{CustomActionFactory, CustomValueFactory, Extensions};
pub use loader::{load_rotation, load_sandbox, parse_rotation_json, parse_rotation_toml};
pub use schema::{
    ActionConfig, ActionKindConfig, GroupConfig, ListItem, PrepullItem, RotationConfig,
    ValueConfig, ValueKindConfig, VariableConfig,
};
