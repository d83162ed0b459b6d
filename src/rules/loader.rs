//! Load rotation and sandbox spellbook files

use std::fs;
use std::path::Path;

use crate::core::error::{AplError, Result};
use crate::rules::schema::RotationConfig;
use crate::sim::sandbox::SandboxConfig;

/// Load a rotation, picking TOML or JSON from the file extension
pub fn load_rotation(path: &Path) -> Result<RotationConfig> {
    let content = fs::read_to_string(path)?;
    match extension(path).as_deref() {
        Some("toml") => parse_rotation_toml(&content),
        Some("json") => parse_rotation_json(&content),
        _ => Err(AplError::UnsupportedFormat(path.display().to_string())),
    }
}

pub fn parse_rotation_toml(content: &str) -> Result<RotationConfig> {
    Ok(toml::from_str(content)?)
}

pub fn parse_rotation_json(content: &str) -> Result<RotationConfig> {
    Ok(serde_json::from_str(content)?)
}

/// Load a sandbox spellbook; always TOML
pub fn load_sandbox(path: &Path) -> Result<SandboxConfig> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}
