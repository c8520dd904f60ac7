//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read `{}`", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse `{}`", .0.display())]
    Toml(PathBuf, #[source] toml::de::Error),

    /// A field holds a value the current command cannot work with.
    #[error("[{field}] {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
