//! Error types for settings loading.

use bbm92_link::LinkError;
use thiserror::Error;

/// Errors that can occur while loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// I/O error reading the settings file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The link parameters were rejected by the model.
    #[error("Invalid link parameters: {0}")]
    Link(#[from] LinkError),

    /// The loss profile is malformed.
    #[error("Invalid loss profile: {0}")]
    InvalidProfile(String),
}
