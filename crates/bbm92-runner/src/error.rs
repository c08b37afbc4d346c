use bbm92_link::LinkError;
use bbm92_settings::SettingsError;
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Link model error: {0}")]
    Link(#[from] LinkError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Settings for link '{0}' have no loss profile to sweep")]
    NoProfile(String),
}
