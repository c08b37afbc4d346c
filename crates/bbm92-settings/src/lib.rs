//! # bbm92-settings
//!
//! YAML settings for BBM92 link studies.
//!
//! A settings file describes the detectors of one link and, optionally, a
//! time-varying loss profile to sweep:
//!
//! ```yaml
//! name: ogs-sat
//! d: 2
//! jitters: 1.0e-9
//! dead_times: 1.0e-8
//! darkcounts_OGS: 300
//! darkcounts_SAT: 300
//! bit_error: 0.02
//! phase_error: 0.02
//! loss: { a: 20, b: 40, format: dB }
//! profile:
//!   type: overpass
//!   step_s: 5
//! ```

mod error;
mod profile;
mod settings;

pub use error::SettingsError;
pub use profile::{LossProfile, ProfileSample, MAX_PROFILE_SAMPLES};
pub use settings::{LinkSettings, LossSettings};

use std::path::Path;
use tracing::debug;

/// Loads and validates settings from a YAML file.
pub fn load_settings(path: impl AsRef<Path>) -> Result<LinkSettings, SettingsError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let settings = load_settings_from_str(&content)?;
    debug!("Loaded link '{}' from {}", settings.name, path.display());
    Ok(settings)
}

/// Parses and validates settings from a YAML string.
///
/// The link parameters are resolved once so that malformed detector
/// arrays are reported here rather than when a model is built.
pub fn load_settings_from_str(yaml: &str) -> Result<LinkSettings, SettingsError> {
    let settings: LinkSettings = serde_yaml::from_str(yaml)?;
    settings.link_params().resolve()?;
    if let Some(profile) = &settings.profile {
        profile.validate()?;
    }
    Ok(settings)
}
