//! Time-varying loss profiles.
//!
//! A profile turns into a list of [`ProfileSample`]s, each holding the loss
//! of both parties at one instant. Party A is the ground side with a fixed
//! terrestrial loss; party B sees the free-space channel.

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};

/// Largest number of samples a profile may expand to.
pub const MAX_PROFILE_SAMPLES: usize = 1_000_000;

/// Loss of both parties at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSample {
    /// Time of the sample in seconds.
    pub time_s: f64,
    /// Party A loss (dB).
    pub loss_a_db: f64,
    /// Party B loss (dB).
    pub loss_b_db: f64,
}

/// A loss profile over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LossProfile {
    /// Satellite overpass: free-space transmittance
    /// `peak / ((t / time_scale)^2 + 1)` for `t` in `[start, end)`.
    Overpass {
        /// Fixed loss at party A (dB).
        #[serde(default = "default_terrestrial_loss_db")]
        terrestrial_loss_db: f64,
        /// Free-space transmittance at zenith (t = 0).
        #[serde(default = "default_peak_transmittance")]
        peak_transmittance: f64,
        /// Time over which the transmittance halves (s).
        #[serde(default = "default_time_scale_s")]
        time_scale_s: f64,
        /// First sample time (s).
        #[serde(default = "default_start_s")]
        start_s: f64,
        /// End of the profile, exclusive (s).
        #[serde(default = "default_end_s")]
        end_s: f64,
        /// Sample spacing (s).
        #[serde(default = "default_step_s")]
        step_s: f64,
    },
    /// Explicit per-sample losses for party B.
    Samples {
        /// Fixed loss at party A (dB).
        loss_a_db: f64,
        /// Party B loss for each sample (dB).
        loss_b_db: Vec<f64>,
        /// Sample spacing (s).
        step_s: f64,
        /// Time of the first sample (s).
        #[serde(default)]
        start_s: f64,
    },
}

fn default_terrestrial_loss_db() -> f64 {
    20.0
}

fn default_peak_transmittance() -> f64 {
    1e-4
}

fn default_time_scale_s() -> f64 {
    40.0
}

fn default_start_s() -> f64 {
    -100.0
}

fn default_end_s() -> f64 {
    100.0
}

fn default_step_s() -> f64 {
    5.0
}

impl Default for LossProfile {
    fn default() -> Self {
        LossProfile::Overpass {
            terrestrial_loss_db: default_terrestrial_loss_db(),
            peak_transmittance: default_peak_transmittance(),
            time_scale_s: default_time_scale_s(),
            start_s: default_start_s(),
            end_s: default_end_s(),
            step_s: default_step_s(),
        }
    }
}

impl LossProfile {
    /// Sample spacing in seconds.
    pub fn step_s(&self) -> f64 {
        match self {
            LossProfile::Overpass { step_s, .. } | LossProfile::Samples { step_s, .. } => *step_s,
        }
    }

    /// Number of samples the profile expands to.
    pub fn sample_count(&self) -> usize {
        match self {
            LossProfile::Overpass {
                start_s,
                end_s,
                step_s,
                ..
            } => ((end_s - start_s) / step_s).ceil().max(0.0) as usize,
            LossProfile::Samples { loss_b_db, .. } => loss_b_db.len(),
        }
    }

    /// Checks that the profile describes between one and
    /// [`MAX_PROFILE_SAMPLES`] finite samples.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let invalid = |msg: String| Err(SettingsError::InvalidProfile(msg));
        let step_s = self.step_s();
        if !step_s.is_finite() || step_s <= 0.0 {
            return invalid(format!("step_s must be > 0, got {}", step_s));
        }
        match self {
            LossProfile::Overpass {
                terrestrial_loss_db,
                peak_transmittance,
                time_scale_s,
                start_s,
                end_s,
                ..
            } => {
                if !terrestrial_loss_db.is_finite() {
                    return invalid(format!(
                        "terrestrial_loss_db must be finite, got {}",
                        terrestrial_loss_db
                    ));
                }
                if !(*peak_transmittance > 0.0 && *peak_transmittance <= 1.0) {
                    return invalid(format!(
                        "peak_transmittance must be in (0, 1], got {}",
                        peak_transmittance
                    ));
                }
                if !time_scale_s.is_finite() || *time_scale_s <= 0.0 {
                    return invalid(format!("time_scale_s must be > 0, got {}", time_scale_s));
                }
                if !(start_s.is_finite() && end_s.is_finite() && end_s > start_s) {
                    return invalid(format!("empty time range [{}, {})", start_s, end_s));
                }
            }
            LossProfile::Samples {
                loss_a_db,
                loss_b_db,
                start_s,
                ..
            } => {
                if loss_b_db.is_empty() {
                    return invalid("loss_b_db is empty".to_string());
                }
                if !(loss_a_db.is_finite() && start_s.is_finite()) {
                    return invalid(format!(
                        "loss_a_db and start_s must be finite, got {} and {}",
                        loss_a_db, start_s
                    ));
                }
                if let Some(i) = loss_b_db.iter().position(|v| !v.is_finite()) {
                    return invalid(format!("loss_b_db[{}] = {} is not finite", i, loss_b_db[i]));
                }
            }
        }
        let count = self.sample_count();
        if count > MAX_PROFILE_SAMPLES {
            return invalid(format!(
                "{} samples exceeds the limit of {}",
                count, MAX_PROFILE_SAMPLES
            ));
        }
        Ok(())
    }

    /// Expands the profile into samples, truncated to [`MAX_PROFILE_SAMPLES`].
    pub fn samples(&self) -> Vec<ProfileSample> {
        let count = self.sample_count().min(MAX_PROFILE_SAMPLES);
        match self {
            LossProfile::Overpass {
                terrestrial_loss_db,
                peak_transmittance,
                time_scale_s,
                start_s,
                step_s,
                ..
            } => (0..count)
                .map(|i| {
                    let time_s = start_s + i as f64 * step_s;
                    let transmittance =
                        peak_transmittance / ((time_s / time_scale_s).powi(2) + 1.0);
                    ProfileSample {
                        time_s,
                        loss_a_db: *terrestrial_loss_db,
                        loss_b_db: -10.0 * transmittance.log10(),
                    }
                })
                .collect(),
            LossProfile::Samples {
                loss_a_db,
                loss_b_db,
                step_s,
                start_s,
            } => loss_b_db
                .iter()
                .take(count)
                .enumerate()
                .map(|(i, &loss_b_db)| ProfileSample {
                    time_s: start_s + i as f64 * step_s,
                    loss_a_db: *loss_a_db,
                    loss_b_db,
                })
                .collect(),
        }
    }
}
