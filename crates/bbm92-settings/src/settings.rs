//! Link settings as stored in YAML.
//!
//! Key names follow the detector settings files used in link studies
//! (`d`, `jitters`, `dead_times`, ...). Every per-detector field accepts
//! either one number or a list.

use crate::profile::LossProfile;
use bbm92_link::{
    DetectorInput, LinkParams, LossFormat, DEFAULT_BRIGHTNESS_SEED, DEFAULT_EC_EFFICIENCY,
    DEFAULT_EPS_EC, DEFAULT_EPS_TOTAL,
};
use serde::{Deserialize, Serialize};

/// Efficiencies of both parties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossSettings {
    /// Party A efficiency (one value or one per detector).
    pub a: DetectorInput,
    /// Party B efficiency (one value or one per detector).
    pub b: DetectorInput,
    /// Unit of `a` and `b`.
    #[serde(default)]
    pub format: LossFormat,
}

impl Default for LossSettings {
    fn default() -> Self {
        Self {
            a: DetectorInput::Scalar(1.0),
            b: DetectorInput::Scalar(1.0),
            format: LossFormat::Linear,
        }
    }
}

/// A link described in a settings file.
///
/// # Example
///
/// ```
/// use bbm92_settings::load_settings_from_str;
///
/// let settings = load_settings_from_str(r#"
/// d: 2
/// jitters: 1.0e-9
/// dead_times: 1.0e-8
/// darkcounts_OGS: 300
/// darkcounts_SAT: [250, 350]
/// bit_error: 0.02
/// phase_error: 0.02
/// loss: { a: 20, b: 40, format: dB }
/// "#).unwrap();
///
/// let params = settings.link_params();
/// assert_eq!(params.detector_count, 2);
/// assert_eq!(params.ec_efficiency, 1.1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Link label.
    #[serde(default = "default_name")]
    pub name: String,
    /// Detectors per party.
    pub d: usize,
    /// Timing jitter per detector pair.
    pub jitters: DetectorInput,
    /// Dead time per detector pair.
    #[serde(default = "zero_input")]
    pub dead_times: DetectorInput,
    /// Dark count rates at party A (ground station).
    #[serde(alias = "darkcounts_OGS")]
    pub darkcounts_a: DetectorInput,
    /// Dark count rates at party B (satellite).
    #[serde(alias = "darkcounts_SAT")]
    pub darkcounts_b: DetectorInput,
    /// Intrinsic bit error probability.
    pub bit_error: f64,
    /// Intrinsic phase error probability.
    pub phase_error: f64,
    /// Error-correction inefficiency.
    #[serde(default = "default_ec_efficiency")]
    pub f: f64,
    /// Total security parameter.
    #[serde(default = "default_eps_total")]
    pub eps_tot: f64,
    /// Error-correction security parameter.
    #[serde(default = "default_eps_ec", alias = "eps_EC")]
    pub eps_ec: f64,
    /// Starting brightness for the joint search, in units of 1e9.
    #[serde(default = "default_brightness_seed", alias = "B0")]
    pub brightness_seed: f64,
    /// Efficiencies of both parties.
    #[serde(default)]
    pub loss: LossSettings,
    /// Loss profile for sweeps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<LossProfile>,
}

fn default_name() -> String {
    "link".to_string()
}

fn zero_input() -> DetectorInput {
    DetectorInput::Scalar(0.0)
}

fn default_ec_efficiency() -> f64 {
    DEFAULT_EC_EFFICIENCY
}

fn default_eps_total() -> f64 {
    DEFAULT_EPS_TOTAL
}

fn default_eps_ec() -> f64 {
    DEFAULT_EPS_EC
}

fn default_brightness_seed() -> f64 {
    DEFAULT_BRIGHTNESS_SEED
}

impl LinkSettings {
    /// Link parameters with the configured losses.
    pub fn link_params(&self) -> LinkParams {
        self.link_params_with_loss(self.loss.a.clone(), self.loss.b.clone(), self.loss.format)
    }

    /// Link parameters with the losses replaced.
    pub fn link_params_with_loss(
        &self,
        efficiency_a: DetectorInput,
        efficiency_b: DetectorInput,
        loss_format: LossFormat,
    ) -> LinkParams {
        LinkParams {
            name: self.name.clone(),
            detector_count: self.d,
            timing_jitter: self.jitters.clone(),
            dead_time: self.dead_times.clone(),
            efficiency_a,
            efficiency_b,
            dark_count_a: self.darkcounts_a.clone(),
            dark_count_b: self.darkcounts_b.clone(),
            bit_error_rate: self.bit_error,
            phase_error_rate: self.phase_error,
            ec_efficiency: self.f,
            eps_total: self.eps_tot,
            eps_ec: self.eps_ec,
            loss_format,
            skip_initial_optimization: false,
            brightness_seed: self.brightness_seed,
        }
    }
}
