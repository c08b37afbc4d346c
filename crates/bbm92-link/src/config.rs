//! Link configuration.
//!
//! This module provides:
//! - [`LinkParams`] - Raw link inputs as supplied by a caller or settings file
//! - [`LinkConfig`] - The validated, fully broadcast configuration the model runs on
//!
//! Pair-indexed fields (`timing_jitter`, `dead_time`) are stored flat with
//! index `j + k * d`, where `j` is the detector at party A and `k` the
//! detector at party B.

use crate::error::LinkError;
use crate::input::{DetectorInput, LossFormat};

/// Default error-correction inefficiency.
pub const DEFAULT_EC_EFFICIENCY: f64 = 1.1;

/// Default total security parameter.
pub const DEFAULT_EPS_TOTAL: f64 = 0.01;

/// Default error-correction security parameter.
pub const DEFAULT_EPS_EC: f64 = 0.01;

/// Default brightness seed, in units of 1e9 pairs per second.
pub const DEFAULT_BRIGHTNESS_SEED: f64 = 1.0;

// ============================================================================
// Raw Parameters
// ============================================================================

/// Raw link parameters.
///
/// Scalars are broadcast over all detectors (or detector pairs) when the
/// parameters are resolved into a [`LinkConfig`].
///
/// # Example
///
/// ```
/// use bbm92_link::{DetectorInput, LinkParams, LossFormat};
///
/// let params = LinkParams {
///     name: "ogs-sat".to_string(),
///     detector_count: 2,
///     timing_jitter: DetectorInput::Scalar(1e-9),
///     dead_time: DetectorInput::Scalar(5e-8),
///     efficiency_a: DetectorInput::Scalar(20.0),
///     efficiency_b: DetectorInput::Scalar(40.0),
///     dark_count_a: DetectorInput::Scalar(1000.0),
///     dark_count_b: DetectorInput::Scalar(200.0),
///     bit_error_rate: 0.01,
///     phase_error_rate: 0.015,
///     loss_format: LossFormat::Decibel,
///     ..Default::default()
/// };
///
/// let config = params.resolve().unwrap();
/// assert_eq!(config.timing_jitter().len(), 4);
/// assert!((config.efficiency_a()[0] - 0.01).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkParams {
    /// Label used in logs and reports.
    pub name: String,
    /// Number of detectors per party (d).
    pub detector_count: usize,
    /// Timing jitter per detector pair (d² entries).
    pub timing_jitter: DetectorInput,
    /// Dead time per detector pair (d² entries).
    pub dead_time: DetectorInput,
    /// Efficiency of each detector at party A (d entries), in `loss_format` units.
    pub efficiency_a: DetectorInput,
    /// Efficiency of each detector at party B (d entries), in `loss_format` units.
    pub efficiency_b: DetectorInput,
    /// Dark count rate of each detector at party A (d entries).
    pub dark_count_a: DetectorInput,
    /// Dark count rate of each detector at party B (d entries).
    pub dark_count_b: DetectorInput,
    /// Intrinsic bit error probability.
    pub bit_error_rate: f64,
    /// Intrinsic phase error probability.
    pub phase_error_rate: f64,
    /// Error-correction inefficiency (1 = Shannon limit).
    pub ec_efficiency: f64,
    /// Total security parameter. Carried for reporting only.
    pub eps_total: f64,
    /// Error-correction security parameter. Carried for reporting only.
    pub eps_ec: f64,
    /// Unit of the efficiency inputs.
    pub loss_format: LossFormat,
    /// Skip the operating point search at construction.
    pub skip_initial_optimization: bool,
    /// Starting brightness for the initial search, in units of 1e9.
    pub brightness_seed: f64,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            name: "link".to_string(),
            detector_count: 1,
            timing_jitter: DetectorInput::Scalar(1e-9),
            dead_time: DetectorInput::Scalar(0.0),
            efficiency_a: DetectorInput::Scalar(1.0),
            efficiency_b: DetectorInput::Scalar(1.0),
            dark_count_a: DetectorInput::Scalar(0.0),
            dark_count_b: DetectorInput::Scalar(0.0),
            bit_error_rate: 0.0,
            phase_error_rate: 0.0,
            ec_efficiency: DEFAULT_EC_EFFICIENCY,
            eps_total: DEFAULT_EPS_TOTAL,
            eps_ec: DEFAULT_EPS_EC,
            loss_format: LossFormat::Linear,
            skip_initial_optimization: false,
            brightness_seed: DEFAULT_BRIGHTNESS_SEED,
        }
    }
}

impl LinkParams {
    /// Broadcast and validate the raw inputs.
    pub fn resolve(&self) -> Result<LinkConfig, LinkError> {
        let d = self.detector_count;
        if d == 0 {
            return Err(LinkError::NoDetectors);
        }
        let pairs = d * d;

        let timing_jitter = self.timing_jitter.resolve("timing_jitter", pairs)?;
        check_all("timing_jitter", &timing_jitter, |v| v >= 0.0, ">= 0")?;
        if timing_jitter[0] <= 0.0 {
            // The first pair's jitter sets the window scale for the optimizer.
            return Err(LinkError::OutOfRange {
                field: "timing_jitter",
                index: 0,
                value: timing_jitter[0],
                expected: "> 0",
            });
        }

        let dead_time = self.dead_time.resolve("dead_time", pairs)?;
        check_all("dead_time", &dead_time, |v| v >= 0.0, ">= 0")?;

        let dark_count_a = self.dark_count_a.resolve("dark_count_a", d)?;
        check_all("dark_count_a", &dark_count_a, |v| v >= 0.0, ">= 0")?;
        let dark_count_b = self.dark_count_b.resolve("dark_count_b", d)?;
        check_all("dark_count_b", &dark_count_b, |v| v >= 0.0, ">= 0")?;

        check_probability("bit_error_rate", self.bit_error_rate)?;
        check_probability("phase_error_rate", self.phase_error_rate)?;

        if !self.ec_efficiency.is_finite() || self.ec_efficiency < 1.0 {
            return Err(LinkError::InvalidEcEfficiency(self.ec_efficiency));
        }
        check_security_parameter("eps_total", self.eps_total)?;
        check_security_parameter("eps_ec", self.eps_ec)?;

        let (efficiency_a, efficiency_b) =
            resolve_efficiencies(&self.efficiency_a, &self.efficiency_b, self.loss_format, d)?;

        Ok(LinkConfig {
            name: self.name.clone(),
            detector_count: d,
            efficiency_a,
            efficiency_b,
            dark_count_a,
            dark_count_b,
            timing_jitter,
            dead_time,
            bit_error_rate: self.bit_error_rate,
            phase_error_rate: self.phase_error_rate,
            ec_efficiency: self.ec_efficiency,
            eps_total: self.eps_total,
            eps_ec: self.eps_ec,
        })
    }
}

// ============================================================================
// Validated Configuration
// ============================================================================

/// Validated link configuration with every per-detector field broadcast.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkConfig {
    pub(crate) name: String,
    pub(crate) detector_count: usize,
    pub(crate) efficiency_a: Vec<f64>,
    pub(crate) efficiency_b: Vec<f64>,
    pub(crate) dark_count_a: Vec<f64>,
    pub(crate) dark_count_b: Vec<f64>,
    pub(crate) timing_jitter: Vec<f64>,
    pub(crate) dead_time: Vec<f64>,
    pub(crate) bit_error_rate: f64,
    pub(crate) phase_error_rate: f64,
    pub(crate) ec_efficiency: f64,
    pub(crate) eps_total: f64,
    pub(crate) eps_ec: f64,
}

impl LinkConfig {
    /// Link label.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of detectors per party.
    pub fn detector_count(&self) -> usize {
        self.detector_count
    }

    /// Linear efficiency per detector at party A.
    pub fn efficiency_a(&self) -> &[f64] {
        &self.efficiency_a
    }

    /// Linear efficiency per detector at party B.
    pub fn efficiency_b(&self) -> &[f64] {
        &self.efficiency_b
    }

    /// Dark count rate per detector at party A.
    pub fn dark_count_a(&self) -> &[f64] {
        &self.dark_count_a
    }

    /// Dark count rate per detector at party B.
    pub fn dark_count_b(&self) -> &[f64] {
        &self.dark_count_b
    }

    /// Timing jitter per detector pair, indexed `j + k * d`.
    pub fn timing_jitter(&self) -> &[f64] {
        &self.timing_jitter
    }

    /// Dead time per detector pair, indexed `j + k * d`.
    pub fn dead_time(&self) -> &[f64] {
        &self.dead_time
    }

    /// Intrinsic bit error probability.
    pub fn bit_error_rate(&self) -> f64 {
        self.bit_error_rate
    }

    /// Intrinsic phase error probability.
    pub fn phase_error_rate(&self) -> f64 {
        self.phase_error_rate
    }

    /// Error-correction inefficiency.
    pub fn ec_efficiency(&self) -> f64 {
        self.ec_efficiency
    }

    /// Total security parameter.
    pub fn eps_total(&self) -> f64 {
        self.eps_total
    }

    /// Error-correction security parameter.
    pub fn eps_ec(&self) -> f64 {
        self.eps_ec
    }

    /// Flat index of detector pair (j, k).
    #[inline]
    pub fn pair_index(&self, j: usize, k: usize) -> usize {
        j + k * self.detector_count
    }

    /// Characteristic timing unit: the jitter of the first detector pair.
    pub fn characteristic_window(&self) -> f64 {
        self.timing_jitter[0]
    }

    /// Copy of this configuration with new efficiencies.
    pub fn with_loss(
        &self,
        efficiency_a: &DetectorInput,
        efficiency_b: &DetectorInput,
        loss_format: LossFormat,
    ) -> Result<Self, LinkError> {
        let (efficiency_a, efficiency_b) =
            resolve_efficiencies(efficiency_a, efficiency_b, loss_format, self.detector_count)?;
        Ok(Self {
            efficiency_a,
            efficiency_b,
            ..self.clone()
        })
    }
}

fn resolve_efficiencies(
    efficiency_a: &DetectorInput,
    efficiency_b: &DetectorInput,
    loss_format: LossFormat,
    d: usize,
) -> Result<(Vec<f64>, Vec<f64>), LinkError> {
    let efficiency_a = loss_format.to_transmittance(efficiency_a.resolve("efficiency_a", d)?);
    let efficiency_b = loss_format.to_transmittance(efficiency_b.resolve("efficiency_b", d)?);
    let in_range = |v: f64| v > 0.0 && v <= 1.0;
    check_all("efficiency_a", &efficiency_a, in_range, "(0, 1]")?;
    check_all("efficiency_b", &efficiency_b, in_range, "(0, 1]")?;
    Ok((efficiency_a, efficiency_b))
}

fn check_all(
    field: &'static str,
    values: &[f64],
    accept: impl Fn(f64) -> bool,
    expected: &'static str,
) -> Result<(), LinkError> {
    match values
        .iter()
        .enumerate()
        .find(|(_, v)| !v.is_finite() || !accept(**v))
    {
        Some((index, value)) => Err(LinkError::OutOfRange {
            field,
            index,
            value: *value,
            expected,
        }),
        None => Ok(()),
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), LinkError> {
    check_all(field, &[value], |v| (0.0..=1.0).contains(&v), "[0, 1]")
}

fn check_security_parameter(field: &'static str, value: f64) -> Result<(), LinkError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(LinkError::InvalidSecurityParameter { field, value })
    }
}
