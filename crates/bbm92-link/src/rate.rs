//! Error rates, binary entropy and the asymptotic BBM92 secure key rate.
//!
//! The key rate at an operating point is
//!
//! ```text
//! R = q * CC * (1 - f * H(E_b) - H(E_p))
//! ```
//!
//! with `q = 0.5` the basis-matching (sifting) factor, `CC` the measured
//! coincidence rate, `E_b`/`E_p` the estimated bit and phase error rates and
//! `f` the error-correction inefficiency. A negative value means no secure
//! key can be distilled at that operating point.

use crate::coincidence::{erroneous_coincidences, measured_coincidences, OperatingPoint};
use crate::config::LinkConfig;
use crate::error::LinkError;

/// Fraction of coincidences kept after basis sifting.
pub const SIFTING_FACTOR: f64 = 0.5;

/// Binary Shannon entropy `H(x) = -x log2 x - (1 - x) log2 (1 - x)`.
///
/// Returns 0 at both endpoints and fails for arguments outside `[0, 1]`.
pub fn binary_entropy(x: f64) -> Result<f64, LinkError> {
    if !(0.0..=1.0).contains(&x) {
        return Err(LinkError::EntropyDomain(x));
    }
    if x == 0.0 || x == 1.0 {
        return Ok(0.0);
    }
    Ok(-x * x.log2() - (1.0 - x) * (1.0 - x).log2())
}

/// Asymptotic key rate from a coincidence rate and the two error estimates.
pub fn asymptotic_key_rate(
    measured: f64,
    bit_error: f64,
    phase_error: f64,
    ec_efficiency: f64,
) -> Result<f64, LinkError> {
    let leakage = ec_efficiency * binary_entropy(bit_error)? + binary_entropy(phase_error)?;
    Ok(SIFTING_FACTOR * measured * (1.0 - leakage))
}

/// Sifted pair rate: half of all measured coincidences.
pub fn raw_rate(config: &LinkConfig, point: &OperatingPoint) -> f64 {
    SIFTING_FACTOR * measured_coincidences(config, point)
}

/// Estimated quantum bit error rate (QBER).
pub fn error_rate(config: &LinkConfig, point: &OperatingPoint) -> Result<f64, LinkError> {
    point.validate()?;
    error_fraction(config, point, measured_coincidences(config, point), config.bit_error_rate)
}

/// Estimated phase error rate.
pub fn phase_error_rate(config: &LinkConfig, point: &OperatingPoint) -> Result<f64, LinkError> {
    point.validate()?;
    error_fraction(config, point, measured_coincidences(config, point), config.phase_error_rate)
}

fn error_fraction(
    config: &LinkConfig,
    point: &OperatingPoint,
    measured: f64,
    error_process: f64,
) -> Result<f64, LinkError> {
    if measured <= 0.0 {
        return Err(LinkError::NoCoincidences {
            window: point.coincidence_window,
            brightness: point.brightness,
        });
    }
    Ok(erroneous_coincidences(config, point, error_process) / measured)
}

/// Breakdown of the key rate at one operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Performance {
    /// Point the figures were evaluated at.
    pub operating_point: OperatingPoint,
    /// Total measured coincidence rate.
    pub measured_coincidences: f64,
    /// Sifted pair rate.
    pub raw_rate: f64,
    /// Estimated bit error rate (QBER).
    pub qber: f64,
    /// Estimated phase error rate.
    pub phase_error: f64,
    /// Error-correction leakage per sifted bit, `f * H(E_b)`.
    pub ec_leakage: f64,
    /// Privacy-amplification cost per sifted bit, `H(E_p)`.
    pub pa_leakage: f64,
    /// Asymptotic secure key rate. Negative when errors dominate.
    pub key_rate: f64,
}

impl Performance {
    /// Whether a secure key can be extracted at this point.
    pub fn is_secure(&self) -> bool {
        self.key_rate > 0.0
    }
}

/// Evaluates the full key rate breakdown at `point`.
pub fn performance(config: &LinkConfig, point: &OperatingPoint) -> Result<Performance, LinkError> {
    point.validate()?;
    let measured = measured_coincidences(config, point);
    let qber = error_fraction(config, point, measured, config.bit_error_rate)?;
    let phase_error = error_fraction(config, point, measured, config.phase_error_rate)?;
    let ec_leakage = config.ec_efficiency * binary_entropy(qber)?;
    let pa_leakage = binary_entropy(phase_error)?;
    Ok(Performance {
        operating_point: *point,
        measured_coincidences: measured,
        raw_rate: SIFTING_FACTOR * measured,
        qber,
        phase_error,
        ec_leakage,
        pa_leakage,
        key_rate: SIFTING_FACTOR * measured * (1.0 - ec_leakage - pa_leakage),
    })
}

/// Asymptotic secure key rate at `point`.
pub fn secure_key_rate(config: &LinkConfig, point: &OperatingPoint) -> Result<f64, LinkError> {
    performance(config, point).map(|p| p.key_rate)
}
