//! Raw per-detector inputs and loss unit conversion.
//!
//! Hardware parameters are often quoted once for a whole detector bank. A
//! [`DetectorInput`] holds either that single value or one value per slot and
//! is broadcast exactly once, when the link configuration is resolved.

use crate::error::LinkError;
use std::fmt;
use std::str::FromStr;

/// A detector parameter given either as one value for every slot or per slot.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum DetectorInput {
    /// Same value for every detector (or detector pair).
    Scalar(f64),
    /// One value per detector (length d) or per detector pair (length d²).
    PerDetector(Vec<f64>),
}

impl DetectorInput {
    /// Broadcast to a fixed-length array.
    ///
    /// Scalars are replicated `len` times. Sequences must already have length
    /// `len`; anything else is a [`LinkError::LengthMismatch`].
    pub fn resolve(&self, field: &'static str, len: usize) -> Result<Vec<f64>, LinkError> {
        match self {
            DetectorInput::Scalar(value) => Ok(vec![*value; len]),
            DetectorInput::PerDetector(values) if values.len() == len => Ok(values.clone()),
            DetectorInput::PerDetector(values) => Err(LinkError::LengthMismatch {
                field,
                expected: len,
                actual: values.len(),
            }),
        }
    }
}

impl From<f64> for DetectorInput {
    fn from(value: f64) -> Self {
        DetectorInput::Scalar(value)
    }
}

impl From<Vec<f64>> for DetectorInput {
    fn from(values: Vec<f64>) -> Self {
        DetectorInput::PerDetector(values)
    }
}

impl From<&[f64]> for DetectorInput {
    fn from(values: &[f64]) -> Self {
        DetectorInput::PerDetector(values.to_vec())
    }
}

/// Unit in which efficiency inputs are expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LossFormat {
    /// Linear transmittance in (0, 1].
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "loss", alias = "linear"))]
    Linear,
    /// Loss in decibels, converted with `10^(-dB/10)`.
    #[cfg_attr(feature = "serde", serde(rename = "dB", alias = "db"))]
    Decibel,
}

impl LossFormat {
    /// Convert values in this format to linear transmittance.
    pub fn to_transmittance(self, values: Vec<f64>) -> Vec<f64> {
        match self {
            LossFormat::Linear => values,
            LossFormat::Decibel => values.into_iter().map(db_to_transmittance).collect(),
        }
    }
}

impl fmt::Display for LossFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossFormat::Linear => write!(f, "loss"),
            LossFormat::Decibel => write!(f, "dB"),
        }
    }
}

impl FromStr for LossFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "loss" | "linear" => Ok(LossFormat::Linear),
            "dB" | "db" => Ok(LossFormat::Decibel),
            other => Err(format!("unknown loss format '{}' (expected 'loss' or 'dB')", other)),
        }
    }
}

/// Convert a loss in dB to linear transmittance.
pub fn db_to_transmittance(loss_db: f64) -> f64 {
    10f64.powf(-loss_db / 10.0)
}

/// Convert linear transmittance to a loss in dB.
pub fn transmittance_to_db(transmittance: f64) -> f64 {
    -10.0 * transmittance.log10()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_scalar_broadcast() {
        let input = DetectorInput::Scalar(0.25);
        assert_eq!(input.resolve("efficiency_a", 4).unwrap(), vec![0.25; 4]);
    }

    #[test]
    fn test_sequence_passthrough() {
        let input = DetectorInput::from(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(input.resolve("timing_jitter", 4).unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_sequence_length_mismatch() {
        let input = DetectorInput::from(vec![1.0, 2.0]);
        let err = input.resolve("dead_time", 4).unwrap_err();
        assert!(matches!(
            err,
            LinkError::LengthMismatch { field: "dead_time", expected: 4, actual: 2 }
        ));
    }

    #[test]
    fn test_db_conversion() {
        assert_relative_eq!(db_to_transmittance(0.0), 1.0);
        assert_relative_eq!(db_to_transmittance(10.0), 0.1);
        assert_relative_eq!(db_to_transmittance(30.0), 1e-3, max_relative = 1e-12);
        assert_relative_eq!(transmittance_to_db(0.01), 20.0, max_relative = 1e-12);
    }

    #[test]
    fn test_db_round_trip() {
        for eff in [1.0, 0.5, 0.123, 1e-3, 2.5e-7] {
            let back = db_to_transmittance(transmittance_to_db(eff));
            assert_relative_eq!(back, eff, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_loss_format_conversion() {
        assert_eq!(LossFormat::Linear.to_transmittance(vec![0.3]), vec![0.3]);
        let converted = LossFormat::Decibel.to_transmittance(vec![20.0, 3.0]);
        assert_relative_eq!(converted[0], 0.01, max_relative = 1e-12);
        assert_relative_eq!(converted[1], 0.501_187_233_627_272_2, max_relative = 1e-12);
    }

    #[test]
    fn test_loss_format_parse() {
        assert_eq!("dB".parse::<LossFormat>().unwrap(), LossFormat::Decibel);
        assert_eq!("db".parse::<LossFormat>().unwrap(), LossFormat::Decibel);
        assert_eq!("loss".parse::<LossFormat>().unwrap(), LossFormat::Linear);
        assert!("percent".parse::<LossFormat>().is_err());
        assert_eq!(LossFormat::Decibel.to_string(), "dB");
    }
}
