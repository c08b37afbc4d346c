//! Expected coincidence rates at an operating point.
//!
//! Every detector pair (j, k) contributes two terms:
//! - true coincidences from entangled pairs that land inside the window
//! - accidental coincidences from uncorrelated clicks (signal and dark
//!   counts) that happen to fall inside the same window

use crate::config::LinkConfig;
use crate::efficiency::{dead_efficiency, total_efficiency, window_acceptance};
use crate::error::LinkError;

/// Operating point of the link: coincidence window and source brightness.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OperatingPoint {
    /// Coincidence window (same time unit as the timing jitter).
    pub coincidence_window: f64,
    /// Pair generation rate of the source.
    pub brightness: f64,
}

impl OperatingPoint {
    /// Creates a new operating point.
    pub fn new(coincidence_window: f64, brightness: f64) -> Self {
        Self {
            coincidence_window,
            brightness,
        }
    }

    /// Checks that both coordinates are finite and strictly positive.
    pub fn validate(&self) -> Result<(), LinkError> {
        let ok = |v: f64| v.is_finite() && v > 0.0;
        if ok(self.coincidence_window) && ok(self.brightness) {
            Ok(())
        } else {
            Err(LinkError::InvalidOperatingPoint {
                window: self.coincidence_window,
                brightness: self.brightness,
            })
        }
    }
}

impl From<(f64, f64)> for OperatingPoint {
    fn from((coincidence_window, brightness): (f64, f64)) -> Self {
        Self::new(coincidence_window, brightness)
    }
}

/// True coincidences of pair (j, k), before any error scaling.
fn true_coincidences(config: &LinkConfig, point: &OperatingPoint, j: usize, k: usize) -> f64 {
    let b = point.brightness;
    window_acceptance(config, point.coincidence_window, j, k)
        * b
        * total_efficiency(config, config.efficiency_a[j], b, j, k)
        * total_efficiency(config, config.efficiency_b[k], b, j, k)
}

/// Accidental coincidences of pair (j, k).
///
/// The singles rates are corrected for the dead-time reduction of each
/// channel before being multiplied over the window.
fn accidental_coincidences(
    config: &LinkConfig,
    point: &OperatingPoint,
    j: usize,
    k: usize,
) -> f64 {
    let b = point.brightness;
    let eff_a = config.efficiency_a[j];
    let eff_b = config.efficiency_b[k];
    let singles_a = b * total_efficiency(config, eff_a, b, j, k) + config.dark_count_a[j];
    let singles_b = b * total_efficiency(config, eff_b, b, j, k) + config.dark_count_b[k];
    point.coincidence_window * singles_a * singles_b
        / dead_efficiency(config, eff_b, b, j, k)
        / dead_efficiency(config, eff_a, b, j, k)
}

/// Total expected coincidence rate summed over all d² detector pairs.
pub fn measured_coincidences(config: &LinkConfig, point: &OperatingPoint) -> f64 {
    let d = config.detector_count;
    let mut total = 0.0;
    for j in 0..d {
        for k in 0..d {
            total += true_coincidences(config, point, j, k);
            total += accidental_coincidences(config, point, j, k);
        }
    }
    total
}

/// Coincidence rate attributable to an error process with probability `error_rate`.
///
/// Only off-diagonal pairs (j != k) contribute; same-detector pairs are
/// error free. The accidental term deliberately carries no factor of one
/// half (eq. B13 of the BBM92 continuous-wave key rate analysis).
pub fn erroneous_coincidences(config: &LinkConfig, point: &OperatingPoint, error_rate: f64) -> f64 {
    let d = config.detector_count;
    let mut total = 0.0;
    for j in 0..d {
        for k in (0..d).filter(|&k| k != j) {
            total += error_rate * true_coincidences(config, point, j, k);
            total += accidental_coincidences(config, point, j, k);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LinkParams;
    use crate::input::DetectorInput;
    use approx::assert_relative_eq;

    fn lab_config() -> LinkConfig {
        LinkParams {
            name: "lab".to_string(),
            detector_count: 2,
            timing_jitter: DetectorInput::Scalar(5e-10),
            dead_time: DetectorInput::Scalar(2.2e-8),
            efficiency_a: DetectorInput::Scalar(0.5),
            efficiency_b: DetectorInput::Scalar(0.1),
            dark_count_a: DetectorInput::Scalar(500.0),
            dark_count_b: DetectorInput::Scalar(100.0),
            bit_error_rate: 0.01,
            phase_error_rate: 0.01,
            ..Default::default()
        }
        .resolve()
        .unwrap()
    }

    #[test]
    fn test_operating_point_validation() {
        assert!(OperatingPoint::new(1e-9, 1e7).validate().is_ok());
        assert!(OperatingPoint::new(0.0, 1e7).validate().is_err());
        assert!(OperatingPoint::new(1e-9, -1.0).validate().is_err());
        assert!(OperatingPoint::new(f64::NAN, 1e7).validate().is_err());
        assert!(OperatingPoint::new(1e-9, f64::INFINITY).validate().is_err());
        assert_eq!(OperatingPoint::from((2.0, 3.0)), OperatingPoint::new(2.0, 3.0));
    }

    #[test]
    fn test_single_detector_closed_form() {
        // d = 1, no dead time, no dark counts:
        // CC = erf(sqrt(ln2) * t / jitter) * B * ea * eb + t * B^2 * ea * eb
        let config = LinkParams {
            efficiency_a: DetectorInput::Scalar(0.5),
            efficiency_b: DetectorInput::Scalar(0.2),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let point = OperatingPoint::new(1e-9, 1e6);
        let expected = 0.760_968_108_550_488 * 1e6 * 0.1 + 1e-9 * 1e12 * 0.1;
        assert_relative_eq!(measured_coincidences(&config, &point), expected, max_relative = 1e-9);
    }

    #[test]
    fn test_dark_counts_only() {
        // Dark x dark accidentals survive even at vanishing brightness
        let config = LinkParams {
            dark_count_a: DetectorInput::Scalar(1000.0),
            dark_count_b: DetectorInput::Scalar(2000.0),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let point = OperatingPoint::new(1e-9, 1e-12);
        assert_relative_eq!(
            measured_coincidences(&config, &point),
            1e-9 * 1000.0 * 2000.0,
            max_relative = 1e-6
        );
    }

    #[test]
    fn test_single_detector_has_no_errors() {
        let config = LinkParams {
            bit_error_rate: 0.5,
            dark_count_a: DetectorInput::Scalar(100.0),
            ..Default::default()
        }
        .resolve()
        .unwrap();
        let point = OperatingPoint::new(1e-9, 1e6);
        assert_eq!(erroneous_coincidences(&config, &point, 0.5), 0.0);
    }

    #[test]
    fn test_erroneous_bounded_by_measured() {
        let config = lab_config();
        for &(window, brightness) in &[(1e-11, 1e3), (5e-10, 1e6), (2e-9, 6e7), (5e-9, 1e10)] {
            let point = OperatingPoint::new(window, brightness);
            let measured = measured_coincidences(&config, &point);
            for rate in [0.0, 0.01, 0.25, 0.5, 1.0] {
                let erroneous = erroneous_coincidences(&config, &point, rate);
                assert!(erroneous >= 0.0);
                assert!(erroneous <= measured, "{} > {}", erroneous, measured);
            }
        }
    }

    #[test]
    fn test_symmetric_full_error_is_half() {
        // With identical detectors and error_rate = 1 the off-diagonal half
        // of the pairs carries exactly half of everything measured.
        let config = lab_config();
        let point = OperatingPoint::new(7e-10, 5e7);
        let ratio =
            erroneous_coincidences(&config, &point, 1.0) / measured_coincidences(&config, &point);
        assert_relative_eq!(ratio, 0.5, max_relative = 1e-12);
    }

    #[test]
    fn test_erroneous_increases_with_error_rate() {
        let config = lab_config();
        let point = OperatingPoint::new(7e-10, 5e7);
        let low = erroneous_coincidences(&config, &point, 0.01);
        let high = erroneous_coincidences(&config, &point, 0.1);
        assert!(high > low);
    }

    #[test]
    fn test_accidentals_grow_with_window() {
        let config = lab_config();
        let narrow = measured_coincidences(&config, &OperatingPoint::new(5e-9, 1e7));
        let wide = measured_coincidences(&config, &OperatingPoint::new(5e-8, 1e7));
        assert!(wide > narrow);
    }
}
