//! Detector efficiency under dead-time loading and timing acceptance.
//!
//! A detector with dead time `t_dead` that sees `B * eff` clicks per second
//! spread over `d` detectors is blind for a fraction of the time. The
//! surviving fraction is `1 / (1 + B * eff * t_dead / d)`.

use crate::config::LinkConfig;
use statrs::function::erf::erf;
use std::f64::consts::LN_2;

/// Dead-time load `B * eff * t_dead / d` of detector pair (j, k).
#[inline]
fn dead_time_load(
    config: &LinkConfig,
    efficiency: f64,
    brightness: f64,
    j: usize,
    k: usize,
) -> f64 {
    brightness * efficiency * config.dead_time[config.pair_index(j, k)]
        / config.detector_count as f64
}

/// Throughput efficiency of a detector after dead-time saturation.
///
/// `eff / (1 + B * eff * t_dead[j, k] / d)`
pub fn total_efficiency(
    config: &LinkConfig,
    efficiency: f64,
    brightness: f64,
    j: usize,
    k: usize,
) -> f64 {
    efficiency / (1.0 + dead_time_load(config, efficiency, brightness, j, k))
}

/// Dead-time survival factor, `1 / (1 + B * eff * t_dead[j, k] / d)`.
pub fn dead_efficiency(
    config: &LinkConfig,
    efficiency: f64,
    brightness: f64,
    j: usize,
    k: usize,
) -> f64 {
    1.0 / (1.0 + dead_time_load(config, efficiency, brightness, j, k))
}

/// Probability that a true pair lands inside the coincidence window.
///
/// `erf(sqrt(ln 2) * window / jitter[j, k])`; a pair with zero jitter accepts
/// every true coincidence for any positive window.
pub fn window_acceptance(config: &LinkConfig, window: f64, j: usize, k: usize) -> f64 {
    let jitter = config.timing_jitter[config.pair_index(j, k)];
    if jitter == 0.0 {
        return 1.0;
    }
    erf(LN_2.sqrt() * window / jitter)
}
