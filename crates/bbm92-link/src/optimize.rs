//! Operating point search.
//!
//! The coincidence window (around 1e-9 s) and the brightness (around 1e7 to
//! 1e9 pairs/s) differ by many orders of magnitude, so the solvers work on
//! dimensionless coordinates: the window in units of the first detector
//! pair's jitter, the brightness in units of 1e9. The cost is the negated
//! key rate divided by the sifted rate at the starting point, which keeps
//! the simplex tolerance meaningful across links of very different loss.
//!
//! Both searches are local. The joint search uses Nelder-Mead on a box
//! (points outside the box are evaluated at the nearest point inside it plus
//! a penalty); the window-only search uses Brent's method on an interval.

use crate::coincidence::OperatingPoint;
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::rate::{performance, raw_rate, secure_key_rate};
use argmin::core::{CostFunction, Error, Executor, State, TerminationReason};
use argmin::solver::brent::BrentOpt;
use argmin::solver::neldermead::NelderMead;
use bbm92_metrics::{metric_defs, MetricLabels};
use tracing::{debug, warn};

/// Brightness unit used by the solvers.
pub const BRIGHTNESS_SCALE: f64 = 1e9;

/// Scaled brightness bounds for the joint search.
pub const BRIGHTNESS_BOUNDS: (f64, f64) = (1e-9, 1e3);

/// Scaled window bounds for the joint search, in units of the reference jitter.
pub const JOINT_WINDOW_BOUNDS: (f64, f64) = (0.001, 10.0);

/// Scaled window bounds for the window-only search.
pub const WINDOW_ONLY_BOUNDS: (f64, f64) = (0.001, 100.0);

/// Simplex cost spread at which Nelder-Mead stops.
const SD_TOLERANCE: f64 = 1e-10;

/// Iteration limit for the joint search.
const MAX_ITERS_JOINT: u64 = 1000;

/// Iteration limit for the window-only search.
const MAX_ITERS_WINDOW: u64 = 200;

/// Result of an operating point search.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Optimum {
    /// Best operating point found.
    pub operating_point: OperatingPoint,
    /// Secure key rate at that point.
    pub key_rate: f64,
    /// Whether the solver met its convergence criterion.
    ///
    /// `false` means the iteration limit was hit; the result is still the
    /// best point seen but may not be a local maximum.
    pub converged: bool,
    /// Solver iterations used.
    pub iterations: u64,
    /// Solver termination reason, if one was reported.
    pub termination: Option<String>,
}

// ============================================================================
// Cost Functions
// ============================================================================

/// Negated, normalized key rate over (scaled window, scaled brightness).
struct JointCost {
    config: LinkConfig,
    window_scale: f64,
    normalization: f64,
}

impl JointCost {
    fn point(&self, scaled: &[f64]) -> OperatingPoint {
        OperatingPoint::new(scaled[0] * self.window_scale, scaled[1] * BRIGHTNESS_SCALE)
    }
}

impl CostFunction for JointCost {
    type Param = Vec<f64>; // [window / jitter, brightness / 1e9]
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        let inside = clamp_joint(p);
        let excursion = (p[0] - inside[0]).abs() / (JOINT_WINDOW_BOUNDS.1 - JOINT_WINDOW_BOUNDS.0)
            + (p[1] - inside[1]).abs() / (BRIGHTNESS_BOUNDS.1 - BRIGHTNESS_BOUNDS.0);

        let rate = match secure_key_rate(&self.config, &self.point(&inside)) {
            Ok(rate) => rate,
            Err(_) => return Ok(f64::INFINITY),
        };
        let cost = -rate / self.normalization;

        // Rises linearly with the distance outside the box
        Ok(cost + excursion * (1.0 + cost.abs()))
    }
}

/// Negated, normalized key rate over the scaled window at fixed brightness.
struct WindowCost {
    config: LinkConfig,
    brightness: f64,
    window_scale: f64,
    normalization: f64,
}

impl CostFunction for WindowCost {
    type Param = f64; // window / jitter
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        let point = OperatingPoint::new(p * self.window_scale, self.brightness);
        match secure_key_rate(&self.config, &point) {
            Ok(rate) => Ok(-rate / self.normalization),
            Err(_) => Ok(f64::INFINITY),
        }
    }
}

fn clamp_joint(p: &[f64]) -> [f64; 2] {
    [
        p[0].clamp(JOINT_WINDOW_BOUNDS.0, JOINT_WINDOW_BOUNDS.1),
        p[1].clamp(BRIGHTNESS_BOUNDS.0, BRIGHTNESS_BOUNDS.1),
    ]
}

/// Magnitude of the objective at the starting point.
fn normalization(config: &LinkConfig, start: &OperatingPoint) -> f64 {
    let raw = raw_rate(config, start);
    let key = secure_key_rate(config, start).map(f64::abs).unwrap_or(0.0);
    let scale = raw.max(key);
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        1.0
    }
}

// ============================================================================
// Searches
// ============================================================================

/// Searches window and brightness jointly for the highest key rate.
///
/// `brightness_seed` is the starting brightness in units of 1e9 and must lie
/// inside [`BRIGHTNESS_BOUNDS`]. The window starts at the reference jitter.
pub fn optimize_operating_point(
    config: &LinkConfig,
    brightness_seed: f64,
) -> Result<Optimum, LinkError> {
    if !(BRIGHTNESS_BOUNDS.0..=BRIGHTNESS_BOUNDS.1).contains(&brightness_seed) {
        return Err(LinkError::OutOfRange {
            field: "brightness_seed",
            index: 0,
            value: brightness_seed,
            expected: "[1e-9, 1e3]",
        });
    }

    let window_scale = config.characteristic_window();
    let start = OperatingPoint::new(window_scale, brightness_seed * BRIGHTNESS_SCALE);
    let cost_fn = JointCost {
        config: config.clone(),
        window_scale,
        normalization: normalization(config, &start),
    };

    debug!(
        "Link[{}]: joint search from window = {:e}, brightness = {:e}",
        config.name, start.coincidence_window, start.brightness
    );

    // Simplex of the seed plus a 50% step along each axis
    let solver = NelderMead::new(vec![
        vec![1.0, brightness_seed],
        vec![1.5, brightness_seed],
        vec![1.0, 1.5 * brightness_seed],
    ])
    .with_sd_tolerance(SD_TOLERANCE)
    .map_err(|e| LinkError::OptimizationFailed(e.to_string()))?;

    let res = Executor::new(cost_fn, solver)
        .configure(|state| state.max_iters(MAX_ITERS_JOINT))
        .run()
        .map_err(|e| LinkError::OptimizationFailed(e.to_string()))?;

    let state = res.state();
    let best = state
        .get_best_param()
        .ok_or_else(|| LinkError::OptimizationFailed("No solution found".to_string()))?;
    let inside = clamp_joint(best);
    let operating_point =
        OperatingPoint::new(inside[0] * window_scale, inside[1] * BRIGHTNESS_SCALE);

    let optimum = Optimum {
        operating_point,
        key_rate: secure_key_rate(config, &operating_point)?,
        converged: matches!(
            state.get_termination_reason(),
            Some(TerminationReason::SolverConverged)
        ),
        iterations: state.get_iter(),
        termination: state.get_termination_reason().map(|r| format!("{:?}", r)),
    };
    record(config, "joint", &optimum);
    Ok(optimum)
}

/// Searches the window alone with the brightness held at `brightness`.
pub fn optimize_window(config: &LinkConfig, brightness: f64) -> Result<Optimum, LinkError> {
    let window_scale = config.characteristic_window();
    let start = OperatingPoint::new(window_scale, brightness);
    start.validate()?;

    let cost_fn = WindowCost {
        config: config.clone(),
        brightness,
        window_scale,
        normalization: normalization(config, &start),
    };

    debug!(
        "Link[{}]: window search at brightness = {:e}",
        config.name, brightness
    );

    let solver = BrentOpt::new(WINDOW_ONLY_BOUNDS.0, WINDOW_ONLY_BOUNDS.1);
    let res = Executor::new(cost_fn, solver)
        .configure(|state| state.max_iters(MAX_ITERS_WINDOW))
        .run()
        .map_err(|e| LinkError::OptimizationFailed(e.to_string()))?;

    let state = res.state();
    let best = state
        .get_best_param()
        .ok_or_else(|| LinkError::OptimizationFailed("No solution found".to_string()))?;
    let scaled = best.clamp(WINDOW_ONLY_BOUNDS.0, WINDOW_ONLY_BOUNDS.1);
    let operating_point = OperatingPoint::new(scaled * window_scale, brightness);

    let optimum = Optimum {
        operating_point,
        key_rate: secure_key_rate(config, &operating_point)?,
        converged: matches!(
            state.get_termination_reason(),
            Some(TerminationReason::SolverConverged)
        ),
        iterations: state.get_iter(),
        termination: state.get_termination_reason().map(|r| format!("{:?}", r)),
    };
    record(config, "window", &optimum);
    Ok(optimum)
}

/// Logs and records metrics for a finished search.
fn record(config: &LinkConfig, search: &str, optimum: &Optimum) {
    let labels = MetricLabels::new(config.name.clone(), search);
    let runs = &metric_defs::OPTIMIZER_RUNS;
    metrics::counter!(runs.name, &labels.for_metric(runs)).increment(1);
    let iterations = &metric_defs::OPTIMIZER_ITERATIONS;
    metrics::histogram!(iterations.name, &labels.for_metric(iterations))
        .record(optimum.iterations as f64);
    let key_rate = &metric_defs::LINK_KEY_RATE;
    metrics::gauge!(key_rate.name, &labels.for_metric(key_rate)).set(optimum.key_rate);
    if let Ok(perf) = performance(config, &optimum.operating_point) {
        let qber = &metric_defs::LINK_QBER;
        metrics::gauge!(qber.name, &labels.for_metric(qber)).set(perf.qber);
    }

    if optimum.converged {
        debug!(
            "Link[{}]: {} search converged after {} iterations: \
             window = {:e}, brightness = {:e}, key rate = {:e}",
            config.name,
            search,
            optimum.iterations,
            optimum.operating_point.coincidence_window,
            optimum.operating_point.brightness,
            optimum.key_rate
        );
    } else {
        let not_converged = &metric_defs::OPTIMIZER_NOT_CONVERGED;
        metrics::counter!(not_converged.name, &labels.for_metric(not_converged)).increment(1);
        warn!(
            "Link[{}]: {} search did not converge after {} iterations ({:?}); \
             key rate = {:e} is best effort",
            config.name, search, optimum.iterations, optimum.termination, optimum.key_rate
        );
    }
}
