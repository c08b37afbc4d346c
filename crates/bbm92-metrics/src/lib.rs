//! Metrics infrastructure for the BBM92 key rate model.
//!
//! This crate declares every metric the model and runner emit as structured
//! [`Metric`] constants, and re-exports the `metrics` crate for convenience.
//! Without an installed recorder all emissions are no-ops.
//!
//! # Example
//!
//! ```rust,ignore
//! use bbm92_metrics::{describe_metrics, metric_defs, MetricLabels};
//!
//! describe_metrics();
//!
//! let labels = MetricLabels::new("ogs-sat", "joint");
//! let runs = &metric_defs::OPTIMIZER_RUNS;
//! metrics::counter!(runs.name, &labels.for_metric(runs)).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
///
/// # Example
///
/// ```rust
/// use bbm92_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const SWEEPS: Metric = Metric::counter("bbm92.sweeps")
///     .with_description("Loss profile sweeps run")
///     .with_unit(Unit::Count)
///     .with_labels(&["link"]);
///
/// assert_eq!(SWEEPS.name, "bbm92.sweeps");
/// assert_eq!(SWEEPS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "bbm92.optimizer.runs").
    pub name: &'static str,
    /// The kind of metric (counter, gauge, histogram).
    pub kind: MetricKind,
    /// Human-readable description of the metric.
    pub description: &'static str,
    /// The unit of measurement (optional).
    pub unit: Option<Unit>,
    /// Label keys attached to every emission, in order.
    pub labels: &'static [&'static str],
}

impl Metric {
    /// Creates a new counter metric with the given name.
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    /// Creates a new gauge metric with the given name.
    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    /// Creates a new histogram metric with the given name.
    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    /// Sets the description for the metric.
    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Sets the unit for the metric.
    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Sets the expected label keys for the metric.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the metrics recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the key rate model.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Labels present on all optimizer metrics.
    pub const OPTIMIZER_LABELS: &[&str] = &["link", "search"];

    /// Number of operating point searches run.
    pub const OPTIMIZER_RUNS: Metric = Metric::counter("bbm92.optimizer.runs")
        .with_description("Operating point searches run")
        .with_unit(Unit::Count)
        .with_labels(OPTIMIZER_LABELS);

    /// Iterations used per search.
    pub const OPTIMIZER_ITERATIONS: Metric = Metric::histogram("bbm92.optimizer.iterations")
        .with_description("Solver iterations per operating point search")
        .with_unit(Unit::Count)
        .with_labels(OPTIMIZER_LABELS);

    /// Searches that stopped without meeting the convergence criterion.
    pub const OPTIMIZER_NOT_CONVERGED: Metric = Metric::counter("bbm92.optimizer.not_converged")
        .with_description("Searches that hit the iteration limit before converging")
        .with_unit(Unit::Count)
        .with_labels(OPTIMIZER_LABELS);

    /// Secure key rate at the latest optimum.
    pub const LINK_KEY_RATE: Metric = Metric::gauge("bbm92.link.key_rate")
        .with_description("Asymptotic secure key rate at the latest optimum")
        .with_unit(Unit::CountPerSecond)
        .with_labels(&["link"]);

    /// Quantum bit error rate at the latest optimum.
    pub const LINK_QBER: Metric = Metric::gauge("bbm92.link.qber")
        .with_description("Quantum bit error rate at the latest optimum")
        .with_labels(&["link"]);

    /// All metrics, for bulk description.
    pub const ALL: &[&Metric] = &[
        &OPTIMIZER_RUNS,
        &OPTIMIZER_ITERATIONS,
        &OPTIMIZER_NOT_CONVERGED,
        &LINK_KEY_RATE,
        &LINK_QBER,
    ];
}

/// Label values identifying a link and the kind of search.
///
/// Each metric declares which keys it carries; [`MetricLabels::for_metric`]
/// picks the matching values, so per-link gauges only get `link` while
/// optimizer metrics get `link` and `search`.
///
/// # Example
///
/// ```rust
/// use bbm92_metrics::{metric_defs, MetricLabels};
///
/// let labels = MetricLabels::new("ogs-sat", "window");
/// assert_eq!(labels.for_metric(&metric_defs::OPTIMIZER_RUNS).len(), 2);
/// assert_eq!(labels.for_metric(&metric_defs::LINK_QBER).len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Link name.
    pub link: String,
    /// Search kind ("joint" or "window").
    pub search: String,
}

impl MetricLabels {
    /// Creates labels for a link and search kind.
    pub fn new(link: impl Into<String>, search: impl Into<String>) -> Self {
        Self {
            link: link.into(),
            search: search.into(),
        }
    }

    fn value(&self, key: &str) -> Option<&str> {
        match key {
            "link" => Some(&self.link),
            "search" => Some(&self.search),
            _ => None,
        }
    }

    /// Labels in the metrics crate format for the keys `metric` declares.
    pub fn for_metric(&self, metric: &Metric) -> Vec<(&'static str, String)> {
        metric
            .labels
            .iter()
            .filter_map(|&key| self.value(key).map(|v| (key, v.to_string())))
            .collect()
    }
}

/// Describes all metrics. Call once at startup after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_follow_declared_keys() {
        let labels = MetricLabels::new("lab", "joint");
        assert_eq!(
            labels.for_metric(&metric_defs::OPTIMIZER_RUNS),
            vec![("link", "lab".to_string()), ("search", "joint".to_string())]
        );
        assert_eq!(
            labels.for_metric(&metric_defs::LINK_KEY_RATE),
            vec![("link", "lab".to_string())]
        );
        assert!(labels.for_metric(&Metric::gauge("unlabelled")).is_empty());
    }

    #[test]
    fn test_every_declared_key_has_a_value() {
        let labels = MetricLabels::new("lab", "window");
        for metric in metric_defs::ALL {
            let keys: Vec<&str> = labels
                .for_metric(metric)
                .into_iter()
                .map(|(key, _)| key)
                .collect();
            assert_eq!(keys, metric.labels, "{}", metric.name);
        }
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::OPTIMIZER_RUNS.name, "bbm92.optimizer.runs");
        assert_eq!(metric_defs::OPTIMIZER_RUNS.kind, MetricKind::Counter);
        assert_eq!(metric_defs::OPTIMIZER_ITERATIONS.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::LINK_KEY_RATE.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::LINK_KEY_RATE.unit, Some(Unit::CountPerSecond));
        assert_eq!(metric_defs::LINK_QBER.unit, None);
        assert_eq!(metric_defs::ALL.len(), 5);
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::gauge("minimal");

        assert_eq!(MINIMAL.name, "minimal");
        assert_eq!(MINIMAL.kind, MetricKind::Gauge);
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.labels, &[] as &[&str]);
    }

    #[test]
    fn test_describe_without_recorder() {
        describe_metrics();
    }
}
