//! Error types for the link model.

use thiserror::Error;

/// Errors that can occur when configuring or evaluating a link model.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The detector count must be at least one.
    #[error("Detector count must be at least 1")]
    NoDetectors,

    /// A per-detector input does not have the length implied by the detector count.
    #[error("{field} has {actual} entries, expected {expected}")]
    LengthMismatch {
        /// Name of the offending field.
        field: &'static str,
        /// Length implied by the detector count (d or d²).
        expected: usize,
        /// Length actually supplied.
        actual: usize,
    },

    /// A configuration value lies outside its physical range.
    #[error("{field}[{index}] = {value} is out of range (expected {expected})")]
    OutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Index within the field (0 for scalars).
        index: usize,
        /// The rejected value.
        value: f64,
        /// Human-readable description of the accepted range.
        expected: &'static str,
    },

    /// Error-correction inefficiency must be finite and at least 1.
    #[error("Error-correction efficiency {0} must be >= 1")]
    InvalidEcEfficiency(f64),

    /// Security parameters must lie in (0, 1).
    #[error("Security parameter {field} = {value} must lie in (0, 1)")]
    InvalidSecurityParameter {
        /// Name of the offending field.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The operating point is not strictly positive and finite.
    #[error("Invalid operating point (window = {window}, brightness = {brightness})")]
    InvalidOperatingPoint {
        /// Coincidence window.
        window: f64,
        /// Source brightness.
        brightness: f64,
    },

    /// Zero measured coincidences, so error rates are undefined.
    #[error("No measured coincidences at window = {window}, brightness = {brightness}")]
    NoCoincidences {
        /// Coincidence window.
        window: f64,
        /// Source brightness.
        brightness: f64,
    },

    /// Binary entropy was requested outside of [0, 1].
    #[error("Binary entropy argument {0} is outside [0, 1]")]
    EntropyDomain(f64),

    /// The numerical optimizer failed to run or produced no result.
    #[error("Optimization failed: {0}")]
    OptimizationFailed(String),
}
