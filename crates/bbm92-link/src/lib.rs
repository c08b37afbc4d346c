//! # bbm92-link
//!
//! Asymptotic secure key rate model for BBM92 entangled-photon QKD links.
//!
//! Given detector efficiencies, dark counts, timing jitter, dead times and
//! intrinsic error rates, this crate computes the expected coincidence rates,
//! error rates and secure key rate at an operating point (coincidence window,
//! source brightness), and searches for the operating point that maximizes
//! the key rate.
//!
//! ## Features
//!
//! - **Coincidence Model**: True and accidental coincidences per detector pair,
//!   with dead-time saturation and Gaussian timing acceptance
//! - **Key Rate**: QBER, phase error and `q * CC * (1 - f H(E_b) - H(E_p))`
//! - **Optimization**: Joint window/brightness search, or window only at a
//!   fixed brightness
//!
//! ## Example
//!
//! ```
//! use bbm92_link::{DetectorInput, LinkModel, LinkParams};
//!
//! let params = LinkParams {
//!     detector_count: 2,
//!     timing_jitter: DetectorInput::Scalar(5e-10),
//!     dead_time: DetectorInput::Scalar(2.2e-8),
//!     efficiency_a: DetectorInput::Scalar(0.5),
//!     efficiency_b: DetectorInput::Scalar(0.1),
//!     dark_count_a: DetectorInput::Scalar(500.0),
//!     dark_count_b: DetectorInput::Scalar(100.0),
//!     bit_error_rate: 0.01,
//!     phase_error_rate: 0.01,
//!     ..Default::default()
//! };
//!
//! let link = LinkModel::new(&params)?;
//! let point = link.optimal_operating_point().unwrap();
//! println!(
//!     "window = {:e}, brightness = {:e}, QBER = {:.4}",
//!     point.coincidence_window,
//!     point.brightness,
//!     link.error_rate(point)?
//! );
//! # Ok::<(), bbm92_link::LinkError>(())
//! ```

mod coincidence;
mod config;
mod efficiency;
mod error;
mod input;
mod model;
mod optimize;
mod rate;

pub use coincidence::{erroneous_coincidences, measured_coincidences, OperatingPoint};
pub use config::{
    LinkConfig, LinkParams, DEFAULT_BRIGHTNESS_SEED, DEFAULT_EC_EFFICIENCY, DEFAULT_EPS_EC,
    DEFAULT_EPS_TOTAL,
};
pub use efficiency::{dead_efficiency, total_efficiency, window_acceptance};
pub use error::LinkError;
pub use input::{db_to_transmittance, transmittance_to_db, DetectorInput, LossFormat};
pub use model::LinkModel;
pub use optimize::{
    optimize_operating_point, optimize_window, Optimum, BRIGHTNESS_BOUNDS, BRIGHTNESS_SCALE,
    JOINT_WINDOW_BOUNDS, WINDOW_ONLY_BOUNDS,
};
pub use rate::{
    asymptotic_key_rate, binary_entropy, error_rate, performance, phase_error_rate, raw_rate,
    secure_key_rate, Performance, SIFTING_FACTOR,
};

/// Result type for link model operations.
pub type Result<T> = std::result::Result<T, LinkError>;
