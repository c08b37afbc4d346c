//! The [`LinkModel`] facade.

use crate::coincidence::{self, OperatingPoint};
use crate::config::{LinkConfig, LinkParams, DEFAULT_BRIGHTNESS_SEED};
use crate::error::LinkError;
use crate::input::{DetectorInput, LossFormat};
use crate::optimize::{self, Optimum, BRIGHTNESS_BOUNDS, BRIGHTNESS_SCALE};
use crate::rate::{self, Performance};
use std::fmt;
use tracing::debug;

/// A BBM92 link: validated configuration plus the cached optimal operating point.
///
/// Evaluation methods only read the configuration. The cached optimum is
/// replaced by [`LinkModel::optimize_operating_point`] and by
/// [`LinkModel::reconfigure_loss`].
///
/// # Example
///
/// ```
/// use bbm92_link::{DetectorInput, LinkModel, LinkParams, LossFormat, OperatingPoint};
///
/// let params = LinkParams {
///     name: "ogs-sat".to_string(),
///     detector_count: 2,
///     timing_jitter: DetectorInput::Scalar(1e-9),
///     dead_time: DetectorInput::Scalar(1e-8),
///     efficiency_a: DetectorInput::Scalar(20.0),
///     efficiency_b: DetectorInput::Scalar(40.0),
///     dark_count_a: DetectorInput::Scalar(300.0),
///     dark_count_b: DetectorInput::Scalar(300.0),
///     bit_error_rate: 0.02,
///     phase_error_rate: 0.02,
///     loss_format: LossFormat::Decibel,
///     ..Default::default()
/// };
///
/// let link = LinkModel::new(&params).unwrap();
/// let best = link.optimal_key_rate().unwrap();
/// let what_if = link.custom_performance(OperatingPoint::new(1e-9, 1e7)).unwrap();
/// assert!(best >= what_if);
/// ```
#[derive(Debug, Clone)]
pub struct LinkModel {
    config: LinkConfig,
    optimum: Option<Optimum>,
}

impl LinkModel {
    /// Builds a link from raw parameters.
    ///
    /// Runs the joint operating point search from `params.brightness_seed`
    /// unless `params.skip_initial_optimization` is set.
    pub fn new(params: &LinkParams) -> Result<Self, LinkError> {
        let config = params.resolve()?;
        Self::from_config(
            config,
            params.skip_initial_optimization,
            params.brightness_seed,
        )
    }

    /// Builds a link from an already validated configuration.
    pub fn from_config(
        config: LinkConfig,
        skip_initial_optimization: bool,
        brightness_seed: f64,
    ) -> Result<Self, LinkError> {
        let mut model = Self {
            config,
            optimum: None,
        };
        if !skip_initial_optimization {
            model.optimize_operating_point(brightness_seed)?;
        }
        Ok(model)
    }

    /// Link label.
    pub fn name(&self) -> &str {
        self.config.name()
    }

    /// The validated configuration.
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Replaces both parties' efficiencies and re-runs the joint search.
    ///
    /// The search restarts from the previous optimum's brightness when one
    /// is cached. The model is left unchanged if validation or the search fails.
    pub fn reconfigure_loss(
        &mut self,
        efficiency_a: impl Into<DetectorInput>,
        efficiency_b: impl Into<DetectorInput>,
        loss_format: LossFormat,
    ) -> Result<&Optimum, LinkError> {
        let config =
            self.config
                .with_loss(&efficiency_a.into(), &efficiency_b.into(), loss_format)?;

        let seed = self
            .optimum
            .as_ref()
            .map(|o| o.operating_point.brightness / BRIGHTNESS_SCALE)
            .filter(|s| (BRIGHTNESS_BOUNDS.0..=BRIGHTNESS_BOUNDS.1).contains(s))
            .unwrap_or(DEFAULT_BRIGHTNESS_SEED);

        debug!(
            "Link[{}]: loss reconfigured (A = {:?}, B = {:?})",
            config.name(),
            config.efficiency_a(),
            config.efficiency_b()
        );

        let optimum = optimize::optimize_operating_point(&config, seed)?;
        self.config = config;
        Ok(self.optimum.insert(optimum))
    }

    /// Total expected coincidence rate at `point`.
    pub fn measured_coincidences(&self, point: OperatingPoint) -> Result<f64, LinkError> {
        point.validate()?;
        Ok(coincidence::measured_coincidences(&self.config, &point))
    }

    /// Coincidence rate attributable to an error process with probability `error_rate`.
    pub fn erroneous_coincidences(
        &self,
        point: OperatingPoint,
        error_rate: f64,
    ) -> Result<f64, LinkError> {
        point.validate()?;
        if !(0.0..=1.0).contains(&error_rate) {
            return Err(LinkError::OutOfRange {
                field: "error_rate",
                index: 0,
                value: error_rate,
                expected: "[0, 1]",
            });
        }
        Ok(coincidence::erroneous_coincidences(&self.config, &point, error_rate))
    }

    /// Sifted pair rate at `point`.
    pub fn raw_rate(&self, point: OperatingPoint) -> Result<f64, LinkError> {
        point.validate()?;
        Ok(rate::raw_rate(&self.config, &point))
    }

    /// Estimated quantum bit error rate at `point`.
    pub fn error_rate(&self, point: OperatingPoint) -> Result<f64, LinkError> {
        rate::error_rate(&self.config, &point)
    }

    /// Estimated phase error rate at `point`.
    pub fn phase_error_rate(&self, point: OperatingPoint) -> Result<f64, LinkError> {
        rate::phase_error_rate(&self.config, &point)
    }

    /// Secure key rate at a caller-chosen point, without optimizing.
    ///
    /// Negative when no secure key can be extracted there.
    pub fn custom_performance(&self, point: OperatingPoint) -> Result<f64, LinkError> {
        rate::secure_key_rate(&self.config, &point)
    }

    /// Full key rate breakdown at `point`.
    pub fn performance(&self, point: OperatingPoint) -> Result<Performance, LinkError> {
        rate::performance(&self.config, &point)
    }

    /// Runs the joint window/brightness search and caches the result.
    pub fn optimize_operating_point(
        &mut self,
        brightness_seed: f64,
    ) -> Result<&Optimum, LinkError> {
        let optimum = optimize::optimize_operating_point(&self.config, brightness_seed)?;
        Ok(self.optimum.insert(optimum))
    }

    /// Searches the window alone at a fixed brightness. The cache is not touched.
    pub fn optimize_window_given_brightness(&self, brightness: f64) -> Result<Optimum, LinkError> {
        optimize::optimize_window(&self.config, brightness)
    }

    /// Cached result of the latest joint search.
    pub fn optimum(&self) -> Option<&Optimum> {
        self.optimum.as_ref()
    }

    /// Cached optimal operating point.
    pub fn optimal_operating_point(&self) -> Option<OperatingPoint> {
        self.optimum.as_ref().map(|o| o.operating_point)
    }

    /// Cached optimal key rate.
    pub fn optimal_key_rate(&self) -> Option<f64> {
        self.optimum.as_ref().map(|o| o.key_rate)
    }
}

impl fmt::Display for LinkModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: BBM92 link with {} detectors per partner",
            self.config.name(),
            self.config.detector_count()
        )
    }
}
