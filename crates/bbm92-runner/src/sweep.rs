//! Loss-profile sweeps.
//!
//! Every profile sample gets its own optimized [`LinkModel`], so the
//! samples are independent and are evaluated in parallel. Results are
//! returned in profile order.

use crate::error::RunnerError;
use bbm92_link::{DetectorInput, LinkModel, LossFormat, OperatingPoint};
use bbm92_settings::{LinkSettings, LossProfile, ProfileSample};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Optimized link figures at one profile sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepSample {
    pub time_s: f64,
    pub loss_a_db: f64,
    pub loss_b_db: f64,
    pub operating_point: OperatingPoint,
    /// Optimized secure key rate (bits/s). Negative when no key survives.
    pub key_rate: f64,
    pub qber: f64,
    pub converged: bool,
}

/// Result of sweeping a loss profile.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub link: String,
    pub step_s: f64,
    pub samples: Vec<SweepSample>,
    /// Secure key bits accumulated over the profile.
    pub integrated_key_bits: f64,
}

impl SweepReport {
    fn new(link: String, step_s: f64, samples: Vec<SweepSample>) -> Self {
        let integrated_key_bits = integrate_key_bits(&samples, step_s);
        Self {
            link,
            step_s,
            samples,
            integrated_key_bits,
        }
    }

    /// Sample with the highest key rate.
    pub fn peak(&self) -> Option<&SweepSample> {
        self.samples
            .iter()
            .max_by(|a, b| a.key_rate.total_cmp(&b.key_rate))
    }

    /// Number of samples whose search hit the iteration limit.
    pub fn not_converged(&self) -> usize {
        self.samples.iter().filter(|s| !s.converged).count()
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Loss profile sweep for '{}' ({} samples, step {} s)",
            self.link,
            self.samples.len(),
            self.step_s
        )?;
        writeln!(
            f,
            "{:>10} {:>10} {:>10} {:>12} {:>12} {:>14} {:>8}",
            "time_s", "loss_a_dB", "loss_b_dB", "window_s", "brightness", "key_rate", "qber"
        )?;
        for s in &self.samples {
            writeln!(
                f,
                "{:>10.1} {:>10.2} {:>10.2} {:>12.4e} {:>12.4e} {:>14.6e} {:>8.4}{}",
                s.time_s,
                s.loss_a_db,
                s.loss_b_db,
                s.operating_point.coincidence_window,
                s.operating_point.brightness,
                s.key_rate,
                s.qber,
                if s.converged { "" } else { "  (not converged)" }
            )?;
        }
        write!(f, "Integrated secure key: {:.6e} bits", self.integrated_key_bits)
    }
}

/// Sum of positive key rates times the sample spacing.
pub fn integrate_key_bits(samples: &[SweepSample], step_s: f64) -> f64 {
    samples.iter().map(|s| s.key_rate.max(0.0) * step_s).sum()
}

/// Optimizes the link at every sample of `profile`.
pub fn sweep_profile(
    settings: &LinkSettings,
    profile: &LossProfile,
) -> Result<SweepReport, RunnerError> {
    profile.validate()?;
    let points = profile.samples();
    info!(
        "Sweeping {} loss samples for '{}' using {} threads",
        points.len(),
        settings.name,
        rayon::current_num_threads()
    );

    let samples = points
        .par_iter()
        .map(|point| optimize_sample(settings, point))
        .collect::<Result<Vec<_>, RunnerError>>()?;

    let report = SweepReport::new(settings.name.clone(), profile.step_s(), samples);
    let not_converged = report.not_converged();
    if not_converged > 0 {
        warn!(
            "{} of {} sweep samples did not converge",
            not_converged,
            report.samples.len()
        );
    }
    info!(
        "Sweep complete: {:.6e} secure key bits",
        report.integrated_key_bits
    );
    Ok(report)
}

fn optimize_sample(
    settings: &LinkSettings,
    sample: &ProfileSample,
) -> Result<SweepSample, RunnerError> {
    let mut params = settings.link_params_with_loss(
        DetectorInput::Scalar(sample.loss_a_db),
        DetectorInput::Scalar(sample.loss_b_db),
        LossFormat::Decibel,
    );
    params.skip_initial_optimization = true;

    let mut model = LinkModel::new(&params)?;
    let optimum = model.optimize_operating_point(settings.brightness_seed)?.clone();
    let qber = model.error_rate(optimum.operating_point)?;
    debug!(
        "t = {} s: key rate {:.4e} at {:?}",
        sample.time_s, optimum.key_rate, optimum.operating_point
    );

    Ok(SweepSample {
        time_s: sample.time_s,
        loss_a_db: sample.loss_a_db,
        loss_b_db: sample.loss_b_db,
        operating_point: optimum.operating_point,
        key_rate: optimum.key_rate,
        qber,
        converged: optimum.converged,
    })
}
