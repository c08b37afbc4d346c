//! Command-line interface of the `bbm92` binary.

use crate::error::RunnerError;
use crate::sweep::sweep_profile;
use bbm92_link::{
    db_to_transmittance, transmittance_to_db, DetectorInput, LinkModel, LinkParams, LossFormat,
    OperatingPoint, Optimum, Performance,
};
use bbm92_settings::{load_settings, LinkSettings};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::info;

/// BBM92 secure key rate model
#[derive(Parser, Debug)]
#[command(name = "bbm92")]
#[command(author, version, about = "Secure key rate model for BBM92 entanglement-based QKD links")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Link settings file (YAML)
    #[arg(short, long, global = true, default_value = "settings/downlink.yaml")]
    pub settings: PathBuf,

    /// Print results as JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Log filter used when RUST_LOG is unset (e.g. "debug", "bbm92_link=trace")
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Jointly optimize coincidence window and brightness
    Optimize {
        /// Starting brightness in units of 1e9 pairs/s
        #[arg(long)]
        brightness_seed: Option<f64>,

        #[command(flatten)]
        loss: LossArgs,
    },

    /// Optimize the coincidence window at a fixed brightness
    Window {
        /// Source brightness (pairs/s)
        #[arg(long)]
        brightness: f64,

        #[command(flatten)]
        loss: LossArgs,
    },

    /// Evaluate the link at a chosen operating point
    Evaluate {
        /// Coincidence window (s)
        #[arg(long)]
        window: f64,

        /// Source brightness (pairs/s)
        #[arg(long)]
        brightness: f64,

        #[command(flatten)]
        loss: LossArgs,
    },

    /// Optimize the link over the loss profile in the settings file
    Sweep,
}

/// Loss overrides applied on top of the settings file.
#[derive(Args, Debug, Clone, Default)]
pub struct LossArgs {
    /// Party A efficiency or loss
    #[arg(long)]
    pub loss_a: Option<f64>,

    /// Party B efficiency or loss
    #[arg(long)]
    pub loss_b: Option<f64>,

    /// Unit of the overrides: "loss" (linear) or "dB"
    #[arg(long)]
    pub loss_format: Option<LossFormat>,
}

impl LossArgs {
    /// Link parameters of `settings` with the overrides applied.
    ///
    /// A party without an override keeps its settings value, converted to
    /// the override unit when `--loss-format` differs from the settings file.
    pub fn link_params(&self, settings: &LinkSettings) -> LinkParams {
        if self.loss_a.is_none() && self.loss_b.is_none() && self.loss_format.is_none() {
            return settings.link_params();
        }
        let format = self.loss_format.unwrap_or(settings.loss.format);
        let kept = |input: &DetectorInput| convert_loss(input, settings.loss.format, format);
        settings.link_params_with_loss(
            self.loss_a.map_or_else(|| kept(&settings.loss.a), Into::into),
            self.loss_b.map_or_else(|| kept(&settings.loss.b), Into::into),
            format,
        )
    }
}

fn convert_loss(input: &DetectorInput, from: LossFormat, to: LossFormat) -> DetectorInput {
    let convert = |value: f64| match (from, to) {
        (LossFormat::Linear, LossFormat::Decibel) => transmittance_to_db(value),
        (LossFormat::Decibel, LossFormat::Linear) => db_to_transmittance(value),
        _ => value,
    };
    match input {
        DetectorInput::Scalar(value) => DetectorInput::Scalar(convert(*value)),
        DetectorInput::PerDetector(values) => {
            DetectorInput::PerDetector(values.iter().copied().map(convert).collect())
        }
    }
}

/// Result of a single-link command.
#[derive(Debug, Clone, Serialize)]
pub struct LinkReport {
    pub link: String,
    /// Search that produced the operating point, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimum: Option<Optimum>,
    pub performance: Performance,
}

impl fmt::Display for LinkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.performance;
        writeln!(f, "{}", self.link)?;
        if let Some(optimum) = &self.optimum {
            writeln!(
                f,
                "  search:              {} after {} iterations",
                if optimum.converged { "converged" } else { "NOT converged" },
                optimum.iterations
            )?;
        }
        writeln!(f, "  coincidence window:  {:.4e} s", p.operating_point.coincidence_window)?;
        writeln!(f, "  brightness:          {:.4e} pairs/s", p.operating_point.brightness)?;
        writeln!(f, "  coincidences:        {:.4e} /s", p.measured_coincidences)?;
        writeln!(f, "  raw rate:            {:.4e} /s", p.raw_rate)?;
        writeln!(f, "  QBER:                {:.4}", p.qber)?;
        writeln!(f, "  phase error:         {:.4}", p.phase_error)?;
        writeln!(f, "  EC leakage:          {:.4}", p.ec_leakage)?;
        writeln!(f, "  PA leakage:          {:.4}", p.pa_leakage)?;
        write!(f, "  secure key rate:     {:.4e} bits/s", p.key_rate)
    }
}

/// Runs `cli` and renders its output.
pub fn execute(cli: &Cli) -> Result<String, RunnerError> {
    let settings = load_settings(&cli.settings)?;
    info!("Loaded link '{}' from {}", settings.name, cli.settings.display());
    run_command(&cli.command, &settings, cli.json)
}

/// Runs one command against already loaded settings.
pub fn run_command(
    command: &Commands,
    settings: &LinkSettings,
    json: bool,
) -> Result<String, RunnerError> {
    match command {
        Commands::Optimize {
            brightness_seed,
            loss,
        } => {
            let mut model = build_model(settings, loss)?;
            let seed = brightness_seed.unwrap_or(settings.brightness_seed);
            let optimum = model.optimize_operating_point(seed)?.clone();
            let report = optimum_report(&model, optimum)?;
            render(&report, json)
        }
        Commands::Window { brightness, loss } => {
            let model = build_model(settings, loss)?;
            let optimum = model.optimize_window_given_brightness(*brightness)?;
            let report = optimum_report(&model, optimum)?;
            render(&report, json)
        }
        Commands::Evaluate {
            window,
            brightness,
            loss,
        } => {
            let model = build_model(settings, loss)?;
            let report = LinkReport {
                link: model.to_string(),
                optimum: None,
                performance: model.performance(OperatingPoint::new(*window, *brightness))?,
            };
            render(&report, json)
        }
        Commands::Sweep => {
            let profile = settings
                .profile
                .as_ref()
                .ok_or_else(|| RunnerError::NoProfile(settings.name.clone()))?;
            let report = sweep_profile(settings, profile)?;
            render(&report, json)
        }
    }
}

fn build_model(settings: &LinkSettings, loss: &LossArgs) -> Result<LinkModel, RunnerError> {
    let params = LinkParams {
        skip_initial_optimization: true,
        ..loss.link_params(settings)
    };
    Ok(LinkModel::new(&params)?)
}

fn optimum_report(model: &LinkModel, optimum: Optimum) -> Result<LinkReport, RunnerError> {
    Ok(LinkReport {
        link: model.to_string(),
        performance: model.performance(optimum.operating_point)?,
        optimum: Some(optimum),
    })
}

fn render<T: Serialize + fmt::Display>(value: &T, json: bool) -> Result<String, RunnerError> {
    if json {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(value.to_string())
    }
}
