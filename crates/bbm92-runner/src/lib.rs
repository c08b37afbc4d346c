//! # bbm92-runner
//!
//! Drivers around the BBM92 link model: the `bbm92` command-line tool and
//! loss-profile sweeps that integrate secure key over time.
//!
//! ```bash
//! # Optimal operating point for the link in the settings file
//! bbm92 -s settings/downlink.yaml optimize
//!
//! # Same link with 45 dB on the satellite side, as JSON
//! bbm92 -s settings/downlink.yaml --json optimize --loss-b 45 --loss-format dB
//!
//! # What-if evaluation at a chosen point
//! bbm92 evaluate --window 1e-9 --brightness 5e7
//!
//! # Integrated key over the overpass profile
//! bbm92 sweep
//! ```

pub mod cli;
mod error;
pub mod sweep;

pub use cli::{execute, run_command, Cli, Commands, LinkReport, LossArgs};
pub use error::RunnerError;
pub use sweep::{integrate_key_bits, sweep_profile, SweepReport, SweepSample};
