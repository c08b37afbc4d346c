//! Command parsing and execution against the shipped settings files.

use approx::assert_relative_eq;
use bbm92_link::{LinkModel, LossFormat, OperatingPoint};
use bbm92_runner::{execute, run_command, Cli, Commands, RunnerError};
use bbm92_settings::load_settings;
use clap::Parser;
use std::path::PathBuf;

fn settings_path(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../settings")
        .join(name)
        .display()
        .to_string()
}

#[test]
fn test_parse_optimize_with_overrides() {
    let cli = Cli::try_parse_from([
        "bbm92",
        "-s",
        "link.yaml",
        "--json",
        "optimize",
        "--brightness-seed",
        "0.05",
        "--loss-b",
        "45",
        "--loss-format",
        "dB",
    ])
    .unwrap();
    assert!(cli.json);
    assert_eq!(cli.settings, PathBuf::from("link.yaml"));
    assert_eq!(cli.log_level, "info");
    match cli.command {
        Commands::Optimize {
            brightness_seed,
            loss,
        } => {
            assert_eq!(brightness_seed, Some(0.05));
            assert_eq!(loss.loss_a, None);
            assert_eq!(loss.loss_b, Some(45.0));
            assert_eq!(loss.loss_format, Some(LossFormat::Decibel));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_parse_rejects_unknown_loss_format() {
    assert!(Cli::try_parse_from(["bbm92", "optimize", "--loss-format", "nepers"]).is_err());
    assert!(Cli::try_parse_from(["bbm92", "window"]).is_err());
}

#[test]
fn test_optimize_text_output() {
    let cli =
        Cli::try_parse_from(["bbm92", "-s", &settings_path("downlink.yaml"), "optimize"]).unwrap();
    let output = execute(&cli).unwrap();
    assert!(output.starts_with("ogs-sat: BBM92 link with 2 detectors per partner"));
    assert!(output.contains("secure key rate:"));
    assert!(output.contains("converged after"));
}

#[test]
fn test_optimize_json_matches_model() {
    let cli = Cli::try_parse_from([
        "bbm92",
        "-s",
        &settings_path("downlink.yaml"),
        "--json",
        "optimize",
    ])
    .unwrap();
    let output = execute(&cli).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    let key_rate = value["optimum"]["key_rate"].as_f64().unwrap();
    assert_relative_eq!(key_rate, 44.68, max_relative = 1e-3);
    assert_eq!(value["performance"]["key_rate"].as_f64().unwrap(), key_rate);
}

#[test]
fn test_loss_override_reduces_key() {
    let settings = load_settings(settings_path("downlink.yaml")).unwrap();
    let cli = Cli::try_parse_from(["bbm92", "--json", "optimize", "--loss-b", "45"]).unwrap();
    let output = run_command(&cli.command, &settings, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    // Settings format (dB) is kept when only the value is overridden
    assert_relative_eq!(
        value["optimum"]["key_rate"].as_f64().unwrap(),
        12.95,
        max_relative = 1e-2
    );
}

fn loss_overrides(args: &[&str]) -> bbm92_runner::LossArgs {
    let argv = ["bbm92", "evaluate", "--window", "1e-9", "--brightness", "1e7"];
    let cli = Cli::try_parse_from(argv.iter().chain(args).copied()).unwrap();
    match cli.command {
        Commands::Evaluate { loss, .. } => loss,
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_format_override_keeps_other_party_in_its_unit() {
    // Settings efficiencies are linear; party B switches to dB
    let settings = load_settings(settings_path("four-detector.yaml")).unwrap();
    let loss = loss_overrides(&["--loss-b", "3", "--loss-format", "dB"]);
    let params = loss.link_params(&settings);
    assert_eq!(params.loss_format, LossFormat::Decibel);

    let config = params.resolve().unwrap();
    for (actual, expected) in config.efficiency_a().iter().zip([0.5, 0.45, 0.5, 0.55]) {
        assert_relative_eq!(*actual, expected, max_relative = 1e-12);
    }
    for actual in config.efficiency_b() {
        assert_relative_eq!(*actual, 10f64.powf(-0.3), max_relative = 1e-12);
    }

    // Settings losses are in dB; party A switches to linear
    let settings = load_settings(settings_path("downlink.yaml")).unwrap();
    let loss = loss_overrides(&["--loss-a", "0.05", "--loss-format", "loss"]);
    let config = loss.link_params(&settings).resolve().unwrap();
    assert_relative_eq!(config.efficiency_a()[0], 0.05, max_relative = 1e-12);
    assert_relative_eq!(config.efficiency_b()[0], 1e-4, max_relative = 1e-12);
}

#[test]
fn test_format_override_evaluates_like_settings() {
    // Re-expressing the same losses in another unit leaves the result unchanged
    let settings = load_settings(settings_path("four-detector.yaml")).unwrap();
    let evaluate = |args: &[&str]| {
        let argv = ["bbm92", "evaluate", "--window", "1e-9", "--brightness", "1e7"];
        let cli = Cli::try_parse_from(argv.iter().chain(args).copied()).unwrap();
        let output = run_command(&cli.command, &settings, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        value["performance"]["key_rate"].as_f64().unwrap()
    };
    assert_relative_eq!(
        evaluate(&["--loss-format", "dB"]),
        evaluate(&[]),
        max_relative = 1e-9
    );
}

#[test]
fn test_window_command() {
    let settings = load_settings(settings_path("downlink.yaml")).unwrap();
    let cli = Cli::try_parse_from(["bbm92", "window", "--brightness", "1e7"]).unwrap();
    let output = run_command(&cli.command, &settings, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(
        value["optimum"]["operating_point"]["brightness"].as_f64().unwrap(),
        1e7
    );
    assert_relative_eq!(
        value["optimum"]["key_rate"].as_f64().unwrap(),
        13.55,
        max_relative = 1e-2
    );
}

#[test]
fn test_evaluate_command() {
    let settings = load_settings(settings_path("lab.yaml")).unwrap();
    let cli = Cli::try_parse_from([
        "bbm92",
        "evaluate",
        "--window",
        "1e-9",
        "--brightness",
        "1e7",
    ])
    .unwrap();
    let output = run_command(&cli.command, &settings, true).unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert!(value.get("optimum").is_none());

    let params = bbm92_link::LinkParams {
        skip_initial_optimization: true,
        ..settings.link_params()
    };
    let model = LinkModel::new(&params).unwrap();
    let expected = model
        .custom_performance(OperatingPoint::new(1e-9, 1e7))
        .unwrap();
    assert_eq!(value["performance"]["key_rate"].as_f64().unwrap(), expected);
}

#[test]
fn test_evaluate_rejects_invalid_point() {
    let settings = load_settings(settings_path("lab.yaml")).unwrap();
    let cli = Cli::try_parse_from([
        "bbm92",
        "evaluate",
        "--window",
        "0",
        "--brightness",
        "1e7",
    ])
    .unwrap();
    assert!(matches!(
        run_command(&cli.command, &settings, false),
        Err(RunnerError::Link(_))
    ));
}

#[test]
fn test_sweep_without_profile() {
    let settings = load_settings(settings_path("lab.yaml")).unwrap();
    assert!(matches!(
        run_command(&Commands::Sweep, &settings, false),
        Err(RunnerError::NoProfile(name)) if name == "lab"
    ));
}

#[test]
fn test_missing_settings_file() {
    let cli = Cli::try_parse_from(["bbm92", "-s", "no/such/file.yaml", "sweep"]).unwrap();
    assert!(matches!(execute(&cli), Err(RunnerError::Settings(_))));
}
