//! Loads the settings files shipped with the workspace.

use approx::assert_relative_eq;
use bbm92_link::{DetectorInput, LinkModel, LossFormat};
use bbm92_settings::{load_settings, LossProfile};
use std::path::PathBuf;

fn settings_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../settings")
        .join(name)
}

#[test]
fn test_downlink_settings() {
    let settings = load_settings(settings_path("downlink.yaml")).unwrap();
    assert_eq!(settings.name, "ogs-sat");
    assert_eq!(settings.d, 2);
    assert_eq!(settings.darkcounts_a, DetectorInput::Scalar(300.0));
    assert_eq!(settings.loss.format, LossFormat::Decibel);

    let profile = settings.profile.as_ref().unwrap();
    assert_eq!(profile, &LossProfile::default());
    assert_eq!(profile.samples().len(), 40);

    let model = LinkModel::new(&settings.link_params()).unwrap();
    assert_relative_eq!(model.optimal_key_rate().unwrap(), 44.68, max_relative = 1e-3);
}

#[test]
fn test_lab_settings() {
    let settings = load_settings(settings_path("lab.yaml")).unwrap();
    assert!(settings.profile.is_none());
    let config = settings.link_params().resolve().unwrap();
    assert_relative_eq!(config.efficiency_b()[0], 0.1, max_relative = 1e-12);
    assert_eq!(config.dark_count_a(), &[500.0, 500.0]);
}

#[test]
fn test_four_detector_settings() {
    let settings = load_settings(settings_path("four-detector.yaml")).unwrap();
    let config = settings.link_params().resolve().unwrap();
    assert_eq!(config.detector_count(), 4);
    assert_eq!(config.efficiency_a(), &[0.5, 0.45, 0.5, 0.55]);
    assert_eq!(config.timing_jitter().len(), 16);
}

#[test]
fn test_settings_round_trip_through_yaml() {
    let settings = load_settings(settings_path("downlink.yaml")).unwrap();
    let yaml = serde_yaml::to_string(&settings).unwrap();
    let reloaded = bbm92_settings::load_settings_from_str(&yaml).unwrap();
    assert_eq!(reloaded, settings);
}
