//! Loss-profile sweeps over the downlink settings.

use approx::assert_relative_eq;
use bbm92_runner::sweep_profile;
use bbm92_settings::{load_settings, LinkSettings, LossProfile};
use std::path::PathBuf;

fn downlink() -> LinkSettings {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../settings/downlink.yaml");
    load_settings(path).unwrap()
}

#[test]
fn test_sample_sweep_reference_rates() {
    let profile = LossProfile::Samples {
        loss_a_db: 20.0,
        loss_b_db: vec![35.0, 40.0, 45.0],
        step_s: 5.0,
        start_s: 0.0,
    };
    let report = sweep_profile(&downlink(), &profile).unwrap();
    assert_eq!(report.link, "ogs-sat");
    assert_eq!(report.samples.len(), 3);

    let rates: Vec<f64> = report.samples.iter().map(|s| s.key_rate).collect();
    assert_relative_eq!(rates[0], 145.2, max_relative = 1e-2);
    assert_relative_eq!(rates[1], 44.68, max_relative = 1e-2);
    assert_relative_eq!(rates[2], 12.95, max_relative = 1e-2);

    let times: Vec<f64> = report.samples.iter().map(|s| s.time_s).collect();
    assert_eq!(times, vec![0.0, 5.0, 10.0]);

    assert_relative_eq!(
        report.integrated_key_bits,
        5.0 * rates.iter().sum::<f64>(),
        max_relative = 1e-12
    );
    assert_eq!(report.peak().map(|s| s.loss_b_db), Some(35.0));
    for sample in &report.samples {
        assert!(sample.qber > 0.0 && sample.qber < 0.11);
    }
}

#[test]
fn test_overpass_sweep_is_symmetric() {
    let settings = downlink();
    let profile = settings.profile.clone().unwrap();
    let report = sweep_profile(&settings, &profile).unwrap();
    assert_eq!(report.samples.len(), 40);
    assert_eq!(report.not_converged(), 0);

    let at = |t: f64| {
        report
            .samples
            .iter()
            .find(|s| s.time_s == t)
            .unwrap()
            .key_rate
    };
    assert_relative_eq!(at(0.0), 44.68, max_relative = 1e-2);
    assert_relative_eq!(at(-50.0), at(50.0), max_relative = 1e-9);
    assert!(at(0.0) > at(-50.0));
    assert_eq!(report.peak().map(|s| s.time_s), Some(0.0));
    assert!(report.integrated_key_bits > 0.0);
}

#[test]
fn test_sweep_rejects_bad_profile() {
    let profile = LossProfile::Samples {
        loss_a_db: 20.0,
        loss_b_db: vec![40.0],
        step_s: -1.0,
        start_s: 0.0,
    };
    assert!(sweep_profile(&downlink(), &profile).is_err());
}
