use std::fs;
use tou_discharge::config::{Config, MissingDataPolicy, Mode, RiskLevel};
use tou_discharge::window::SchedulingWindow;

#[test]
fn save_and_load_yaml_roundtrip() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("config.yaml");

    let mut cfg = Config::default();
    cfg.controller.ess_id = "ess3".to_string();
    cfg.controller.mode = Mode::Manual;
    cfg.controller.risk_level = RiskLevel::Low;
    cfg.controller.missing_data_policy = MissingDataPolicy::Allow;
    cfg.controller.window = SchedulingWindow::new(17, 7).unwrap();
    cfg.controller.timezone = "Europe/Amsterdam".to_string();
    cfg.logging.file = path.with_extension("log").to_string_lossy().to_string();

    cfg.save_to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded.controller, cfg.controller);
    assert_eq!(loaded.logging.file, cfg.logging.file);
    assert!(loaded.validate().is_ok());
}

#[test]
fn config_validation_errors() {
    let mut cfg = Config::default();

    // Empty collaborator ids
    cfg.controller.ess_id.clear();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.controller.predictor_id = "  ".to_string();
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.controller.tariff_provider_id.clear();
    assert!(cfg.validate().is_err());

    // Hours out of range
    cfg = Config::default();
    cfg.controller.window = SchedulingWindow {
        start_hour: 8,
        end_hour: 24,
    };
    assert!(cfg.validate().is_err());

    cfg = Config::default();
    cfg.controller.min_soc_percent = 101;
    assert!(cfg.validate().is_err());

    // Cycle interval zero
    cfg = Config::default();
    cfg.runtime.cycle_interval_ms = 0;
    assert!(cfg.validate().is_err());
}

#[test]
fn validation_errors_name_the_field() {
    let mut cfg = Config::default();
    cfg.controller.window = SchedulingWindow {
        start_hour: 6,
        end_hour: 6,
    };
    let err = cfg.validate().unwrap_err();
    assert!(err.is_configuration());
    assert!(format!("{}", err).contains("controller.window"));
}

#[test]
fn from_file_with_invalid_yaml_fails() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"controller: [unclosed").unwrap();
    let err = Config::from_file(tmp.path()).unwrap_err();
    let msg = format!("{}", err);
    assert!(msg.contains("Serialization error"));
}

#[test]
fn unknown_mode_is_rejected_at_parse_time() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    fs::write(tmp.path(), b"controller:\n  mode: TURBO\n").unwrap();
    assert!(Config::from_file(tmp.path()).is_err());
}
