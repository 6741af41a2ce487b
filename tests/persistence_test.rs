use chrono::{DateTime, Utc};
use tou_discharge::persistence::{PersistenceManager, PersistentState};
use tou_discharge::state_machine::DischargeState;

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

#[test]
fn default_state_values() {
    let s = PersistentState::default();
    assert_eq!(s.state, DischargeState::Standby);
    assert_eq!(s.delayed_time_seconds, 0);
    assert!(s.last_price_update.is_none());
}

#[test]
fn load_save_roundtrip() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    let path = tmp.path().to_path_buf();

    let mut mgr = PersistenceManager::new(&path);
    mgr.replace(
        PersistentState {
            state: DischargeState::AllowsDischarge,
            delayed_time_seconds: 5400,
            last_price_update: Some(utc("2021-01-01T13:00:00Z")),
            saved_at: None,
        },
        utc("2021-01-01T15:45:00Z"),
    );
    mgr.save().unwrap();

    let mut mgr2 = PersistenceManager::new(&path);
    mgr2.load().unwrap();
    assert_eq!(mgr2.state().state, DischargeState::AllowsDischarge);
    assert_eq!(mgr2.state().delayed_time_seconds, 5400);
    assert_eq!(
        mgr2.state().last_price_update,
        Some(utc("2021-01-01T13:00:00Z"))
    );
    assert_eq!(mgr2.state().saved_at, Some(utc("2021-01-01T15:45:00Z")));
}

#[test]
fn corrupt_file_is_reported() {
    let tmp = tempfile::NamedTempFile::new().unwrap();
    std::fs::write(tmp.path(), "{ not json").unwrap();
    let mut mgr = PersistenceManager::new(tmp.path());
    assert!(mgr.load().is_err());
    assert_eq!(mgr.state(), &PersistentState::default());
}

#[test]
fn save_creates_missing_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let mgr = PersistenceManager::new(&path);
    mgr.save().unwrap();
    assert!(path.exists());
}
