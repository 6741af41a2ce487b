#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(scenario) = tou_discharge::scenario::Scenario::from_json(text) {
        assert!(scenario.soc_percent <= 100);
        let _ = scenario.into_collaborators(chrono::Utc::now());
    }
});
