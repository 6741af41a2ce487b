use super::*;

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            id: "ctrlEssTimeOfUseTariffDischarge0".to_string(),
            alias: String::new(),
            enabled: true,
            ess_id: "ess0".to_string(),
            predictor_id: "predictor0".to_string(),
            tariff_provider_id: "timeOfUseTariff0".to_string(),
            mode: Mode::Automatic,
            window: SchedulingWindow {
                start_hour: 8,
                end_hour: 16,
            },
            risk_level: RiskLevel::Medium,
            min_soc_percent: 0,
            missing_data_policy: MissingDataPolicy::Hold,
            timezone: "UTC".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/tou_discharge.log".to_string(),
            backup_count: 5,
            console_output: true,
            json_format: false,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 1000,
            scenario_file: "scenario.json".to_string(),
            state_file: "/data/tou_discharge_state.json".to_string(),
            persist_every_cycles: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: ControllerConfig::default(),
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }
}
