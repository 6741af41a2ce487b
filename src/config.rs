//! Configuration management for the discharge controller
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files. Invalid controller settings are rejected
//! before the cycle loop starts; nothing here is re-validated mid-cycle.

use crate::error::{DischargeError, Result};
use crate::window::SchedulingWindow;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Environment variable pointing at an explicit configuration file
pub const CONFIG_PATH_ENV: &str = "TOU_DISCHARGE_CONFIG";

fn default_true() -> bool {
    true
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Discharge controller settings
    pub controller: ControllerConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Cycle loop and state file settings
    pub runtime: RuntimeConfig,
}

/// Operating mode of the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mode {
    /// Controller does not interfere; state is always STANDBY
    Off,

    /// Forecast and price driven deferral
    #[default]
    Automatic,

    /// Operator-forced deferral for the whole configured window
    Manual,
}

/// How much of the battery is kept back from the forecast-driven plan
///
/// A higher risk level reserves less energy and accepts a higher chance of
/// running short before the window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl RiskLevel {
    /// Share of the net capacity (percent) that is never planned with
    pub fn reserve_percent(self) -> u8 {
        match self {
            RiskLevel::Low => 20,
            RiskLevel::Medium => 10,
            RiskLevel::High => 0,
        }
    }
}

/// What the actuator does when the engine lacks data inside the window
///
/// The state machine reports STANDBY either way; this only controls whether
/// that STANDBY is enforced on the ESS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MissingDataPolicy {
    /// Hold discharge while data is missing
    #[default]
    Hold,

    /// Leave the ESS unrestricted while data is missing
    Allow,
}

/// Discharge controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Component id, used as log context
    pub id: String,

    /// Human readable alias
    pub alias: String,

    /// Disabled controllers behave like mode OFF
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Id of the managed ESS
    pub ess_id: String,

    /// Id of the predictor providing production/consumption forecasts
    pub predictor_id: String,

    /// Id of the time-of-use tariff provider
    pub tariff_provider_id: String,

    /// Operating mode
    pub mode: Mode,

    /// Daily wall-clock window in which discharge may be deferred
    pub window: SchedulingWindow,

    /// Risk level used to size the capacity reserve
    pub risk_level: RiskLevel,

    /// Minimum SoC (percent) enforced by other controllers, kept out of the plan
    pub min_soc_percent: u8,

    /// Actuator behaviour when forecasts or prices are missing
    pub missing_data_policy: MissingDataPolicy,

    /// IANA time zone the window hours refer to
    pub timezone: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional override for the console layer
    pub console_level: Option<String>,

    /// Optional override for the file layer
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rolling files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Runtime loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Control cycle interval in milliseconds
    pub cycle_interval_ms: u64,

    /// JSON scenario feeding the in-memory collaborators
    pub scenario_file: String,

    /// Where controller state is persisted between restarts
    pub state_file: String,

    /// Persist state every N cycles (0 disables periodic saves)
    pub persist_every_cycles: u64,
}

impl ControllerConfig {
    /// Mode actually applied, taking the enabled flag into account
    pub fn effective_mode(&self) -> Mode {
        if self.enabled { self.mode } else { Mode::Off }
    }

    /// Parse the configured time zone
    pub fn timezone(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            DischargeError::validation(
                "controller.timezone",
                format!("Unknown time zone '{}': {}", self.timezone, e),
            )
        })
    }

    /// Validate controller settings; called at activation time
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(DischargeError::validation(
                "controller.id",
                "Id cannot be empty",
            ));
        }

        if self.ess_id.trim().is_empty() {
            return Err(DischargeError::validation(
                "controller.ess_id",
                "ESS id cannot be empty",
            ));
        }

        if self.predictor_id.trim().is_empty() {
            return Err(DischargeError::validation(
                "controller.predictor_id",
                "Predictor id cannot be empty",
            ));
        }

        if self.tariff_provider_id.trim().is_empty() {
            return Err(DischargeError::validation(
                "controller.tariff_provider_id",
                "Tariff provider id cannot be empty",
            ));
        }

        self.window.validate()?;

        if self.min_soc_percent > 100 {
            return Err(DischargeError::validation(
                "controller.min_soc_percent",
                "Must be between 0 and 100",
            ));
        }

        self.timezone()?;
        Ok(())
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the env override or the default locations
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.trim().is_empty()
        {
            return Self::from_file(path);
        }

        let default_paths = [
            "tou_discharge.yaml",
            "/data/tou_discharge.yaml",
            "/etc/tou-discharge/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.controller.validate()?;

        crate::logging::parse_log_level(&self.logging.level)?;

        if self.runtime.cycle_interval_ms == 0 {
            return Err(DischargeError::validation(
                "runtime.cycle_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.runtime.state_file.trim().is_empty() {
            return Err(DischargeError::validation(
                "runtime.state_file",
                "State file path cannot be empty",
            ));
        }

        Ok(())
    }
}
