//! JSON scenario files for the in-memory collaborators
//!
//! A scenario fixes the battery, the forecast profiles and the price series
//! the binary replays. Profiles roll with time; prices are anchored at
//! `prices.start`, or at the current UTC midnight when it is omitted.

use crate::collaborators::{SimulatedEss, StaticPredictor, StaticTariff};
use crate::error::{DischargeError, Result};
use crate::types::TimeOfUsePrices;
use crate::window::SLOT_MINUTES;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_RESOLUTION_MINUTES: i64 = 24 * 60;

fn default_resolution_minutes() -> i64 {
    SLOT_MINUTES
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioPrices {
    pub start: Option<DateTime<Utc>>,
    #[serde(default = "default_resolution_minutes")]
    pub resolution_minutes: i64,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub capacity_wh: u32,
    pub soc_percent: u8,
    /// Production forecast in W per slot, starting at the current slot
    #[serde(default)]
    pub production: Vec<i32>,
    /// Consumption forecast in W per slot, starting at the current slot
    #[serde(default)]
    pub consumption: Vec<i32>,
    pub prices: ScenarioPrices,
}

impl Scenario {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DischargeError::io(format!(
                "Failed to read scenario {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.soc_percent > 100 {
            return Err(DischargeError::validation(
                "scenario.soc_percent",
                "Must be between 0 and 100",
            ));
        }
        if !(1..=MAX_RESOLUTION_MINUTES).contains(&self.prices.resolution_minutes) {
            return Err(DischargeError::validation(
                "scenario.prices.resolution_minutes",
                "Must be between 1 and 1440",
            ));
        }
        Ok(())
    }

    /// Build collaborators replaying this scenario
    pub fn into_collaborators(self, now: DateTime<Utc>) -> (StaticPredictor, StaticTariff, SimulatedEss) {
        let mut predictor = StaticPredictor::rolling(&self.production, &self.consumption);
        if self.production.is_empty() {
            predictor.set_production(None);
        }
        if self.consumption.is_empty() {
            predictor.set_consumption(None);
        }

        let start = self.prices.start.unwrap_or_else(|| {
            now.date_naive()
                .and_hms_opt(0, 0, 0)
                .map_or(now, |midnight| midnight.and_utc())
        });
        let tariff = StaticTariff::new(TimeOfUsePrices::from_steps(
            now,
            start,
            TimeDelta::minutes(self.prices.resolution_minutes),
            &self.prices.values,
        ));

        let ess = SimulatedEss::new(self.capacity_wh, self.soc_percent);
        (predictor, tariff, ess)
    }
}
