//! Interfaces to the components the controller reads from and writes to
//!
//! Each call may fail; the controller treats any failure as missing data for
//! the cycle in which it happened.

use crate::error::Result;
use crate::types::{PredictionSeries, TimeOfUsePrices};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod memory;

pub use memory::{SimulatedEss, StaticPredictor, StaticTariff};

/// Forecast channels the controller asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionChannel {
    Production,
    Consumption,
}

impl PredictionChannel {
    /// Address of the channel on the sum component
    pub fn address(self) -> &'static str {
        match self {
            PredictionChannel::Production => "_sum/ProductionActivePower",
            PredictionChannel::Consumption => "_sum/ConsumptionActivePower",
        }
    }
}

impl std::fmt::Display for PredictionChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.address())
    }
}

/// Source of production and consumption forecasts
pub trait PredictorManager {
    /// Forecast for a channel, or `None` when no prediction is available
    fn get_prediction(
        &self,
        channel: PredictionChannel,
        now: DateTime<Utc>,
    ) -> Result<Option<PredictionSeries>>;
}

/// Source of time-of-use prices
pub trait TimeOfUseTariff {
    fn get_prices(&self) -> Result<TimeOfUsePrices>;
}

/// The managed energy storage system
pub trait ManagedEss {
    /// Net capacity in Wh
    fn capacity_wh(&self) -> Result<Option<u32>>;

    /// State of charge in percent
    fn soc(&self) -> Result<Option<u8>>;

    /// Limit discharge power to zero (`true`) or lift the limit (`false`)
    fn apply_discharge_constraint(&mut self, hold: bool) -> Result<()>;
}
