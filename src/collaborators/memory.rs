//! In-memory collaborators backed by fixed profiles
//!
//! Used by the binary to replay a scenario file and by tests to script
//! forecasts, prices and battery readings.

use super::{ManagedEss, PredictionChannel, PredictorManager, TimeOfUseTariff};
use crate::error::{DischargeError, Result};
use crate::types::{PredictionSeries, TimeOfUsePrices};
use crate::window::{round_down_to_slot, slot_duration};
use chrono::{DateTime, TimeDelta, Utc};

type Profile = Vec<Option<i32>>;

/// Predictor serving fixed production and consumption profiles
///
/// Anchored profiles start at a fixed instant. Rolling profiles start at the
/// slot containing the time of the request, so the first value always
/// describes the current slot.
#[derive(Debug, Clone, Default)]
pub struct StaticPredictor {
    anchor: Option<DateTime<Utc>>,
    production: Option<Profile>,
    consumption: Option<Profile>,
    failing: bool,
}

fn profile(values: &[i32]) -> Profile {
    values.iter().copied().map(Some).collect()
}

impl StaticPredictor {
    pub fn anchored(start: DateTime<Utc>, production: &[i32], consumption: &[i32]) -> Self {
        Self {
            anchor: Some(start),
            production: Some(profile(production)),
            consumption: Some(profile(consumption)),
            failing: false,
        }
    }

    pub fn rolling(production: &[i32], consumption: &[i32]) -> Self {
        Self {
            anchor: None,
            production: Some(profile(production)),
            consumption: Some(profile(consumption)),
            failing: false,
        }
    }

    /// Replace the production profile; `None` makes the forecast unavailable
    pub fn set_production(&mut self, values: Option<Profile>) {
        self.production = values;
    }

    /// Replace the consumption profile; `None` makes the forecast unavailable
    pub fn set_consumption(&mut self, values: Option<Profile>) {
        self.consumption = values;
    }

    /// Make every request fail
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl PredictorManager for StaticPredictor {
    fn get_prediction(
        &self,
        channel: PredictionChannel,
        now: DateTime<Utc>,
    ) -> Result<Option<PredictionSeries>> {
        if self.failing {
            return Err(DischargeError::collaborator(
                "predictor",
                format!("prediction for {} unavailable", channel),
            ));
        }

        let values = match channel {
            PredictionChannel::Production => self.production.as_ref(),
            PredictionChannel::Consumption => self.consumption.as_ref(),
        };
        Ok(values.map(|values| {
            let start = self.anchor.unwrap_or_else(|| {
                let slot = if values.len() == 24 {
                    TimeDelta::hours(1)
                } else {
                    slot_duration()
                };
                round_down_to_slot(now, slot)
            });
            PredictionSeries::new(start, values.clone())
        }))
    }
}

/// Tariff returning a fixed price series
#[derive(Debug, Clone, Default)]
pub struct StaticTariff {
    prices: TimeOfUsePrices,
    failing: bool,
}

impl StaticTariff {
    pub fn new(prices: TimeOfUsePrices) -> Self {
        Self {
            prices,
            failing: false,
        }
    }

    /// Publish a new series (bump `update_time` to have it ingested)
    pub fn set_prices(&mut self, prices: TimeOfUsePrices) {
        self.prices = prices;
    }

    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl TimeOfUseTariff for StaticTariff {
    fn get_prices(&self) -> Result<TimeOfUsePrices> {
        if self.failing {
            return Err(DischargeError::collaborator("tariff", "price feed unavailable"));
        }
        Ok(self.prices.clone())
    }
}

/// Battery with scripted readings that remembers the last applied constraint
#[derive(Debug, Clone, Default)]
pub struct SimulatedEss {
    capacity_wh: Option<u32>,
    soc: Option<u8>,
    hold: Option<bool>,
    constraint_calls: u64,
    reject_constraints: bool,
}

impl SimulatedEss {
    pub fn new(capacity_wh: u32, soc: u8) -> Self {
        Self {
            capacity_wh: Some(capacity_wh),
            soc: Some(soc),
            ..Self::default()
        }
    }

    pub fn set_capacity(&mut self, capacity_wh: Option<u32>) {
        self.capacity_wh = capacity_wh;
    }

    pub fn set_soc(&mut self, soc: Option<u8>) {
        self.soc = soc;
    }

    /// Make `apply_discharge_constraint` fail
    pub fn set_reject_constraints(&mut self, reject: bool) {
        self.reject_constraints = reject;
    }

    /// Last constraint applied, `None` before the first cycle
    pub fn hold(&self) -> Option<bool> {
        self.hold
    }

    pub fn constraint_calls(&self) -> u64 {
        self.constraint_calls
    }
}

impl ManagedEss for SimulatedEss {
    fn capacity_wh(&self) -> Result<Option<u32>> {
        Ok(self.capacity_wh)
    }

    fn soc(&self) -> Result<Option<u8>> {
        Ok(self.soc)
    }

    fn apply_discharge_constraint(&mut self, hold: bool) -> Result<()> {
        if self.reject_constraints {
            return Err(DischargeError::collaborator(
                "ess",
                "active power constraint rejected",
            ));
        }
        self.constraint_calls += 1;
        self.hold = Some(hold);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn rolling_profile_starts_at_current_slot() {
        let predictor = StaticPredictor::rolling(&[0; 96], &[500; 96]);
        let series = predictor
            .get_prediction(PredictionChannel::Consumption, utc("2021-01-01T10:07:00Z"))
            .unwrap()
            .unwrap();
        assert_eq!(series.start(), utc("2021-01-01T10:00:00Z"));
        assert_eq!(series.value_at(utc("2021-01-01T10:07:00Z")), Some(500));
    }

    #[test]
    fn hourly_rolling_profile_starts_on_the_hour() {
        let predictor = StaticPredictor::rolling(&[0; 24], &[500; 24]);
        let series = predictor
            .get_prediction(PredictionChannel::Production, utc("2021-01-01T10:37:00Z"))
            .unwrap()
            .unwrap();
        assert_eq!(series.start(), utc("2021-01-01T10:00:00Z"));
    }

    #[test]
    fn missing_and_failing_predictions() {
        let mut predictor = StaticPredictor::anchored(utc("2021-01-01T00:00:00Z"), &[0; 96], &[0; 96]);
        predictor.set_production(None);
        let now = utc("2021-01-01T10:00:00Z");
        assert!(
            predictor
                .get_prediction(PredictionChannel::Production, now)
                .unwrap()
                .is_none()
        );
        predictor.set_failing(true);
        assert!(
            predictor
                .get_prediction(PredictionChannel::Consumption, now)
                .is_err()
        );
    }

    #[test]
    fn ess_records_constraints() {
        let mut ess = SimulatedEss::new(12000, 80);
        assert_eq!(ess.hold(), None);
        ess.apply_discharge_constraint(true).unwrap();
        assert_eq!(ess.hold(), Some(true));
        ess.set_reject_constraints(true);
        assert!(ess.apply_discharge_constraint(false).is_err());
        assert_eq!(ess.hold(), Some(true));
        assert_eq!(ess.constraint_calls(), 1);
    }

    #[test]
    fn tariff_failure_is_reported() {
        let mut tariff = StaticTariff::default();
        assert!(tariff.get_prices().unwrap().is_empty());
        tariff.set_failing(true);
        assert!(tariff.get_prices().is_err());
    }
}
