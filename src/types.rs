//! Value types exchanged between collaborators and the decision pipeline

use crate::config::RiskLevel;
use crate::window::SLOT_MINUTES;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

impl PricePoint {
    pub fn new(timestamp: DateTime<Utc>, price: f64) -> Self {
        Self { timestamp, price }
    }
}

/// Price series published by a time-of-use tariff provider
///
/// A price applies from its timestamp for one resolution step (the smallest
/// gap between consecutive points, a quarter hour for single-point series).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeOfUsePrices {
    /// When the provider last refreshed the series
    pub update_time: DateTime<Utc>,
    pub values: BTreeMap<DateTime<Utc>, f64>,
}

impl TimeOfUsePrices {
    pub fn new(update_time: DateTime<Utc>, values: BTreeMap<DateTime<Utc>, f64>) -> Self {
        Self {
            update_time,
            values,
        }
    }

    /// Build a series of evenly spaced prices starting at `start`
    pub fn from_steps(
        update_time: DateTime<Utc>,
        start: DateTime<Utc>,
        step: TimeDelta,
        prices: &[f64],
    ) -> Self {
        let mut values = BTreeMap::new();
        let mut ts = start;
        for price in prices {
            values.insert(ts, *price);
            let Some(next) = ts.checked_add_signed(step) else {
                break;
            };
            ts = next;
        }
        Self::new(update_time, values)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn points(&self) -> Vec<PricePoint> {
        self.values
            .iter()
            .map(|(ts, price)| PricePoint::new(*ts, *price))
            .collect()
    }

    /// Smallest positive spacing between consecutive points
    pub fn resolution(&self) -> TimeDelta {
        self.values
            .keys()
            .zip(self.values.keys().skip(1))
            .map(|(a, b)| *b - *a)
            .filter(|gap| *gap > TimeDelta::zero())
            .min()
            .unwrap_or_else(|| TimeDelta::minutes(SLOT_MINUTES))
    }

    /// Price in effect at `instant`, if the series covers it
    pub fn price_at(&self, instant: DateTime<Utc>) -> Option<f64> {
        let (ts, price) = self.values.range(..=instant).next_back()?;
        (instant < *ts + self.resolution()).then_some(*price)
    }
}

/// Forecast series on a fixed slot grid, in watts per slot
///
/// Values may be absent for individual slots. Twenty-four values describe an
/// hourly forecast; any other length is read as quarter-hour slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionSeries {
    start: DateTime<Utc>,
    slot_minutes: i64,
    values: Vec<Option<i32>>,
}

impl PredictionSeries {
    pub fn new(start: DateTime<Utc>, values: Vec<Option<i32>>) -> Self {
        let slot_minutes = if values.len() == 24 { 60 } else { SLOT_MINUTES };
        Self::with_slot_minutes(start, slot_minutes, values)
    }

    pub fn with_slot_minutes(
        start: DateTime<Utc>,
        slot_minutes: i64,
        values: Vec<Option<i32>>,
    ) -> Self {
        Self {
            start,
            slot_minutes: slot_minutes.max(1),
            values,
        }
    }

    /// Series without gaps
    pub fn from_values(start: DateTime<Utc>, values: &[i32]) -> Self {
        Self::new(start, values.iter().copied().map(Some).collect())
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn slot(&self) -> TimeDelta {
        TimeDelta::minutes(self.slot_minutes)
    }

    pub fn slot_hours(&self) -> f64 {
        self.slot_minutes as f64 / 60.0
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + self.slot() * self.values.len() as i32
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[Option<i32>] {
        &self.values
    }

    /// Slot start instants paired with their values
    pub fn slots(&self) -> impl Iterator<Item = (DateTime<Utc>, Option<i32>)> + '_ {
        let slot = self.slot();
        self.values
            .iter()
            .enumerate()
            .map(move |(i, value)| (self.start + slot * i as i32, *value))
    }

    /// Value of the slot containing `instant`
    pub fn value_at(&self, instant: DateTime<Utc>) -> Option<i32> {
        if instant < self.start {
            return None;
        }
        let index = (instant - self.start).num_seconds() / self.slot().num_seconds();
        self.values
            .get(usize::try_from(index).ok()?)
            .copied()
            .flatten()
    }

    /// Start of the slot containing `instant` on this series' grid
    pub fn slot_start_of(&self, instant: DateTime<Utc>) -> DateTime<Utc> {
        let offset = instant - self.start;
        let slot_secs = self.slot().num_seconds();
        let floored = offset.num_seconds().div_euclid(slot_secs) * slot_secs;
        self.start + TimeDelta::seconds(floored)
    }
}

/// Battery figures for one cycle, derived from capacity, SoC and reserve
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacitySnapshot {
    /// Net capacity in Wh
    pub capacity_wh: u32,
    pub soc_percent: u8,
    /// Energy currently stored, `capacity * soc / 100`
    pub available_wh: f64,
    /// Energy kept back for the minimum SoC and the risk reserve
    pub reserve_wh: f64,
    /// Stored energy the plan may use, never negative
    pub usable_wh: f64,
    /// Lowest SoC the plan discharges to (percent)
    pub limit_soc_percent: u8,
}

impl CapacitySnapshot {
    pub fn new(capacity_wh: u32, soc_percent: u8, risk: RiskLevel, min_soc_percent: u8) -> Self {
        let soc_percent = soc_percent.min(100);
        let limit_soc_percent = min_soc_percent
            .saturating_add(risk.reserve_percent())
            .min(100);
        let capacity = f64::from(capacity_wh);
        let available_wh = capacity * f64::from(soc_percent) / 100.0;
        let reserve_wh = capacity * f64::from(limit_soc_percent) / 100.0;
        Self {
            capacity_wh,
            soc_percent,
            available_wh,
            reserve_wh,
            usable_wh: (available_wh - reserve_wh).max(0.0),
            limit_soc_percent,
        }
    }

    /// SoC (percent) corresponding to a stored energy amount
    pub fn soc_for_energy(&self, energy_wh: f64) -> u8 {
        if self.capacity_wh == 0 {
            return 0;
        }
        let soc = (energy_wh / f64::from(self.capacity_wh) * 100.0).round();
        soc.clamp(0.0, 100.0) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn price_lookup_respects_resolution() {
        let prices = TimeOfUsePrices::from_steps(
            utc("2021-01-01T00:00:00Z"),
            utc("2021-01-01T15:00:00Z"),
            TimeDelta::minutes(15),
            &[100.0, 90.0, 80.0, 70.0],
        );
        assert_eq!(prices.resolution(), TimeDelta::minutes(15));
        assert_eq!(prices.price_at(utc("2021-01-01T15:50:00Z")), Some(70.0));
        assert_eq!(prices.price_at(utc("2021-01-01T15:14:59Z")), Some(100.0));
        assert_eq!(prices.price_at(utc("2021-01-01T16:00:00Z")), None);
        assert_eq!(prices.price_at(utc("2021-01-01T14:59:00Z")), None);
    }

    #[test]
    fn hourly_prices_cover_four_quarters() {
        let prices = TimeOfUsePrices::from_steps(
            utc("2021-01-01T00:00:00Z"),
            utc("2021-01-01T00:00:00Z"),
            TimeDelta::hours(1),
            &[10.0, 20.0],
        );
        assert_eq!(prices.price_at(utc("2021-01-01T00:45:00Z")), Some(10.0));
        assert_eq!(prices.price_at(utc("2021-01-01T01:45:00Z")), Some(20.0));
        assert_eq!(prices.price_at(utc("2021-01-01T02:00:00Z")), None);
    }

    #[test]
    fn hourly_series_is_detected_from_length() {
        let start = utc("2021-01-01T00:00:00Z");
        let hourly = PredictionSeries::from_values(start, &[100; 24]);
        assert_eq!(hourly.slot(), TimeDelta::hours(1));
        assert_eq!(hourly.end(), utc("2021-01-02T00:00:00Z"));

        let quarterly = PredictionSeries::from_values(start, &[100; 96]);
        assert_eq!(quarterly.slot(), TimeDelta::minutes(15));
        assert_eq!(quarterly.end(), utc("2021-01-02T00:00:00Z"));
    }

    #[test]
    fn prediction_lookup_handles_gaps_and_bounds() {
        let start = utc("2021-01-01T00:00:00Z");
        let series = PredictionSeries::new(start, vec![Some(1), None, Some(3)]);
        assert_eq!(series.value_at(utc("2021-01-01T00:14:00Z")), Some(1));
        assert_eq!(series.value_at(utc("2021-01-01T00:20:00Z")), None);
        assert_eq!(series.value_at(utc("2021-01-01T00:30:00Z")), Some(3));
        assert_eq!(series.value_at(utc("2021-01-01T00:45:00Z")), None);
        assert_eq!(series.value_at(utc("2020-12-31T23:59:00Z")), None);
        assert_eq!(
            series.slot_start_of(utc("2021-01-01T00:20:00Z")),
            utc("2021-01-01T00:15:00Z")
        );
    }

    #[test]
    fn capacity_snapshot_applies_reserve() {
        let high = CapacitySnapshot::new(12000, 100, RiskLevel::High, 0);
        assert!((high.available_wh - 12000.0).abs() < f64::EPSILON);
        assert!((high.usable_wh - 12000.0).abs() < f64::EPSILON);

        let low = CapacitySnapshot::new(10000, 50, RiskLevel::Low, 10);
        assert_eq!(low.limit_soc_percent, 30);
        assert!((low.reserve_wh - 3000.0).abs() < f64::EPSILON);
        assert!((low.usable_wh - 2000.0).abs() < f64::EPSILON);

        let empty = CapacitySnapshot::new(10000, 5, RiskLevel::Medium, 0);
        assert!(empty.usable_wh.abs() < f64::EPSILON);
        assert_eq!(empty.soc_for_energy(5000.0), 50);
    }
}
