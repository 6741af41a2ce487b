//! Energy the household still needs from the battery before the window closes

use crate::types::{CapacitySnapshot, PredictionSeries};
use crate::window::ActiveWindow;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Forecast figures for one slot of the remaining window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SlotDemand {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Gross consumption over the slot
    pub consumption_wh: f64,
    /// Production over the slot, negative forecasts read as zero
    pub production_wh: f64,
    /// Consumption not covered by production, never negative
    pub demand_wh: f64,
}

impl SlotDemand {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// Per-slot demand for the rest of the active window
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DemandEstimate {
    pub slots: Vec<SlotDemand>,
}

impl DemandEstimate {
    /// Net energy the battery has to cover (the energy balance)
    pub fn remaining_consumption_wh(&self) -> f64 {
        self.slots.iter().fold(0.0, |sum, s| sum + s.demand_wh)
    }

    /// Consumption net of production, slots are not clamped at zero
    pub fn total_consumption_wh(&self) -> f64 {
        self.slots
            .iter()
            .fold(0.0, |sum, s| sum + s.consumption_wh - s.production_wh)
    }

    /// The slot containing `instant`
    pub fn slot_at(&self, instant: DateTime<Utc>) -> Option<&SlotDemand> {
        self.slots.iter().find(|s| s.contains(instant))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

pub struct EnergyDemandEstimator;

impl EnergyDemandEstimator {
    /// Break the remaining window down into per-slot demand
    ///
    /// Covers slots of the consumption grid from the one containing `now` up
    /// to the window end. An isolated slot without a consumption value is
    /// skipped; a missing production value counts as no production.
    ///
    /// Returns `None` when either forecast is unavailable, when the
    /// consumption series does not reach over the whole remaining window, or
    /// when it has no values or two consecutive gaps there.
    pub fn estimate(
        production: Option<&PredictionSeries>,
        consumption: Option<&PredictionSeries>,
        window: &ActiveWindow,
        now: DateTime<Utc>,
    ) -> Option<DemandEstimate> {
        let (production, consumption) = (production?, consumption?);
        let first_slot = consumption.slot_start_of(now);
        if consumption.start() > first_slot || consumption.end() < window.end {
            return None;
        }
        let hours = consumption.slot_hours();
        let slot = consumption.slot();

        let mut slots = Vec::new();
        let mut previous_missing = false;
        let remaining = consumption
            .slots()
            .filter(|(start, _)| *start >= first_slot && *start < window.end);
        for (start, consumption_w) in remaining {
            let Some(consumption_w) = consumption_w else {
                if previous_missing {
                    return None;
                }
                previous_missing = true;
                continue;
            };
            previous_missing = false;

            let consumption_wh = f64::from(consumption_w) * hours;
            let production_wh = f64::from(production.value_at(start).unwrap_or(0).max(0)) * hours;
            slots.push(SlotDemand {
                start,
                end: start + slot,
                consumption_wh,
                production_wh,
                demand_wh: (consumption_wh - production_wh).max(0.0),
            });
        }

        if slots.is_empty() {
            return None;
        }
        Some(DemandEstimate { slots })
    }

    /// Net energy still to be drawn from the battery before the window closes
    pub fn remaining_consumption(
        production: Option<&PredictionSeries>,
        consumption: Option<&PredictionSeries>,
        window: &ActiveWindow,
        now: DateTime<Utc>,
    ) -> Option<f64> {
        Self::estimate(production, consumption, window, now).map(|e| e.remaining_consumption_wh())
    }

    /// Predicted SoC at the end of each slot if discharge were never held
    ///
    /// The battery covers each slot's demand until it reaches the reserve.
    /// The first entry is the current SoC at `now`.
    pub fn soc_curve_without_logic(
        estimate: &DemandEstimate,
        capacity: &CapacitySnapshot,
        now: DateTime<Utc>,
    ) -> BTreeMap<DateTime<Utc>, u8> {
        let mut curve = BTreeMap::new();
        curve.insert(now, capacity.soc_percent);

        let mut energy = capacity.available_wh;
        for slot in &estimate.slots {
            if energy > capacity.reserve_wh {
                energy = (energy - slot.demand_wh).max(capacity.reserve_wh);
            }
            let at = slot.end.max(now + TimeDelta::seconds(1));
            curve.insert(at, capacity.soc_for_energy(energy));
        }
        curve
    }
}
