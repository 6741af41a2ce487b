//! Per-cycle discharge decision
//!
//! Inside the window the battery may only be emptied as far as the expected
//! demand until the window end allows. When stored energy falls short of
//! that demand, the cheapest slots are picked to receive the stored energy
//! and discharge is deferred in all of them.

use crate::demand::DemandEstimate;
use crate::indexer::PriceWindowIndexer;
use crate::types::{PricePoint, TimeOfUsePrices};
use crate::window::{ActiveWindow, SchedulingWindow};
use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Outcome of one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// Discharge may proceed
    Allow,
    /// Hold discharge in this slot
    Defer,
    /// Forecasts, capacity or prices are missing
    InsufficientData,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "ALLOW",
            Decision::Defer => "DEFER",
            Decision::InsufficientData => "INSUFFICIENT_DATA",
        }
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot start instants in which discharge is held back
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TargetHours(BTreeSet<DateTime<Utc>>);

impl TargetHours {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, slot: DateTime<Utc>) -> bool {
        self.0.insert(slot)
    }

    pub fn contains(&self, slot: &DateTime<Utc>) -> bool {
        self.0.contains(slot)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.0.iter()
    }

    /// Local hours of day touched by a target slot
    pub fn hours_of_day(&self, tz: Tz) -> BTreeSet<u32> {
        self.0
            .iter()
            .map(|slot| slot.with_timezone(&tz).hour())
            .collect()
    }
}

impl FromIterator<DateTime<Utc>> for TargetHours {
    fn from_iter<I: IntoIterator<Item = DateTime<Utc>>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Decision plus the plan it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub decision: Decision,
    pub target_hours: TargetHours,
    /// Whether target hours were computed for this decision
    pub target_hours_calculated: bool,
    /// Demand not covered by usable capacity, when known
    pub shortfall_wh: Option<f64>,
}

impl Verdict {
    fn plain(decision: Decision) -> Self {
        Self {
            decision,
            target_hours: TargetHours::new(),
            target_hours_calculated: false,
            shortfall_wh: None,
        }
    }

    pub fn allow() -> Self {
        Self::plain(Decision::Allow)
    }

    pub fn insufficient_data() -> Self {
        Self::plain(Decision::InsufficientData)
    }
}

/// Everything `decide` looks at
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    pub now: DateTime<Utc>,
    /// Per-slot demand for the remaining window
    pub demand: Option<&'a DemandEstimate>,
    /// Stored energy available to the plan
    pub usable_capacity_wh: Option<f64>,
    pub prices: Option<&'a TimeOfUsePrices>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DischargeDecisionEngine {
    window: SchedulingWindow,
    timezone: Tz,
}

impl DischargeDecisionEngine {
    pub fn new(window: SchedulingWindow, timezone: Tz) -> Self {
        Self { window, timezone }
    }

    pub fn window(&self) -> SchedulingWindow {
        self.window
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn active_window(&self, now: DateTime<Utc>) -> Option<ActiveWindow> {
        self.window.resolve(now, self.timezone)
    }

    /// Decide whether discharge is allowed in the slot containing `input.now`
    ///
    /// Pure: equal inputs give equal verdicts.
    pub fn decide(&self, input: &DecisionInput<'_>) -> Verdict {
        let Some(active) = self.active_window(input.now) else {
            return Verdict::allow();
        };

        let (Some(demand), Some(usable_wh), Some(prices)) =
            (input.demand, input.usable_capacity_wh, input.prices)
        else {
            return Verdict::insufficient_data();
        };

        let balance_wh = demand.remaining_consumption_wh();
        if usable_wh >= balance_wh {
            return Verdict {
                shortfall_wh: Some(0.0),
                ..Verdict::allow()
            };
        }

        let shortfall_wh = balance_wh - usable_wh;
        let Some(target_hours) = Self::target_hours(demand, prices, &active, shortfall_wh) else {
            return Verdict {
                shortfall_wh: Some(shortfall_wh),
                ..Verdict::insufficient_data()
            };
        };

        let deferred = demand
            .slot_at(input.now)
            .is_some_and(|slot| target_hours.contains(&slot.start));
        Verdict {
            decision: if deferred {
                Decision::Defer
            } else {
                Decision::Allow
            },
            target_hours,
            target_hours_calculated: true,
            shortfall_wh: Some(shortfall_wh),
        }
    }

    /// Pick the cheapest remaining slots until their demand covers the shortfall
    ///
    /// Returns `None` when no remaining slot of the window carries a price.
    pub fn target_hours(
        demand: &DemandEstimate,
        prices: &TimeOfUsePrices,
        active: &ActiveWindow,
        shortfall_wh: f64,
    ) -> Option<TargetHours> {
        let candidates: Vec<(PricePoint, f64)> = demand
            .slots
            .iter()
            .filter(|slot| slot.start < active.end)
            .filter_map(|slot| {
                prices
                    .price_at(slot.start)
                    .map(|price| (PricePoint::new(slot.start, price), slot.demand_wh))
            })
            .collect();

        let points: Vec<PricePoint> = candidates.iter().map(|(point, _)| *point).collect();
        let ranking = PriceWindowIndexer::rank(&points);
        if ranking.is_empty() {
            return None;
        }

        let mut targets = TargetHours::new();
        let mut remaining = shortfall_wh;
        for &index in ranking.order() {
            if remaining <= 0.0 {
                break;
            }
            let (point, demand_wh) = candidates[index];
            targets.insert(point.timestamp);
            remaining -= demand_wh;
        }
        Some(targets)
    }

    /// Operator-forced deferral: every remaining slot of the window is a target
    pub fn decide_manual(&self, now: DateTime<Utc>) -> Verdict {
        let Some(active) = self.active_window(now) else {
            return Verdict::allow();
        };
        Verdict {
            decision: Decision::Defer,
            target_hours: active.remaining_slots(now).into_iter().collect(),
            target_hours_calculated: true,
            shortfall_wh: None,
        }
    }
}
