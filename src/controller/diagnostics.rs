use super::{CycleInput, CycleOutput};
use crate::config::Mode;
use crate::decision::Decision;
use crate::state_machine::DischargeState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeSet;

/// Values published after every cycle
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    /// Time of the cycle that produced these values
    pub timestamp: DateTime<Utc>,
    pub mode: Mode,
    pub state_machine: DischargeState,
    pub decision: Option<Decision>,
    /// Whether the discharge limit was applied
    pub hold: bool,
    pub window_start: Option<DateTime<Utc>>,
    pub window_end: Option<DateTime<Utc>>,

    pub available_capacity_wh: Option<f64>,
    pub usable_capacity_wh: Option<f64>,
    /// SoC the plan discharges to (min SoC plus risk reserve)
    pub min_soc: Option<u8>,
    /// Consumption net of production over the remaining window
    pub total_consumption_wh: Option<f64>,
    /// Net energy still to be drawn from the battery
    pub remaining_consumption_wh: Option<f64>,
    pub shortfall_wh: Option<f64>,

    pub quarterly_prices_taken: bool,
    pub target_hours_calculated: bool,
    pub target_hours_is_empty: bool,
    /// Local hours of day holding a target slot, `None` when not computed
    pub target_hours: Option<BTreeSet<u32>>,
    pub target_slots: Vec<DateTime<Utc>>,

    pub delayed: bool,
    pub delayed_time_seconds: u64,

    pub quarterly_price: Option<f64>,
    pub predicted_production_w: Option<i32>,
    pub predicted_consumption_w: Option<i32>,
    pub predicted_soc_without_logic: Option<u8>,
}

impl Diagnostics {
    /// Initial values before the first cycle
    pub fn initial(mode: Mode) -> Self {
        Self {
            mode,
            target_hours_is_empty: true,
            ..Self::default()
        }
    }

    /// Values keyed by channel name
    pub fn channels(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("STATE_MACHINE", json!(self.state_machine)),
            ("AVAILABLE_CAPACITY", json!(self.available_capacity_wh)),
            ("USABLE_CAPACITY", json!(self.usable_capacity_wh)),
            ("MIN_SOC", json!(self.min_soc)),
            ("TOTAL_CONSUMPTION", json!(self.total_consumption_wh)),
            ("REMAINING_CONSUMPTION", json!(self.remaining_consumption_wh)),
            ("QUATERLY_PRICES_TAKEN", json!(self.quarterly_prices_taken)),
            ("TARGET_HOURS_CALCULATED", json!(self.target_hours_calculated)),
            ("TARGET_HOURS_IS_EMPTY", json!(self.target_hours_is_empty)),
            ("TARGET_HOURS", json!(self.target_hours)),
            ("DELAYED", json!(self.delayed)),
            ("DELAYED_TIME", json!(self.delayed_time_seconds)),
            ("QUATERLY_PRICES", json!(self.quarterly_price)),
            ("PREDICTED_PRODUCTION", json!(self.predicted_production_w)),
            ("PREDICTED_CONSUMPTION", json!(self.predicted_consumption_w)),
            (
                "PREDICTED_SOC_WITHOUT_LOGIC",
                json!(self.predicted_soc_without_logic),
            ),
        ]
    }

    /// Value of a single channel
    pub fn channel(&self, name: &str) -> Option<Value> {
        self.channels()
            .into_iter()
            .find(|(channel, _)| *channel == name)
            .map(|(_, value)| value)
    }
}

impl<P, T, E> super::DischargeController<P, T, E> {
    pub(super) fn build_diagnostics(
        &self,
        input: &CycleInput,
        output: &CycleOutput,
        state: DischargeState,
        decision: Option<Decision>,
        hold: bool,
        predicted_soc_without_logic: Option<u8>,
    ) -> Diagnostics {
        let now = input.now;
        let target_hours = output.target_hours();
        let target_hours_calculated = output.target_hours_calculated();
        let demand = output.demand.as_ref();
        let capacity = output.capacity.as_ref();

        Diagnostics {
            timestamp: now,
            mode: output.mode,
            state_machine: state,
            decision,
            hold,
            window_start: output.active_window.map(|w| w.start),
            window_end: output.active_window.map(|w| w.end),
            available_capacity_wh: capacity.map(|c| c.available_wh),
            usable_capacity_wh: capacity.map(|c| c.usable_wh),
            min_soc: capacity.map(|c| c.limit_soc_percent),
            total_consumption_wh: demand.map(|d| d.total_consumption_wh()),
            remaining_consumption_wh: demand.map(|d| d.remaining_consumption_wh()),
            shortfall_wh: output
                .verdict
                .as_ref()
                .filter(|_| output.engaged())
                .and_then(|v| v.shortfall_wh),
            quarterly_prices_taken: input.prices_taken,
            target_hours_calculated,
            target_hours_is_empty: target_hours.is_empty(),
            target_hours: target_hours_calculated.then(|| target_hours.hours_of_day(self.timezone)),
            target_slots: target_hours.iter().copied().collect(),
            delayed: hold,
            delayed_time_seconds: self.delayed_time_seconds(),
            quarterly_price: self.prices.as_ref().and_then(|p| p.price_at(now)),
            predicted_production_w: input.production.as_ref().and_then(|s| s.value_at(now)),
            predicted_consumption_w: input.consumption.as_ref().and_then(|s| s.value_at(now)),
            predicted_soc_without_logic,
        }
    }
}
