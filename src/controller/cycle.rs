//! Pure per-cycle evaluation
//!
//! `evaluate` turns one cycle's inputs into a decision, a state and the hold
//! flag for the actuator. It performs no I/O; the controller gathers the
//! inputs and applies the result.

use crate::config::{ControllerConfig, MissingDataPolicy, Mode};
use crate::decision::{Decision, DecisionInput, DischargeDecisionEngine, TargetHours, Verdict};
use crate::demand::{DemandEstimate, EnergyDemandEstimator};
use crate::state_machine::DischargeState;
use crate::types::{CapacitySnapshot, PredictionSeries, TimeOfUsePrices};
use crate::window::ActiveWindow;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Everything sampled from collaborators for one cycle
#[derive(Debug, Clone, Default)]
pub struct CycleInput {
    pub now: DateTime<Utc>,
    pub production: Option<PredictionSeries>,
    pub consumption: Option<PredictionSeries>,
    /// Latest ingested price series
    pub prices: Option<TimeOfUsePrices>,
    /// Whether `prices` was ingested during this cycle
    pub prices_taken: bool,
    pub capacity_wh: Option<u32>,
    pub soc_percent: Option<u8>,
}

/// Result of evaluating one cycle
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub mode: Mode,
    pub active_window: Option<ActiveWindow>,
    /// Engine verdict; `None` when the controller is off
    pub verdict: Option<Verdict>,
    pub state: DischargeState,
    /// Whether the discharge limit should be applied to the ESS
    pub hold: bool,
    pub transitioned: bool,
    pub capacity: Option<CapacitySnapshot>,
    pub demand: Option<DemandEstimate>,
}

impl CycleOutput {
    pub fn decision(&self) -> Option<Decision> {
        self.verdict.as_ref().map(|v| v.decision)
    }

    /// Whether the controller acts on its decision this cycle
    pub fn engaged(&self) -> bool {
        self.mode != Mode::Off && self.active_window.is_some()
    }

    pub fn target_hours(&self) -> TargetHours {
        match &self.verdict {
            Some(verdict) if self.engaged() => verdict.target_hours.clone(),
            _ => TargetHours::new(),
        }
    }

    pub fn target_hours_calculated(&self) -> bool {
        self.engaged()
            && self
                .verdict
                .as_ref()
                .is_some_and(|v| v.target_hours_calculated)
    }
}

/// Whether a STANDBY state is enforced on the ESS
fn hold_for(state: DischargeState, decision: Decision, policy: MissingDataPolicy) -> bool {
    state == DischargeState::Standby
        && (decision != Decision::InsufficientData || policy == MissingDataPolicy::Hold)
}

/// Evaluate one cycle
///
/// Outside the window, and whenever the controller is off, the result is a
/// pass-through: STANDBY without a hold and without target hours.
pub fn evaluate(
    config: &ControllerConfig,
    timezone: Tz,
    input: &CycleInput,
    previous: DischargeState,
) -> CycleOutput {
    let mode = config.effective_mode();
    let capacity = match (input.capacity_wh, input.soc_percent) {
        (Some(capacity_wh), Some(soc)) => Some(CapacitySnapshot::new(
            capacity_wh,
            soc,
            config.risk_level,
            config.min_soc_percent,
        )),
        _ => None,
    };

    let engine = DischargeDecisionEngine::new(config.window, timezone);
    let active_window = engine.active_window(input.now);
    let demand = active_window.as_ref().and_then(|window| {
        EnergyDemandEstimator::estimate(
            input.production.as_ref(),
            input.consumption.as_ref(),
            window,
            input.now,
        )
    });

    let verdict = match mode {
        Mode::Off => None,
        Mode::Automatic => Some(engine.decide(&DecisionInput {
            now: input.now,
            demand: demand.as_ref(),
            usable_capacity_wh: capacity.map(|c| c.usable_wh),
            prices: input.prices.as_ref(),
        })),
        Mode::Manual => Some(engine.decide_manual(input.now)),
    };

    let (state, hold) = match &verdict {
        Some(verdict) if active_window.is_some() => {
            let state = DischargeState::from_decision(verdict.decision);
            (
                state,
                hold_for(state, verdict.decision, config.missing_data_policy),
            )
        }
        _ => (DischargeState::Standby, false),
    };

    CycleOutput {
        mode,
        active_window,
        verdict,
        state,
        hold,
        transitioned: state != previous,
        capacity,
        demand,
    }
}
