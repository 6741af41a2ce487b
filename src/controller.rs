//! Time-of-use discharge controller
//!
//! Runs once per cycle: samples forecasts, prices and battery readings from
//! its collaborators, evaluates the cycle, applies the discharge limit to the
//! ESS and publishes diagnostics. Collaborator failures are logged and handled
//! as missing data; `run_cycle` itself never fails.

use crate::collaborators::{ManagedEss, PredictionChannel, PredictorManager, TimeOfUseTariff};
use crate::config::{ControllerConfig, Mode};
use crate::decision::Decision;
use crate::demand::EnergyDemandEstimator;
use crate::error::Result;
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::persistence::PersistentState;
use crate::state_machine::{DischargeState, DischargeStateMachine};
use crate::types::{PredictionSeries, TimeOfUsePrices};
use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use std::collections::BTreeMap;

mod cycle;
mod diagnostics;

pub use cycle::{CycleInput, CycleOutput, evaluate};
pub use diagnostics::Diagnostics;

/// SoC curve simulated for one window instance
#[derive(Debug, Clone)]
struct SocForecast {
    window_start: DateTime<Utc>,
    curve: BTreeMap<DateTime<Utc>, u8>,
}

pub struct DischargeController<P, T, E> {
    config: ControllerConfig,
    timezone: Tz,
    predictor: P,
    tariff: T,
    ess: E,
    state_machine: DischargeStateMachine,

    /// Latest ingested price series
    prices: Option<TimeOfUsePrices>,
    last_price_update: Option<DateTime<Utc>>,

    soc_forecast: Option<SocForecast>,
    delayed_time: TimeDelta,
    /// Time of the previous cycle and whether it held discharge
    last_cycle: Option<(DateTime<Utc>, bool)>,

    diagnostics: Diagnostics,
    total_cycles: u64,
    logger: StructuredLogger,
}

fn controller_logger(config: &ControllerConfig) -> StructuredLogger {
    get_logger_with_context(
        LogContext::new("controller")
            .with_controller_id(&config.id)
            .with_field("ess", config.ess_id.clone()),
    )
}

impl<P, T, E> DischargeController<P, T, E>
where
    P: PredictorManager,
    T: TimeOfUseTariff,
    E: ManagedEss,
{
    /// Create a controller; invalid configuration is rejected here
    pub fn new(config: ControllerConfig, predictor: P, tariff: T, ess: E) -> Result<Self> {
        config.validate()?;
        let timezone = config.timezone()?;
        let logger = controller_logger(&config);
        logger.info(&format!(
            "Activated in mode {:?}, window {:02}:00-{:02}:00 {}",
            config.effective_mode(),
            config.window.start_hour,
            config.window.end_hour,
            timezone
        ));

        Ok(Self {
            diagnostics: Diagnostics::initial(config.effective_mode()),
            config,
            timezone,
            predictor,
            tariff,
            ess,
            state_machine: DischargeStateMachine::new(),
            prices: None,
            last_price_update: None,
            soc_forecast: None,
            delayed_time: TimeDelta::zero(),
            last_cycle: None,
            total_cycles: 0,
            logger,
        })
    }

    /// Swap in a new configuration; the old one stays active on error
    pub fn reconfigure(&mut self, config: ControllerConfig) -> Result<()> {
        config.validate()?;
        let timezone = config.timezone()?;
        if config.window != self.config.window || timezone != self.timezone {
            self.soc_forecast = None;
        }
        self.logger = controller_logger(&config);
        self.logger.info(&format!(
            "Reconfigured: mode {:?}, window {:02}:00-{:02}:00 {}, risk {:?}",
            config.effective_mode(),
            config.window.start_hour,
            config.window.end_hour,
            timezone,
            config.risk_level
        ));
        self.config = config;
        self.timezone = timezone;
        Ok(())
    }

    /// Run one control cycle
    pub fn run_cycle(&mut self, now: DateTime<Utc>) -> Diagnostics {
        let mode = self.config.effective_mode();
        let prices_taken = self.ingest_prices();

        let input = if mode == Mode::Off {
            CycleInput {
                now,
                prices: self.prices.clone(),
                prices_taken,
                ..CycleInput::default()
            }
        } else {
            CycleInput {
                now,
                production: self.fetch_prediction(PredictionChannel::Production, now),
                consumption: self.fetch_prediction(PredictionChannel::Consumption, now),
                prices: self.prices.clone(),
                prices_taken,
                capacity_wh: self.read_ess("capacity", self.ess.capacity_wh()),
                soc_percent: self.read_ess("soc", self.ess.soc()),
            }
        };

        let output = evaluate(&self.config, self.timezone, &input, self.state_machine.state());
        let mut decision = output.decision();
        let mut state = match decision {
            Some(d) if output.engaged() => self.state_machine.apply(d),
            _ => self.state_machine.reset(),
        };

        let mut hold = output.hold;
        if let Err(e) = self.ess.apply_discharge_constraint(hold) {
            self.logger.error(&format!(
                "Failed to apply discharge constraint (hold={}): {}",
                hold, e
            ));
            hold = false;
            if output.engaged() {
                decision = Some(Decision::InsufficientData);
                state = self.state_machine.apply(Decision::InsufficientData);
            }
        }

        if output.transitioned || state != output.state {
            self.logger.info(&format!(
                "State {} (decision {})",
                state,
                decision.map_or("none", Decision::as_str)
            ));
        }

        self.account_delay(now, hold);
        let soc_without_logic = self.update_soc_forecast(&output, now);
        self.total_cycles = self.total_cycles.saturating_add(1);

        self.diagnostics =
            self.build_diagnostics(&input, &output, state, decision, hold, soc_without_logic);
        self.logger.debug(&format!(
            "Cycle {}: state={} hold={} remaining={:?} usable={:?}",
            self.total_cycles,
            state,
            hold,
            self.diagnostics.remaining_consumption_wh,
            self.diagnostics.usable_capacity_wh
        ));
        self.diagnostics.clone()
    }

    /// Take the tariff's prices when they are newer than the ingested ones
    fn ingest_prices(&mut self) -> bool {
        let prices = match self.tariff.get_prices() {
            Ok(prices) => prices,
            Err(e) => {
                self.logger.warn(&format!("Prices unavailable: {}", e));
                return false;
            }
        };
        if prices.is_empty() {
            return false;
        }
        let newer = self.prices.is_none()
            || self
                .last_price_update
                .is_none_or(|last| prices.update_time > last);
        if !newer {
            return false;
        }

        self.logger.info(&format!(
            "Ingested {} prices (updated {})",
            prices.len(),
            prices.update_time
        ));
        self.last_price_update = Some(prices.update_time);
        self.prices = Some(prices);
        true
    }

    fn fetch_prediction(
        &self,
        channel: PredictionChannel,
        now: DateTime<Utc>,
    ) -> Option<PredictionSeries> {
        match self.predictor.get_prediction(channel, now) {
            Ok(series) => series,
            Err(e) => {
                self.logger
                    .warn(&format!("Prediction for {} unavailable: {}", channel, e));
                None
            }
        }
    }

    fn read_ess<V>(&self, what: &str, reading: Result<Option<V>>) -> Option<V> {
        match reading {
            Ok(value) => value,
            Err(e) => {
                self.logger
                    .warn(&format!("Failed to read ESS {}: {}", what, e));
                None
            }
        }
    }

    fn account_delay(&mut self, now: DateTime<Utc>, hold: bool) {
        if let Some((previous, was_held)) = self.last_cycle
            && was_held
            && now > previous
        {
            self.delayed_time += now - previous;
        }
        self.last_cycle = Some((now, hold));
    }

    /// SoC the battery would have now without any deferral
    ///
    /// The curve is simulated once per window instance, on the first cycle
    /// inside it that has forecasts and battery readings.
    fn update_soc_forecast(&mut self, output: &CycleOutput, now: DateTime<Utc>) -> Option<u8> {
        let window = output.active_window?;
        let stale = self
            .soc_forecast
            .as_ref()
            .is_none_or(|f| f.window_start != window.start);
        if stale && let (Some(demand), Some(capacity)) = (&output.demand, &output.capacity) {
            self.soc_forecast = Some(SocForecast {
                window_start: window.start,
                curve: EnergyDemandEstimator::soc_curve_without_logic(demand, capacity, now),
            });
        }

        let forecast = self
            .soc_forecast
            .as_ref()
            .filter(|f| f.window_start == window.start)?;
        forecast
            .curve
            .range(..=now)
            .next_back()
            .map(|(_, soc)| *soc)
    }

    /// Restore counters saved by a previous run
    pub fn restore(&mut self, saved: &PersistentState) {
        self.delayed_time = i64::try_from(saved.delayed_time_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or_else(TimeDelta::zero);
        self.diagnostics.delayed_time_seconds = self.delayed_time_seconds();
        self.logger.info(&format!(
            "Restored state: previously {}, delayed {}s",
            saved.state, saved.delayed_time_seconds
        ));
    }

    /// State worth keeping across restarts
    pub fn persisted_state(&self) -> PersistentState {
        PersistentState {
            state: self.state_machine.state(),
            delayed_time_seconds: self.delayed_time_seconds(),
            last_price_update: self.last_price_update,
            saved_at: None,
        }
    }
}

impl<P, T, E> DischargeController<P, T, E> {
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn state(&self) -> DischargeState {
        self.state_machine.state()
    }

    /// Diagnostics of the last cycle
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn prices(&self) -> Option<&TimeOfUsePrices> {
        self.prices.as_ref()
    }

    pub fn delayed_time_seconds(&self) -> u64 {
        u64::try_from(self.delayed_time.num_seconds()).unwrap_or(0)
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn predictor_mut(&mut self) -> &mut P {
        &mut self.predictor
    }

    pub fn tariff_mut(&mut self) -> &mut T {
        &mut self.tariff
    }

    pub fn ess(&self) -> &E {
        &self.ess
    }

    pub fn ess_mut(&mut self) -> &mut E {
        &mut self.ess
    }
}
