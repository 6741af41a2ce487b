//! Periodic driver for a discharge controller
//!
//! Ticks the controller on a fixed interval, publishes each cycle's
//! diagnostics on a watch channel and saves state periodically and on
//! shutdown.

use crate::collaborators::{ManagedEss, PredictorManager, TimeOfUseTariff};
use crate::config::RuntimeConfig;
use crate::controller::{DischargeController, Diagnostics};
use crate::error::{DischargeError, Result};
use crate::logging::{StructuredLogger, get_logger};
use crate::persistence::PersistenceManager;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::{Duration, MissedTickBehavior, interval};

pub struct ControllerRuntime<P, T, E> {
    controller: DischargeController<P, T, E>,
    cycle_interval: Duration,
    persist_every_cycles: u64,
    persistence: Option<PersistenceManager>,
    snapshot_tx: watch::Sender<Arc<Diagnostics>>,
    snapshot_rx: watch::Receiver<Arc<Diagnostics>>,
    shutdown_tx: mpsc::UnboundedSender<()>,
    shutdown_rx: mpsc::UnboundedReceiver<()>,
    overrun_count: u64,
    logger: StructuredLogger,
}

impl<P, T, E> ControllerRuntime<P, T, E>
where
    P: PredictorManager,
    T: TimeOfUseTariff,
    E: ManagedEss,
{
    /// Wrap a controller; saved state is loaded and restored when a persistence manager is given
    pub fn new(
        mut controller: DischargeController<P, T, E>,
        config: &RuntimeConfig,
        persistence: Option<PersistenceManager>,
    ) -> Result<Self> {
        if config.cycle_interval_ms == 0 {
            return Err(DischargeError::validation(
                "runtime.cycle_interval_ms",
                "Must be greater than 0",
            ));
        }
        let logger = get_logger("runtime");

        let persistence = persistence.map(|mut manager| {
            match manager.load() {
                Ok(()) => controller.restore(manager.state()),
                Err(e) => logger.warn(&format!(
                    "Ignoring unreadable state file {}: {}",
                    manager.path().display(),
                    e
                )),
            }
            manager
        });

        let (snapshot_tx, snapshot_rx) =
            watch::channel(Arc::new(controller.diagnostics().clone()));
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();

        Ok(Self {
            controller,
            cycle_interval: Duration::from_millis(config.cycle_interval_ms),
            persist_every_cycles: config.persist_every_cycles,
            persistence,
            snapshot_tx,
            snapshot_rx,
            shutdown_tx,
            shutdown_rx,
            overrun_count: 0,
            logger,
        })
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<Arc<Diagnostics>> {
        self.snapshot_rx.clone()
    }

    /// Sender that stops `run` when signalled
    pub fn shutdown_handle(&self) -> mpsc::UnboundedSender<()> {
        self.shutdown_tx.clone()
    }

    pub fn controller(&self) -> &DischargeController<P, T, E> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut DischargeController<P, T, E> {
        &mut self.controller
    }

    pub fn overrun_count(&self) -> u64 {
        self.overrun_count
    }

    /// Run a single cycle and publish its diagnostics
    pub fn run_once(&mut self, now: DateTime<Utc>) -> Arc<Diagnostics> {
        let started = std::time::Instant::now();
        let snapshot = Arc::new(self.controller.run_cycle(now));
        self.snapshot_tx.send_replace(snapshot.clone());

        if started.elapsed() > self.cycle_interval {
            self.overrun_count = self.overrun_count.saturating_add(1);
            self.logger.warn(&format!(
                "Cycle took {} ms, longer than the {} ms interval",
                started.elapsed().as_millis(),
                self.cycle_interval.as_millis()
            ));
        }

        if self.persist_every_cycles > 0
            && self.controller.total_cycles() % self.persist_every_cycles == 0
            && let Err(e) = self.persist(now)
        {
            self.logger.warn(&format!("Failed to persist state: {}", e));
        }
        snapshot
    }

    /// Save controller state if persistence is configured
    pub fn persist(&mut self, now: DateTime<Utc>) -> Result<()> {
        let Some(manager) = self.persistence.as_mut() else {
            return Ok(());
        };
        manager.replace(self.controller.persisted_state(), now);
        manager.save()
    }

    /// Tick until shutdown is requested or Ctrl-C is received
    pub async fn run(&mut self) -> Result<()> {
        self.logger.info(&format!(
            "Starting control loop ({} ms interval)",
            self.cycle_interval.as_millis()
        ));

        let mut ticker = interval(self.cycle_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once(Utc::now());
                }
                _ = self.shutdown_rx.recv() => {
                    self.logger.info("Shutdown requested");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    self.logger.info("Interrupt received, shutting down");
                    break;
                }
            }
        }

        self.persist(Utc::now())?;
        self.logger.info(&format!(
            "Control loop stopped after {} cycles ({} overruns)",
            self.controller.total_cycles(),
            self.overrun_count
        ));
        Ok(())
    }
}
