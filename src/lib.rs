//! # tou-discharge - Time-of-use tariff discharge controller
//!
//! Decides, once per control cycle, whether a home battery may discharge now
//! or should hold its energy for the most expensive slots of a configured
//! daily window. The decision combines production and consumption forecasts,
//! time-of-use prices and the battery's usable capacity.
//!
//! ## Architecture
//!
//! - `indexer`: ranks price slots cheapest to most expensive
//! - `demand`: remaining energy demand inside the window
//! - `decision`: ALLOW / DEFER / INSUFFICIENT_DATA for the current slot
//! - `state_machine`: STANDBY / ALLOWS_DISCHARGE
//! - `controller`: per-cycle orchestration and diagnostics
//! - `collaborators`: predictor, tariff and ESS interfaces plus in-memory versions
//! - `runtime`: tokio interval loop publishing diagnostics snapshots
//! - `config`, `logging`, `persistence`, `scenario`: ambient plumbing

pub mod collaborators;
pub mod config;
pub mod controller;
pub mod decision;
pub mod demand;
pub mod error;
pub mod indexer;
pub mod logging;
pub mod persistence;
pub mod runtime;
pub mod scenario;
pub mod state_machine;
pub mod types;
pub mod window;

// Re-export commonly used types
pub use config::Config;
pub use controller::{Diagnostics, DischargeController};
pub use decision::{Decision, DischargeDecisionEngine};
pub use error::{DischargeError, Result};
pub use state_machine::DischargeState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
