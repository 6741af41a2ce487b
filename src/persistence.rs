//! Persistence layer for controller state
//!
//! Keeps the discharge state, the accumulated delayed time and the last
//! price update in a JSON file so they survive restarts.

use crate::error::Result;
use crate::logging::get_logger;
use crate::state_machine::DischargeState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Persistent state structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistentState {
    /// State at the time of the last save
    pub state: DischargeState,

    /// Total seconds discharge has been held back
    pub delayed_time_seconds: u64,

    /// Update time of the last ingested price series
    pub last_price_update: Option<DateTime<Utc>>,

    /// When the state was written
    pub saved_at: Option<DateTime<Utc>>,
}

/// Persistence manager
pub struct PersistenceManager {
    file_path: PathBuf,
    state: PersistentState,
    logger: crate::logging::StructuredLogger,
}

impl PersistenceManager {
    /// Create a new persistence manager
    pub fn new<P: AsRef<Path>>(file_path: P) -> Self {
        Self {
            file_path: file_path.as_ref().to_path_buf(),
            state: PersistentState::default(),
            logger: get_logger("persistence"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Load state from disk
    pub fn load(&mut self) -> Result<()> {
        if !self.file_path.exists() {
            self.logger
                .info("No persistent state file found, using defaults");
            return Ok(());
        }

        let contents = std::fs::read_to_string(&self.file_path)?;
        self.state = serde_json::from_str(&contents)?;
        self.logger.info(&format!(
            "Loaded persistent state from {}",
            self.file_path.display()
        ));

        Ok(())
    }

    /// Save state to disk
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.file_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(&self.file_path, contents)?;
        self.logger.debug("Saved persistent state to disk");

        Ok(())
    }

    pub fn state(&self) -> &PersistentState {
        &self.state
    }

    /// Replace the whole state, stamping the save time
    pub fn replace(&mut self, mut state: PersistentState, now: DateTime<Utc>) {
        state.saved_at = Some(now);
        self.state = state;
    }
}
