//! Two-state discharge state machine
//!
//! The state follows the latest decision without hysteresis: ALLOW moves to
//! ALLOWS_DISCHARGE, everything else to STANDBY. STANDBY is the initial state
//! and the state whenever the controller is off or outside its window.

use crate::decision::Decision;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DischargeState {
    #[default]
    Standby,
    AllowsDischarge,
}

impl DischargeState {
    /// State selected by a decision
    pub fn from_decision(decision: Decision) -> Self {
        match decision {
            Decision::Allow => DischargeState::AllowsDischarge,
            Decision::Defer | Decision::InsufficientData => DischargeState::Standby,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DischargeState::Standby => "STANDBY",
            DischargeState::AllowsDischarge => "ALLOWS_DISCHARGE",
        }
    }

    /// Numeric channel value
    pub fn code(self) -> i32 {
        match self {
            DischargeState::Standby => 0,
            DischargeState::AllowsDischarge => 1,
        }
    }
}

impl std::fmt::Display for DischargeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DischargeStateMachine {
    state: DischargeState,
    last_decision: Option<Decision>,
    transitions: u64,
}

impl DischargeStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DischargeState {
        self.state
    }

    pub fn last_decision(&self) -> Option<Decision> {
        self.last_decision
    }

    /// Number of state changes since construction
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Feed a decision and return the resulting state
    pub fn apply(&mut self, decision: Decision) -> DischargeState {
        self.last_decision = Some(decision);
        self.set(DischargeState::from_decision(decision))
    }

    /// Force STANDBY (mode off, outside the window)
    pub fn reset(&mut self) -> DischargeState {
        self.last_decision = None;
        self.set(DischargeState::Standby)
    }

    fn set(&mut self, next: DischargeState) -> DischargeState {
        if next != self.state {
            self.transitions += 1;
            self.state = next;
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_standby() {
        let machine = DischargeStateMachine::new();
        assert_eq!(machine.state(), DischargeState::Standby);
        assert!(machine.last_decision().is_none());
    }

    #[test]
    fn follows_decisions() {
        let mut machine = DischargeStateMachine::new();
        assert_eq!(machine.apply(Decision::Allow), DischargeState::AllowsDischarge);
        assert_eq!(machine.apply(Decision::Allow), DischargeState::AllowsDischarge);
        assert_eq!(machine.apply(Decision::Defer), DischargeState::Standby);
        assert_eq!(machine.apply(Decision::Allow), DischargeState::AllowsDischarge);
        assert_eq!(
            machine.apply(Decision::InsufficientData),
            DischargeState::Standby
        );
        assert_eq!(machine.transitions(), 4);
        assert_eq!(machine.last_decision(), Some(Decision::InsufficientData));
    }

    #[test]
    fn reset_forces_standby() {
        let mut machine = DischargeStateMachine::new();
        machine.apply(Decision::Allow);
        assert_eq!(machine.reset(), DischargeState::Standby);
        assert!(machine.last_decision().is_none());
    }

    #[test]
    fn serializes_as_channel_names() {
        let json = serde_json::to_string(&DischargeState::AllowsDischarge).unwrap();
        assert_eq!(json, "\"ALLOWS_DISCHARGE\"");
        assert_eq!(DischargeState::Standby.to_string(), "STANDBY");
        assert_eq!(DischargeState::AllowsDischarge.code(), 1);
    }
}
