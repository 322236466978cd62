//! Activation gate - the operator's on/off switch.
//!
//! ## States
//!
//! ```text
//! Inactive --activate--> Active --deactivate--> Inactive
//! ```
//!
//! The gate only records the switch. Checking that the tap source is
//! actually available (accessibility permission and the like) is the
//! caller's job before it asks to activate. The side effects of
//! deactivation (force-stopping the alert, resetting counters) are applied
//! by the engine in the same critical section as the state change.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    #[default]
    Inactive,
    Active,
}

/// What a call to [`ActivationGate::set`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateTransition {
    Activated,
    Deactivated,
    Unchanged,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationGate {
    state: GateState,
}

impl ActivationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == GateState::Active
    }

    pub fn set(&mut self, active: bool) -> GateTransition {
        match (self.state, active) {
            (GateState::Inactive, true) => {
                self.state = GateState::Active;
                GateTransition::Activated
            }
            (GateState::Active, false) => {
                self.state = GateState::Inactive;
                GateTransition::Deactivated
            }
            _ => GateTransition::Unchanged,
        }
    }
}
