use serde::{Deserialize, Serialize};

use super::{AgentState, Seat};

/// Notification published on the observation channels.
///
/// Observers treat every event as "something changed" and re-read whatever
/// state they render; the payload is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationEvent {
    UtensilChanged {
        seat: Seat,
        held: bool,
    },
    AgentChanged {
        seat: Seat,
        identity: String,
        state: AgentState,
    },
    PopulationStarted {
        count: usize,
    },
    DeadlockDetected {
        count: usize,
    },
}

impl SimulationEvent {
    pub fn is_agent_change(&self) -> bool {
        matches!(self, SimulationEvent::AgentChanged { .. })
    }
}
