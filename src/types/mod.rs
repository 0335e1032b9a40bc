pub mod event;
pub mod snapshot;

pub use event::SimulationEvent;
pub use snapshot::{AgentView, TableSnapshot};

use serde::{Deserialize, Serialize};

/// Position of a philosopher (and of its right utensil) around the table.
pub type Seat = usize;

pub type Generation = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentState {
    Thinking,
    Hungry,
    GotRightUtensil,
    GotLeftUtensil, // Named but never entered by the cycle
    Eating,
}

impl AgentState {
    /// Readable form used in log lines: lowercase words separated by spaces.
    pub fn display_name(&self) -> &'static str {
        match self {
            AgentState::Thinking => "thinking",
            AgentState::Hungry => "hungry",
            AgentState::GotRightUtensil => "got right utensil",
            AgentState::GotLeftUtensil => "got left utensil",
            AgentState::Eating => "eating",
        }
    }
}

impl std::fmt::Display for AgentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
