use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AgentState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    pub identity: String,
    pub state: AgentState,
}

/// Everything a renderer needs, read from a single population.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSnapshot {
    pub agents: Vec<AgentView>,
    pub utensils: Vec<bool>,
    pub deadlocked: bool,
    pub speed: u32,
    pub frozen: bool,
    /// When the shown population was started; `None` before the first start.
    pub started_at: Option<DateTime<Utc>>,
    pub taken_at: DateTime<Utc>,
}

impl TableSnapshot {
    pub fn population(&self) -> usize {
        self.agents.len()
    }

    pub fn held_count(&self) -> usize {
        self.utensils.iter().filter(|held| **held).count()
    }

    pub fn count_in(&self, state: AgentState) -> usize {
        self.agents.iter().filter(|a| a.state == state).count()
    }
}
