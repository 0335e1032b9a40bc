use std::sync::Arc;

use crate::config::SimulationConfig;
use crate::engine::{LogBuffer, Pacing};

/// Coordinator-owned handles every philosopher and utensil of a table shares.
#[derive(Debug, Clone)]
pub struct TableContext {
    pub pacing: Arc<Pacing>,
    pub log: Arc<LogBuffer>,
    pub event_capacity: usize,
}

impl TableContext {
    pub fn new(pacing: Pacing, event_capacity: usize) -> Self {
        Self {
            pacing: Arc::new(pacing),
            log: Arc::new(LogBuffer::new()),
            event_capacity: event_capacity.max(1),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(Pacing::from_config(config), config.event_capacity)
    }
}
