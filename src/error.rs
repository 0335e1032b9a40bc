use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// The stop signal fired while an agent was blocked. Not a failure.
    #[error("operation cancelled by stop signal")]
    Cancelled,

    #[error("invalid population size {0}: at least one philosopher is required")]
    InvalidPopulation(usize),

    #[error("no tokio runtime available to launch agents")]
    NoRuntime,

    #[error("invalid state transition from {from:?} with event {event:?}")]
    InvalidTransition {
        from: crate::types::AgentState,
        event: crate::lifecycle::LifecycleEvent,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

impl SimulationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SimulationError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, SimulationError>;
