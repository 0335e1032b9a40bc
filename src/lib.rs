pub mod agents;
pub mod config;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod resources;
pub mod types;

pub use config::SimulationConfig;
pub use engine::Coordinator;
pub use error::{Result, SimulationError};
pub use types::*;
