pub mod context;
pub mod coordination;
pub mod detection;
pub mod log_buffer;
pub mod pacing;
pub mod stop;

pub use context::TableContext;
pub use coordination::{Coordinator, Population};
pub use detection::DeadlockDetector;
pub use log_buffer::LogBuffer;
pub use pacing::Pacing;
pub use stop::StopSignal;
