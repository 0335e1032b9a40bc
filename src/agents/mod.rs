pub mod agent;
pub mod names;

pub use agent::Agent;
pub use names::NameSource;
