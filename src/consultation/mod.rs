pub mod orchestrator;
pub mod phases;
pub mod responses;
pub mod types;

pub use orchestrator::*;
pub use types::*;
