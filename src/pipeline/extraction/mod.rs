pub mod confidence;
pub mod structured;
pub mod symptoms;
pub mod terminology;

pub use confidence::*;
pub use structured::*;
pub use symptoms::*;
pub use terminology::*;
