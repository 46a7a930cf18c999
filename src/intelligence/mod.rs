pub mod conflict;
pub mod emergency;
pub mod emotion;
pub mod intent;
pub mod phrases;

pub use conflict::*;
pub use emergency::*;
pub use emotion::*;
pub use intent::*;
