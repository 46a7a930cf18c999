pub mod enums;
pub mod record;
pub mod session;

pub use enums::*;
pub use record::*;
pub use session::*;
