mod session_index;
mod session_log;
mod store;

pub use session_index::*;
pub use session_log::*;
pub use store::*;
