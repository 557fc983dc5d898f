mod analytics;
mod detail;
mod event;
mod index;
mod run;
pub mod timestamp;
mod types;

pub use analytics::*;
pub use detail::*;
pub use event::*;
pub use index::*;
pub use run::*;
pub use types::*;
