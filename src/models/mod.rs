pub mod config;
pub mod record;
pub mod target;
pub mod taxonomy;

pub use config::*;
pub use record::*;
pub use target::*;
pub use taxonomy::*;
