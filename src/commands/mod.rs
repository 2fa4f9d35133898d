pub mod check;
pub mod init;
pub mod ping;
pub mod plan;
pub mod run;

pub use check::*;
pub use init::*;
pub use ping::*;
pub use plan::*;
pub use run::*;
