pub mod config;
pub mod extract;
pub mod gateway;
pub mod prompts;
pub mod rate_limit;
pub mod runner;
pub mod sampler;
pub mod store;
pub mod validate;

pub use config::*;
pub use extract::{extract, Extracted};
pub use gateway::*;
pub use rate_limit::{RateLimiter, RateWindow};
pub use runner::*;
pub use sampler::*;
pub use store::{ExampleSink, ExampleStore};
pub use validate::{looks_cpp, CodeValidator};
