//! pigen - Gemini-driven generator of embedded C examples for Raspberry Pi
//!
//! pigen builds a dataset of small, self-contained C programs for Raspberry Pi
//! boards (Linux models and the Pico). Each work item is turned into a prompt in
//! two synthesis stages, sent to the Gemini API, and the reply is extracted,
//! validated and retried with corrective feedback until it is accepted or the
//! attempt budget runs out.
//!
//! # Architecture
//!
//! - **commands**: CLI command implementations (init, run, plan, check, ping)
//! - **core**: Pipeline (rate limiter, gateway, prompts, extractor, validator, store, runner)
//! - **models**: Data structures (config, target mode, taxonomy, records)
//! - **error**: Error types

pub mod commands;
pub mod core;
pub mod error;
pub mod models;

pub use error::{PigenError, Result};
