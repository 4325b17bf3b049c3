#![forbid(unsafe_code)]
//! taskdesk-triage library.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums; per-ticket dead ends are
//!   [`engine::Outcome`] values, not errors.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod candidates;
pub mod digest;
pub mod engine;
pub mod policy;
pub mod rank;
pub mod stages;
pub mod workload;
