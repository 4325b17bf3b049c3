#![forbid(unsafe_code)]
//! taskdesk-core library.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums at module seams, each mapping to a
//!   stable [`error::ErrorCode`].
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod config;
pub mod error;
pub mod extract;
pub mod gateway;
pub mod model;
