//! Shared types, logging, and error handling for the eats backend.
//!
//! This crate provides the pieces used by every workspace member:
//!
//! - **Error handling**: the [`EatsError`] type and [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` environment
//!   variables
//! - **Types**: domain types shared between the scraper and the server

pub mod error;
pub mod logging;
pub mod types;

pub use error::{EatsError, Result};
