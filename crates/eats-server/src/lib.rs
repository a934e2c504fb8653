//! Read-only HTTP API over the ingested menu data.
//!
//! Serves item lookups, item summaries, item search across upcoming menus,
//! and per-date menus. All writes happen in the scraper; this service only
//! reads.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;

pub use routes::create_router;
