//! Dining hall menu ingestion.
//!
//! Scrapes the upstream menu API for a range of dates and persists the
//! results into Postgres as normalized menus, items, and menu-item
//! associations. Repeated runs are safe: a (date, meal) period that has
//! already been ingested is skipped, and item rows are never overwritten.
//!
//! # Pipeline
//!
//! [`schedule::ScrapeScheduler`] drives a bounded worker pool over the date
//! range; each worker hands a date to [`fetch::DayFetcher`], which queries
//! every meal period concurrently through [`source::MenuApiClient`] and
//! forwards each parsed payload to [`persist::PgMenuStore`].

pub mod config;
pub mod db;
pub mod fetch;
pub mod persist;
pub mod schedule;
pub mod source;
