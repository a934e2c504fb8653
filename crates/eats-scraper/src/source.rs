//! Upstream menu API client.
//!
//! One request fetches the menu for a single (date, meal) period. The
//! client is stateless beyond its connection pool; failures are reported to
//! the caller and never retried here.

use std::time::Duration;

use chrono::NaiveDate;
use eats_common::types::MealType;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::ApiConfig;

/// Errors from a single menu fetch
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("menu request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("menu API returned HTTP {status} for {url}")]
    Status { status: StatusCode, url: String },
}

/// Top-level payload for one (date, meal) period
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuResponse {
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub menu: MenuDocument,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MenuDocument {
    #[serde(default)]
    pub periods: PeriodMenu,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodMenu {
    #[serde(default)]
    pub categories: Vec<Category>,
}

/// A serving station and the items offered there
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<RawMenuItem>,
}

/// A food item as published by the upstream source. Text fields may be
/// null upstream, hence the Options.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMenuItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(default)]
    pub portion: Option<String>,
    #[serde(default)]
    pub ingredients: Option<String>,
    #[serde(default)]
    pub calories: Option<String>,
    #[serde(default)]
    pub nutrients: Vec<RawNutrient>,
    #[serde(default)]
    pub filters: Vec<RawFilter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNutrient {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value_numeric: String,
    #[serde(default)]
    pub uom: String,
}

/// A dietary or attribute tag attached to an item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawFilter {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// HTTP client for the upstream menu API
pub struct MenuApiClient {
    client: Client,
    config: ApiConfig,
}

impl MenuApiClient {
    /// Create a new client with the configured timeout and identifying
    /// header
    pub fn new(config: ApiConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    /// Fetch and decode the menu for one (date, meal) period
    pub async fn fetch(
        &self,
        date: NaiveDate,
        meal: MealType,
    ) -> Result<MenuResponse, SourceError> {
        let url = self.config.menu_url(date, meal);
        debug!(%date, %meal, url = %url, "fetching menu");

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status { status, url });
        }

        Ok(response.json::<MenuResponse>().await?)
    }
}
