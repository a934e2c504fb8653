//! Row and response types for the read API.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::FromRow;

/// A stored food item, as returned by the single-item endpoint
#[derive(Debug, Serialize, FromRow)]
pub struct ItemRecord {
    pub name: String,
    pub description: Option<String>,
    pub portion: Option<String>,
    pub ingredients: Option<String>,
    pub nutrients: Option<serde_json::Value>,
    pub filters: Option<serde_json::Value>,
    pub image_url: Option<String>,
    pub image_source: Option<String>,
}

/// Compact per-item summary for the listing endpoint
#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub calories: Option<String>,
    pub protein: Option<String>,
    pub image_url: Option<String>,
}

impl ItemSummary {
    /// Pull the headline nutrients out of the stored nutrients map
    pub fn from_stored(nutrients: Option<&serde_json::Value>, image_url: Option<String>) -> Self {
        let lookup = |key: &str| {
            nutrients
                .and_then(|v| v.get(key))
                .and_then(|v| v.as_str())
                .map(|s| s.to_string())
        };

        Self {
            calories: lookup("Calories"),
            protein: lookup("Protein"),
            image_url,
        }
    }
}

/// One meal period in the per-date menu response
#[derive(Debug, Default, Serialize)]
pub struct MealMenu {
    pub closed: bool,
    /// Serving location -> item names, in appearance order
    pub locations: BTreeMap<String, Vec<String>>,
}
