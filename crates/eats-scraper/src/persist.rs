//! Transactional persistence of scraped menu payloads.
//!
//! [`PgMenuStore::save`] is the unit of work: it normalizes one raw payload
//! into menu, item, and menu-item rows and commits them atomically. A
//! (date, meal) period that already has a menu row is a no-op, which is
//! what makes repeated or overlapping scraper runs safe. Item rows are
//! keyed by name and never overwritten once present.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use eats_common::types::MealType;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};

use crate::source::{MenuResponse, RawFilter, RawNutrient};

/// Errors from one save attempt, tagged with the failing step
#[derive(Error, Debug)]
pub enum PersistError {
    #[error("checking for existing menu {date} {meal}: {source}")]
    DedupCheck {
        date: NaiveDate,
        meal: MealType,
        #[source]
        source: sqlx::Error,
    },

    #[error("beginning transaction for {date} {meal}: {source}")]
    Begin {
        date: NaiveDate,
        meal: MealType,
        #[source]
        source: sqlx::Error,
    },

    #[error("inserting menu row for {date} {meal}: {source}")]
    MenuInsert {
        date: NaiveDate,
        meal: MealType,
        #[source]
        source: sqlx::Error,
    },

    #[error("serializing nutrients or labels for item {item}: {source}")]
    Marshal {
        item: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("inserting item {item} for {date} {meal}: {source}")]
    ItemInsert {
        item: String,
        date: NaiveDate,
        meal: MealType,
        #[source]
        source: sqlx::Error,
    },

    #[error("linking item {item} to menu {menu_id}: {source}")]
    MenuItemInsert {
        item: String,
        menu_id: i32,
        #[source]
        source: sqlx::Error,
    },

    #[error("committing menu {date} {meal}: {source}")]
    Commit {
        date: NaiveDate,
        meal: MealType,
        #[source]
        source: sqlx::Error,
    },
}

/// What one save attempt did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Menu row plus its item associations were written
    Saved { items: usize },
    /// Dining hall was closed; a bare closed menu row was written
    SavedClosed,
    /// A menu for this (date, meal) already exists; nothing was written
    AlreadyIngested,
}

/// Persistence seam between the fetcher and storage
#[async_trait]
pub trait MenuSink: Send + Sync {
    async fn save(
        &self,
        payload: &MenuResponse,
        date: NaiveDate,
        meal: MealType,
    ) -> Result<SaveOutcome, PersistError>;
}

/// Postgres-backed menu store
pub struct PgMenuStore {
    pool: PgPool,
}

impl PgMenuStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a closed-day menu row with no items
    async fn save_closed(&self, date: NaiveDate, meal: MealType) -> Result<SaveOutcome, PersistError> {
        let result = sqlx::query("INSERT INTO menus (date, meal, closed) VALUES ($1, $2, TRUE)")
            .bind(date)
            .bind(meal.as_str())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                info!(%date, %meal, "saved closed-day menu");
                Ok(SaveOutcome::SavedClosed)
            }
            Err(e) if is_unique_violation(&e) => Ok(SaveOutcome::AlreadyIngested),
            Err(e) => Err(PersistError::MenuInsert { date, meal, source: e }),
        }
    }
}

#[async_trait]
impl MenuSink for PgMenuStore {
    async fn save(
        &self,
        payload: &MenuResponse,
        date: NaiveDate,
        meal: MealType,
    ) -> Result<SaveOutcome, PersistError> {
        // Dedup check: a (date, meal) that was already ingested is a no-op.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM menus WHERE date = $1 AND meal = $2)")
                .bind(date)
                .bind(meal.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| PersistError::DedupCheck { date, meal, source: e })?;

        if exists {
            debug!(%date, %meal, "menu already ingested");
            return Ok(SaveOutcome::AlreadyIngested);
        }

        if payload.closed {
            return self.save_closed(date, meal).await;
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PersistError::Begin { date, meal, source: e })?;

        // Two concurrent saves for the same key can both pass the dedup
        // check; the UNIQUE (date, meal) constraint settles it and the
        // loser backs off silently.
        let menu_id: i32 = match sqlx::query_scalar(
            "INSERT INTO menus (date, meal, closed) VALUES ($1, $2, FALSE) RETURNING id",
        )
        .bind(date)
        .bind(meal.as_str())
        .fetch_one(&mut *tx)
        .await
        {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => {
                let _ = tx.rollback().await;
                debug!(%date, %meal, "lost concurrent ingestion race");
                return Ok(SaveOutcome::AlreadyIngested);
            }
            Err(e) => return Err(PersistError::MenuInsert { date, meal, source: e }),
        };

        let mut item_count = 0usize;

        for category in &payload.menu.periods.categories {
            if category.items.is_empty() {
                continue;
            }

            let location = category.name.trim();

            for item in &category.items {
                let name = item.name.trim();

                let nutrients = serde_json::to_value(nutrient_map(&item.nutrients))
                    .map_err(|e| PersistError::Marshal { item: name.to_string(), source: e })?;
                let filters = serde_json::to_value(label_names(&item.filters))
                    .map_err(|e| PersistError::Marshal { item: name.to_string(), source: e })?;

                // First-seen wins: an item already on file keeps its
                // original description, portion, and nutrients.
                sqlx::query(
                    r#"
                    INSERT INTO items (name, description, portion, ingredients, nutrients, filters, image_url, image_source)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    ON CONFLICT (name) DO NOTHING
                    "#,
                )
                .bind(name)
                .bind(trimmed(&item.desc))
                .bind(trimmed(&item.portion))
                .bind(trimmed(&item.ingredients))
                .bind(&nutrients)
                .bind(&filters)
                .bind(Option::<String>::None)
                .bind(Option::<String>::None)
                .execute(&mut *tx)
                .await
                .map_err(|e| PersistError::ItemInsert {
                    item: name.to_string(),
                    date,
                    meal,
                    source: e,
                })?;

                sqlx::query("INSERT INTO menu_items (menu_id, item_name, location) VALUES ($1, $2, $3)")
                    .bind(menu_id)
                    .bind(name)
                    .bind(location)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| PersistError::MenuItemInsert {
                        item: name.to_string(),
                        menu_id,
                        source: e,
                    })?;

                item_count += 1;
            }
        }

        match tx.commit().await {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                debug!(%date, %meal, "lost concurrent ingestion race at commit");
                return Ok(SaveOutcome::AlreadyIngested);
            }
            Err(e) => return Err(PersistError::Commit { date, meal, source: e }),
        }

        info!(%date, %meal, items = item_count, "saved menu");
        Ok(SaveOutcome::Saved { items: item_count })
    }
}

/// True for the duplicate-key conflict raised when a concurrent save won
/// the race for the same (date, meal)
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
        }
        _ => false,
    }
}

fn trimmed(value: &Option<String>) -> Option<String> {
    value.as_deref().map(|s| s.trim().to_string())
}

/// Build the stored nutrient map for one item.
///
/// Values of "0" or "-" denote "not present" upstream and are dropped.
/// Nutrient names lose any trailing parenthetical qualifier, and the stored
/// value is the numeric value concatenated with its unit. A nutrient name
/// repeated within one item keeps the last value seen.
pub fn nutrient_map(nutrients: &[RawNutrient]) -> HashMap<String, String> {
    let mut map = HashMap::new();

    for nutrient in nutrients {
        let value = nutrient.value_numeric.trim();
        if value == "0" || value == "-" {
            continue;
        }

        let name = nutrient
            .name
            .split(" (")
            .next()
            .unwrap_or(&nutrient.name)
            .trim();

        map.insert(name.to_string(), format!("{}{}", value, nutrient.uom.trim()));
    }

    map
}

/// Collect the dietary label names for one item, discarding every other
/// filter type
pub fn label_names(filters: &[RawFilter]) -> Vec<String> {
    filters
        .iter()
        .filter(|f| f.kind.trim() == "label")
        .map(|f| f.name.trim().to_string())
        .collect()
}
