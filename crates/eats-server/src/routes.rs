//! Read API routes.
//!
//! Public, read-only endpoints over the ingested menu data. Writes happen
//! only in the scraper.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::json;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::{ItemRecord, ItemSummary, MealMenu};

/// Build the application router
pub fn create_router(pool: PgPool) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/items", get(list_items))
        .route("/api/items/:name", get(get_item))
        .route("/api/search/:query", get(search_items))
        .route("/api/menus/:date", get(menus_for_date))
        .with_state(pool)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// GET /api/items/:name - full stored record for one item
async fn get_item(
    State(pool): State<PgPool>,
    Path(name): Path<String>,
) -> Result<Json<ItemRecord>, AppError> {
    let item = sqlx::query_as::<_, ItemRecord>(
        r#"
        SELECT name, description, portion, ingredients, nutrients, filters, image_url, image_source
        FROM items
        WHERE name = $1
        "#,
    )
    .bind(&name)
    .fetch_optional(&pool)
    .await?;

    item.map(Json)
        .ok_or_else(|| AppError::NotFound(format!("item '{}' not found", name)))
}

/// GET /api/items - name -> headline summary for every stored item
async fn list_items(
    State(pool): State<PgPool>,
) -> Result<Json<BTreeMap<String, ItemSummary>>, AppError> {
    let rows: Vec<(String, Option<serde_json::Value>, Option<String>)> =
        sqlx::query_as("SELECT name, nutrients, image_url FROM items")
            .fetch_all(&pool)
            .await?;

    let items = rows
        .into_iter()
        .map(|(name, nutrients, image_url)| {
            (name, ItemSummary::from_stored(nutrients.as_ref(), image_url))
        })
        .collect();

    Ok(Json(items))
}

/// GET /api/search/:query - dates in the next month serving matching items
async fn search_items(
    State(pool): State<PgPool>,
    Path(query): Path<String>,
) -> Result<Json<BTreeMap<String, Vec<String>>>, AppError> {
    validate_search_query(&query)?;

    let rows: Vec<(NaiveDate, String)> = sqlx::query_as(
        r#"
        SELECT m.date, mi.item_name
        FROM menus m
        JOIN menu_items mi ON m.id = mi.menu_id
        WHERE mi.item_name ILIKE $1
          AND m.date BETWEEN CURRENT_DATE AND (CURRENT_DATE + INTERVAL '1 month')
        ORDER BY m.date
        LIMIT 100
        "#,
    )
    .bind(format!("%{}%", query))
    .fetch_all(&pool)
    .await?;

    let mut results: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (date, item_name) in rows {
        let names = results.entry(date.to_string()).or_default();
        // The same item can appear at several locations on one date.
        if !names.contains(&item_name) {
            names.push(item_name);
        }
    }

    Ok(Json(results))
}

/// GET /api/menus/:date - every meal period for one date
async fn menus_for_date(
    State(pool): State<PgPool>,
    Path(date): Path<String>,
) -> Result<Json<BTreeMap<String, MealMenu>>, AppError> {
    let date = parse_menu_date(&date)?;

    let rows: Vec<(String, bool, Option<String>, Option<String>)> = sqlx::query_as(
        r#"
        SELECT m.meal, m.closed, mi.location, mi.item_name
        FROM menus m
        LEFT JOIN menu_items mi ON m.id = mi.menu_id
        WHERE m.date = $1
        "#,
    )
    .bind(date)
    .fetch_all(&pool)
    .await?;

    let mut menus: BTreeMap<String, MealMenu> = BTreeMap::new();
    for (meal, closed, location, item_name) in rows {
        let menu = menus.entry(meal).or_default();
        menu.closed = closed;

        if let Some(item_name) = item_name {
            menu.locations
                .entry(location.unwrap_or_default())
                .or_default()
                .push(item_name);
        }
    }

    Ok(Json(menus))
}

fn validate_search_query(query: &str) -> Result<(), AppError> {
    let len = query.chars().count();
    if !(3..=50).contains(&len) {
        return Err(AppError::BadRequest(
            "search query must be between 3 and 50 characters".to_string(),
        ));
    }
    Ok(())
}

fn parse_menu_date(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date '{}', expected YYYY-MM-DD", raw)))
}
