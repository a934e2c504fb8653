//! Per-date fan-out across meal periods.

use std::sync::Arc;

use chrono::NaiveDate;
use eats_common::types::MealType;
use tracing::{debug, error, info, warn};

use crate::persist::{MenuSink, SaveOutcome};
use crate::source::MenuApiClient;

/// Fetches every meal period for one date concurrently and forwards each
/// parsed payload to the sink.
///
/// Meal periods are independent upstream resources, so the fan-out hides
/// per-request latency instead of paying it once per meal. A failure in one
/// meal never blocks or cancels the others; it is logged and that
/// (date, meal) is left for a later run to pick up.
pub struct DayFetcher<S> {
    source: MenuApiClient,
    sink: Arc<S>,
}

impl<S: MenuSink> DayFetcher<S> {
    pub fn new(source: MenuApiClient, sink: Arc<S>) -> Self {
        Self { source, sink }
    }

    /// Scrape all meal periods for one date, waiting for every fetch to
    /// settle before returning
    pub async fn run(&self, date: NaiveDate) -> anyhow::Result<()> {
        let fetches = MealType::ALL.map(|meal| self.fetch_meal(date, meal));
        futures::future::join_all(fetches).await;
        Ok(())
    }

    async fn fetch_meal(&self, date: NaiveDate, meal: MealType) {
        let payload = match self.source.fetch(date, meal).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(%date, %meal, error = %e, "fetch failed, skipping meal");
                return;
            }
        };

        match self.sink.save(&payload, date, meal).await {
            Ok(SaveOutcome::Saved { items }) => {
                info!(%date, %meal, items, "menu ingested");
            }
            Ok(SaveOutcome::SavedClosed) => {
                info!(%date, %meal, "dining hall closed");
            }
            Ok(SaveOutcome::AlreadyIngested) => {
                debug!(%date, %meal, "menu already ingested, skipping");
            }
            Err(e) => {
                error!(%date, %meal, error = %e, "failed to persist menu");
            }
        }
    }
}
