//! Scraper configuration, loaded from the environment.

use std::time::Duration;

use chrono::NaiveDate;
use eats_common::types::MealType;
use serde::{Deserialize, Serialize};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default base URL of the upstream menu API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.dineoncampus.com/v1";

/// Default dining location identifier at the upstream source.
pub const DEFAULT_LOCATION_ID: &str = "5b50c589f3eeb609b36a87eb";

/// Default upstream period identifiers, one per meal type.
pub const DEFAULT_BREAKFAST_PERIOD_ID: &str = "66bf79f3351d5300dd055257";
pub const DEFAULT_LUNCH_PERIOD_ID: &str = "66bf7d21e45d430859cf99b2";
pub const DEFAULT_DINNER_PERIOD_ID: &str = "66bf7d21e45d430859cf99b8";

/// Identifying header sent on every request. The upstream API serves the
/// mobile payload shape for this agent.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";

/// Default per-request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default worker pool size.
pub const DEFAULT_WORKER_COUNT: usize = 5;

/// Default task queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5;

/// Default delay each worker sleeps after finishing a date, in seconds.
pub const DEFAULT_TASK_DELAY_SECS: u64 = 5;

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/campus_eats";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default minimum database connections in the pool.
pub const DEFAULT_DATABASE_MIN_CONNECTIONS: u32 = 2;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Scraper configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub scheduler: SchedulerConfig,
}

/// Upstream menu API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub location_id: String,
    pub breakfast_period_id: String,
    pub lunch_period_id: String,
    pub dinner_period_id: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub task_delay_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            location_id: DEFAULT_LOCATION_ID.to_string(),
            breakfast_period_id: DEFAULT_BREAKFAST_PERIOD_ID.to_string(),
            lunch_period_id: DEFAULT_LUNCH_PERIOD_ID.to_string(),
            dinner_period_id: DEFAULT_DINNER_PERIOD_ID.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            task_delay_secs: DEFAULT_TASK_DELAY_SECS,
        }
    }
}

impl ApiConfig {
    /// Upstream period identifier for a meal type
    pub fn period_id(&self, meal: MealType) -> &str {
        match meal {
            MealType::Breakfast => &self.breakfast_period_id,
            MealType::Lunch => &self.lunch_period_id,
            MealType::Dinner => &self.dinner_period_id,
        }
    }

    /// Full menu endpoint URL for one (date, meal) period
    pub fn menu_url(&self, date: NaiveDate, meal: MealType) -> String {
        format!(
            "{}/location/{}/periods/{}?platform=0&date={}",
            self.base_url,
            self.location_id,
            self.period_id(meal),
            date.format("%Y-%m-%d")
        )
    }
}

impl SchedulerConfig {
    /// Delay each worker sleeps between tasks
    pub fn task_delay(&self) -> Duration {
        Duration::from_secs(self.task_delay_secs)
    }
}

impl ScraperConfig {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = ScraperConfig {
            api: ApiConfig {
                base_url: std::env::var("MENU_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string()),
                location_id: std::env::var("MENU_API_LOCATION_ID")
                    .unwrap_or_else(|_| DEFAULT_LOCATION_ID.to_string()),
                breakfast_period_id: std::env::var("MENU_API_BREAKFAST_PERIOD")
                    .unwrap_or_else(|_| DEFAULT_BREAKFAST_PERIOD_ID.to_string()),
                lunch_period_id: std::env::var("MENU_API_LUNCH_PERIOD")
                    .unwrap_or_else(|_| DEFAULT_LUNCH_PERIOD_ID.to_string()),
                dinner_period_id: std::env::var("MENU_API_DINNER_PERIOD")
                    .unwrap_or_else(|_| DEFAULT_DINNER_PERIOD_ID.to_string()),
                user_agent: std::env::var("MENU_API_USER_AGENT")
                    .unwrap_or_else(|_| DEFAULT_USER_AGENT.to_string()),
                request_timeout_secs: std::env::var("MENU_API_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            },
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: std::env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
                min_connections: std::env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_MIN_CONNECTIONS),
                connect_timeout_secs: std::env::var("DATABASE_CONNECT_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS),
            },
            scheduler: SchedulerConfig {
                workers: std::env::var("SCRAPER_WORKERS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_WORKER_COUNT),
                queue_capacity: std::env::var("SCRAPER_QUEUE_CAPACITY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_QUEUE_CAPACITY),
                task_delay_secs: std::env::var("SCRAPER_TASK_DELAY")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TASK_DELAY_SECS),
            },
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api.base_url.is_empty() {
            anyhow::bail!("Menu API base URL cannot be empty");
        }

        if self.api.request_timeout_secs == 0 {
            anyhow::bail!("Menu API timeout must be greater than 0");
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        if self.scheduler.workers == 0 {
            anyhow::bail!("Scheduler worker count must be greater than 0");
        }

        if self.scheduler.queue_capacity == 0 {
            anyhow::bail!("Scheduler queue capacity must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_url() {
        let api = ApiConfig {
            base_url: "https://menus.example.edu/v1".to_string(),
            location_id: "loc1".to_string(),
            lunch_period_id: "p-lunch".to_string(),
            ..ApiConfig::default()
        };

        let date = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap();
        assert_eq!(
            api.menu_url(date, MealType::Lunch),
            "https://menus.example.edu/v1/location/loc1/periods/p-lunch?platform=0&date=2024-10-27"
        );
    }

    #[test]
    fn test_period_id_per_meal() {
        let api = ApiConfig::default();
        assert_eq!(api.period_id(MealType::Breakfast), DEFAULT_BREAKFAST_PERIOD_ID);
        assert_eq!(api.period_id(MealType::Lunch), DEFAULT_LUNCH_PERIOD_ID);
        assert_eq!(api.period_id(MealType::Dinner), DEFAULT_DINNER_PERIOD_ID);
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = ScraperConfig {
            api: ApiConfig::default(),
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                min_connections: DEFAULT_DATABASE_MIN_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            scheduler: SchedulerConfig::default(),
        };
        assert!(config.validate().is_ok());

        config.scheduler.workers = 0;
        assert!(config.validate().is_err());
    }
}
