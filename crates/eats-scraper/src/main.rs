//! eats-scraper - dining hall menu ingestion

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use eats_common::logging::{init_logging, LogConfig, LogLevel};
use tracing::info;

use eats_scraper::{
    config::ScraperConfig, db, fetch::DayFetcher, persist::PgMenuStore,
    schedule::ScrapeScheduler, source::MenuApiClient,
};

#[derive(Parser, Debug)]
#[command(name = "eats-scraper")]
#[command(author, version, about = "Ingest dining hall menus for a date range")]
struct Cli {
    /// First date to ingest (inclusive), YYYY-MM-DD
    #[arg(long)]
    start: NaiveDate,

    /// End of the range (exclusive), YYYY-MM-DD
    #[arg(long)]
    end: NaiveDate,

    /// Override the worker pool size
    #[arg(long)]
    workers: Option<usize>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config first so .env values are visible to the logging setup.
    let mut config = ScraperConfig::load()?;

    let mut log_config = LogConfig::from_env().unwrap_or_else(|_| {
        LogConfig::builder().file_prefix("eats-scraper").build()
    });
    if cli.verbose {
        log_config.level = LogLevel::Debug;
    }
    init_logging(&log_config)?;

    anyhow::ensure!(
        cli.start <= cli.end,
        "start date {} is after end date {}",
        cli.start,
        cli.end
    );

    if let Some(workers) = cli.workers {
        config.scheduler.workers = workers;
        config.validate()?;
    }

    info!(
        start = %cli.start,
        end = %cli.end,
        workers = config.scheduler.workers,
        "starting menu ingestion"
    );

    // A run that cannot reach storage aborts here, before any task is
    // scheduled.
    let pool = db::create_pool(&config.database)
        .await
        .context("failed to establish database connection")?;

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("failed to apply database migrations")?;

    let client = MenuApiClient::new(config.api.clone())?;
    let store = Arc::new(PgMenuStore::new(pool));
    let fetcher = Arc::new(DayFetcher::new(client, store));
    let scheduler = ScrapeScheduler::new(fetcher, config.scheduler.clone());

    scheduler.run_range(cli.start, cli.end).await?;

    info!("ingestion complete");
    Ok(())
}
