//! Bounded worker pool driving per-date scrapes across a date range.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info};

use crate::config::SchedulerConfig;
use crate::fetch::DayFetcher;
use crate::persist::MenuSink;

/// One day's worth of scraping work
#[async_trait]
pub trait DayRunner: Send + Sync {
    async fn run_day(&self, date: NaiveDate) -> anyhow::Result<()>;
}

#[async_trait]
impl<S: MenuSink + 'static> DayRunner for DayFetcher<S> {
    async fn run_day(&self, date: NaiveDate) -> anyhow::Result<()> {
        self.run(date).await
    }
}

/// Fixed-size worker pool consuming a bounded queue of per-date tasks.
///
/// The queue capacity is the backpressure mechanism: once it fills, the
/// producer blocks, capping how many dates are in flight. Each worker
/// sleeps a fixed delay after finishing a date, which caps the aggregate
/// request rate against the upstream API independent of pool size.
pub struct ScrapeScheduler<R> {
    runner: Arc<R>,
    config: SchedulerConfig,
}

impl<R: DayRunner + 'static> ScrapeScheduler<R> {
    pub fn new(runner: Arc<R>, config: SchedulerConfig) -> Self {
        Self { runner, config }
    }

    /// Scrape every date in `[start, end)`, in ascending enqueue order.
    ///
    /// Completion order across dates is not guaranteed; per-(date, meal)
    /// idempotency in the persister is what makes that safe. Returns once
    /// every worker has drained the queue and exited.
    pub async fn run_range(&self, start: NaiveDate, end: NaiveDate) -> anyhow::Result<()> {
        let (tx, rx) = mpsc::channel::<NaiveDate>(self.config.queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers = Vec::with_capacity(self.config.workers);
        for worker_id in 0..self.config.workers {
            let rx = Arc::clone(&rx);
            let runner = Arc::clone(&self.runner);
            let delay = self.config.task_delay();

            workers.push(tokio::spawn(async move {
                loop {
                    // Hold the lock only for the dequeue so other workers
                    // can take tasks while this one scrapes.
                    let date = { rx.lock().await.recv().await };
                    let Some(date) = date else { break };

                    debug!(worker_id, %date, "worker picked up date");
                    if let Err(e) = runner.run_day(date).await {
                        error!(worker_id, %date, error = %e, "date scrape failed");
                    }

                    tokio::time::sleep(delay).await;
                }
                debug!(worker_id, "worker finished");
            }));
        }

        let mut date = start;
        while date < end {
            tx.send(date)
                .await
                .map_err(|_| anyhow::anyhow!("task queue closed before {} was enqueued", date))?;
            date = date
                .succ_opt()
                .ok_or_else(|| anyhow::anyhow!("date range overflow past {}", date))?;
        }

        // Closing the queue is what lets the workers exit their loops.
        drop(tx);

        for worker in workers {
            worker.await?;
        }

        info!(%start, %end, "date range complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingRunner {
        dates: Mutex<Vec<NaiveDate>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RecordingRunner {
        fn new() -> Self {
            Self {
                dates: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DayRunner for RecordingRunner {
        async fn run_day(&self, date: NaiveDate) -> anyhow::Result<()> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            self.dates.lock().await.push(date);

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn config(workers: usize, queue_capacity: usize) -> SchedulerConfig {
        SchedulerConfig {
            workers,
            queue_capacity,
            task_delay_secs: 0,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, day).unwrap()
    }

    #[tokio::test]
    async fn test_every_date_processed_exactly_once() {
        let runner = Arc::new(RecordingRunner::new());
        let scheduler = ScrapeScheduler::new(Arc::clone(&runner), config(3, 2));

        scheduler.run_range(date(1), date(11)).await.unwrap();

        let mut dates = runner.dates.lock().await.clone();
        dates.sort();
        let expected: Vec<NaiveDate> = (1..11).map(date).collect();
        assert_eq!(dates, expected);
    }

    #[tokio::test]
    async fn test_pool_size_bounds_concurrency() {
        let runner = Arc::new(RecordingRunner::new());
        let scheduler = ScrapeScheduler::new(Arc::clone(&runner), config(2, 5));

        scheduler.run_range(date(1), date(13)).await.unwrap();

        assert!(runner.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(runner.dates.lock().await.len(), 12);
    }

    #[tokio::test]
    async fn test_empty_range_is_a_noop() {
        let runner = Arc::new(RecordingRunner::new());
        let scheduler = ScrapeScheduler::new(Arc::clone(&runner), config(2, 2));

        scheduler.run_range(date(5), date(5)).await.unwrap();

        assert!(runner.dates.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_runner_errors_do_not_abort_the_range() {
        struct FailingRunner {
            attempts: AtomicUsize,
        }

        #[async_trait]
        impl DayRunner for FailingRunner {
            async fn run_day(&self, _date: NaiveDate) -> anyhow::Result<()> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("upstream unavailable")
            }
        }

        let runner = Arc::new(FailingRunner { attempts: AtomicUsize::new(0) });
        let scheduler = ScrapeScheduler::new(Arc::clone(&runner), config(2, 2));

        scheduler.run_range(date(1), date(5)).await.unwrap();

        assert_eq!(runner.attempts.load(Ordering::SeqCst), 4);
    }
}
