//! Shared worker pool for deferred callback tasks.
//!
//! A scheduled task carries only its spool handle, its channel handler, and
//! its delay — the resolved definition stays on disk until the task fires.
//! Execution concurrency is bounded by a semaphore sized from configuration
//! with an enforced floor; the delay itself costs nothing but a timer, so any
//! number of callbacks can wait at once.
//!
//! Task state machine: `Scheduled → Executing → {Success | Fatal | Retryable}`.
//! A retryable failure re-fires the same handle after a linear backoff
//! (`unit × attempt`) until the retry budget is spent; every terminal outcome
//! removes the spool file. Tasks are daemon-equivalent tokio tasks: process
//! shutdown abandons them and orphans their handles.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::time::Duration;

use crate::channel::ChannelHandler;
use crate::config::SchedulerConfig;
use crate::error::DeliveryError;
use crate::metrics::{CALLBACKS_DELIVERED_TOTAL, CALLBACKS_FAILED_TOTAL, CALLBACKS_RETRIED_TOTAL,
    CALLBACKS_SCHEDULED_TOTAL};
use crate::spool::{SpoolHandle, SpoolStore};

/// Floor on concurrent delivery workers regardless of configuration
const MIN_WORKERS: usize = 2;

/// Accepts deferred tasks and runs them on the shared worker pool.
pub struct Scheduler {
    permits: Arc<Semaphore>,
    spool: Arc<SpoolStore>,
    backoff_unit: Duration,
    max_retries: u32,
}

impl Scheduler {
    pub fn new(config: &SchedulerConfig, spool: Arc<SpoolStore>) -> Self {
        let workers = config.workers.max(MIN_WORKERS);
        tracing::info!(
            workers = workers,
            max_retries = config.max_retries,
            backoff_unit_ms = config.backoff_unit_ms,
            "Callback scheduler started"
        );

        Self {
            permits: Arc::new(Semaphore::new(workers)),
            spool,
            backoff_unit: config.backoff_unit(),
            max_retries: config.max_retries,
        }
    }

    /// Submit one task. Fire-and-forget: there is no cancellation and no
    /// completion signal; outcomes land in logs and metrics.
    pub fn schedule(
        &self,
        handle: SpoolHandle,
        handler: Arc<dyn ChannelHandler>,
        delay: Duration,
    ) {
        CALLBACKS_SCHEDULED_TOTAL.inc();
        tracing::debug!(
            key = %handle.key(),
            channel = handler.name(),
            delay_ms = delay.as_millis() as u64,
            "Callback task scheduled"
        );

        let task = Task {
            permits: self.permits.clone(),
            spool: self.spool.clone(),
            handler,
            handle,
            delay,
            backoff_unit: self.backoff_unit,
            max_retries: self.max_retries,
        };
        tokio::spawn(task.run());
    }
}

struct Task {
    permits: Arc<Semaphore>,
    spool: Arc<SpoolStore>,
    handler: Arc<dyn ChannelHandler>,
    handle: SpoolHandle,
    delay: Duration,
    backoff_unit: Duration,
    max_retries: u32,
}

impl Task {
    async fn run(self) {
        tokio::time::sleep(self.delay).await;

        // Attempt counter lives here and nowhere else
        let mut attempts: u32 = 0;

        loop {
            // Hold a worker permit only while actually executing; the backoff
            // wait below runs without one
            let permit = self
                .permits
                .clone()
                .acquire_owned()
                .await
                .expect("scheduler semaphore closed");
            let outcome = self.fire().await;
            drop(permit);

            match outcome {
                Ok(()) => {
                    CALLBACKS_DELIVERED_TOTAL
                        .with_label_values(&[self.handler.name()])
                        .inc();
                    self.spool.remove(&self.handle).await;
                    return;
                }
                Err(err) if err.is_retryable() && attempts < self.max_retries => {
                    attempts += 1;
                    CALLBACKS_RETRIED_TOTAL.inc();
                    let backoff = self.backoff_unit * attempts;
                    tracing::warn!(
                        key = %self.handle.key(),
                        channel = self.handler.name(),
                        attempt = attempts,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "Callback delivery failed, rescheduling"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    CALLBACKS_FAILED_TOTAL
                        .with_label_values(&[self.handler.name()])
                        .inc();
                    tracing::error!(
                        key = %self.handle.key(),
                        channel = self.handler.name(),
                        attempts = attempts,
                        error = %err,
                        "Callback abandoned after terminal failure"
                    );
                    self.spool.remove(&self.handle).await;
                    return;
                }
            }
        }
    }

    /// One synchronous end-to-end firing: deserialize, deliver, classify.
    async fn fire(&self) -> Result<(), DeliveryError> {
        let definition = self
            .spool
            .read(&self.handle)
            .await
            .map_err(|err| DeliveryError::Fatal(err.to_string()))?;
        self.handler.deliver(&definition).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::ResolvedCallback;
    use crate::config::SpoolConfig;
    use crate::error::DeliveryResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Handler failing a fixed number of times before succeeding.
    struct FlakyHandler {
        failures: AtomicUsize,
        retryable: bool,
        attempts: AtomicUsize,
        done: Notify,
    }

    impl FlakyHandler {
        fn new(failures: usize, retryable: bool) -> Arc<Self> {
            Arc::new(Self {
                failures: AtomicUsize::new(failures),
                retryable,
                attempts: AtomicUsize::new(0),
                done: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl ChannelHandler for FlakyHandler {
        fn name(&self) -> &'static str {
            "flaky"
        }

        fn accepts(&self, _definition: &ResolvedCallback) -> bool {
            true
        }

        async fn deliver(&self, _definition: &ResolvedCallback) -> DeliveryResult<()> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                if !self.retryable {
                    self.done.notify_one();
                    return Err(DeliveryError::Fatal("broken".to_string()));
                }
                return Err(DeliveryError::Retryable("flaky".to_string()));
            }
            self.done.notify_one();
            Ok(())
        }
    }

    fn sample_definition() -> ResolvedCallback {
        ResolvedCallback {
            delay_seconds: 0,
            url: None,
            queue: Some("orders".to_string()),
            topic: None,
            data: json!({"n": 1}),
            auth: None,
            trace_id: "t".to_string(),
            expected_status: None,
        }
    }

    async fn scheduler(max_retries: u32) -> (tempfile::TempDir, Arc<SpoolStore>, Scheduler) {
        let dir = tempfile::tempdir().unwrap();
        let spool = Arc::new(
            SpoolStore::open(&SpoolConfig {
                dir: dir.path().to_string_lossy().into_owned(),
            })
            .await
            .unwrap(),
        );
        let config = SchedulerConfig {
            workers: 2,
            backoff_unit_ms: 10,
            max_retries,
        };
        let scheduler = Scheduler::new(&config, spool.clone());
        (dir, spool, scheduler)
    }

    #[tokio::test]
    async fn delivers_and_cleans_up() {
        let (_dir, spool, scheduler) = scheduler(0).await;
        let handle = spool.persist(&sample_definition()).await.unwrap();
        let handler = FlakyHandler::new(0, true);

        scheduler.schedule(handle.clone(), handler.clone(), Duration::from_millis(1));
        tokio::time::timeout(Duration::from_secs(2), handler.done.notified())
            .await
            .expect("delivery should complete");

        // Terminal success removes the spool file
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(spool.read(&handle).await.is_err());
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_until_budget_then_succeeds() {
        let (_dir, spool, scheduler) = scheduler(3).await;
        let handle = spool.persist(&sample_definition()).await.unwrap();
        let handler = FlakyHandler::new(2, true);

        scheduler.schedule(handle, handler.clone(), Duration::from_millis(1));
        tokio::time::timeout(Duration::from_secs(2), handler.done.notified())
            .await
            .expect("delivery should eventually succeed");

        assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retry_disabled_fails_after_first_attempt() {
        let (_dir, spool, scheduler) = scheduler(0).await;
        let handle = spool.persist(&sample_definition()).await.unwrap();
        let handler = FlakyHandler::new(5, true);

        scheduler.schedule(handle.clone(), handler.clone(), Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(200)).await;

        // One attempt, then terminal: file gone, no further attempts
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 1);
        assert!(spool.read(&handle).await.is_err());
    }

    #[tokio::test]
    async fn fatal_failure_is_never_retried() {
        let (_dir, spool, scheduler) = scheduler(5).await;
        let handle = spool.persist(&sample_definition()).await.unwrap();
        let handler = FlakyHandler::new(1, false);

        scheduler.schedule(handle.clone(), handler.clone(), Duration::from_millis(1));
        tokio::time::timeout(Duration::from_secs(2), handler.done.notified())
            .await
            .expect("fatal outcome should be reached");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(handler.attempts.load(Ordering::SeqCst), 1);
        assert!(spool.read(&handle).await.is_err());
    }

    #[tokio::test]
    async fn exhausted_budget_removes_handle() {
        let (_dir, spool, scheduler) = scheduler(2).await;
        let handle = spool.persist(&sample_definition()).await.unwrap();
        let handler = FlakyHandler::new(10, true);

        scheduler.schedule(handle.clone(), handler.clone(), Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Initial attempt + two retries, then terminal fatal
        assert_eq!(handler.attempts.load(Ordering::SeqCst), 3);
        assert!(spool.read(&handle).await.is_err());
    }

    #[tokio::test]
    async fn honors_per_task_delay() {
        let (_dir, spool, scheduler) = scheduler(0).await;
        let handle = spool.persist(&sample_definition()).await.unwrap();
        let handler = FlakyHandler::new(0, true);

        let started = std::time::Instant::now();
        scheduler.schedule(handle, handler.clone(), Duration::from_millis(100));
        tokio::time::timeout(Duration::from_secs(2), handler.done.notified())
            .await
            .expect("delivery should complete");

        assert!(started.elapsed() >= Duration::from_millis(100));
    }
}
