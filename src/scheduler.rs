//! Fixed-interval background jobs with cancellation handles

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info};

/// A running periodic job. Dropping it stops the loop and aborts in-flight runs.
pub struct ScheduledTask {
    name: &'static str,
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Stops ticking, aborts runs still in flight and waits for the loop to exit.
    pub async fn cancel(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!(task = self.name, "scheduler.cancelled");
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Runs `job` immediately and then every `period`.
///
/// Each run is spawned on its own, so a slow run never delays the next tick
/// and runs may overlap.
pub fn spawn_periodic<F, Fut>(name: &'static str, period: Duration, job: F) -> ScheduledTask
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        let mut runs: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => break,
                _ = interval.tick() => {
                    debug!(task = name, in_flight = runs.len(), "scheduler.tick");
                    runs.spawn(job());
                }
                Some(_) = runs.join_next(), if !runs.is_empty() => {}
            }
        }

        runs.shutdown().await;
    });

    info!(task = name, period_ms = %period.as_millis(), "scheduler.started");
    ScheduledTask {
        name,
        shutdown,
        handle: Some(handle),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_runs_immediately_then_every_period() {
        let count = Arc::new(AtomicUsize::new(0));
        let task = {
            let count = count.clone();
            spawn_periodic("test", Duration::from_secs(10), move || {
                let count = count.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        task.cancel().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_runs_overlap() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let task = {
            let (started, finished) = (started.clone(), finished.clone());
            spawn_periodic("slow", Duration::from_secs(5), move || {
                let (started, finished) = (started.clone(), finished.clone());
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(12)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                }
            })
        };

        tokio::time::sleep(Duration::from_secs(11)).await;
        // Ticks at 0s, 5s and 10s all started although none has finished.
        assert_eq!(started.load(Ordering::SeqCst), 3);
        assert_eq!(finished.load(Ordering::SeqCst), 0);

        task.cancel().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_drop_stops_loop() {
        let task = spawn_periodic("dropped", Duration::from_millis(1), || async {});
        assert_eq!(task.name(), "dropped");
        drop(task);
    }
}
