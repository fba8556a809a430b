//! Focus/visibility refresh scheduler.
//!
//! Triggers a cart refresh when the application regains foreground
//! attention, debounced so a burst of focus/blur flicker collapses into one
//! call, and rate-limited so refreshes never fire more often than the
//! minimum interval. This is a best-effort freshness mechanism; the
//! reconcile-after-mutation pattern in the engine is the primary
//! consistency mechanism.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::engine::CartHandle;

/// Something the scheduler can refresh. Seam for tests; the production
/// target is [`CartHandle`].
#[async_trait]
pub trait RefreshTarget: Send + Sync + 'static {
    async fn refresh(&self);
}

#[async_trait]
impl RefreshTarget for CartHandle {
    async fn refresh(&self) {
        if let Err(error) = CartHandle::refresh(self).await {
            warn!(%error, "scheduled refresh failed");
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Quiet period after the last focus event before refreshing.
    pub debounce: Duration,
    /// Minimum time between two scheduled refreshes.
    pub min_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            min_interval: Duration::from_secs(3),
        }
    }
}

/// Handle to the scheduler task. Dropping it (or calling
/// [`FocusScheduler::shutdown`]) cancels any pending timer and stops the
/// task.
pub struct FocusScheduler {
    sender: mpsc::UnboundedSender<()>,
    task: tokio::task::JoinHandle<()>,
}

impl FocusScheduler {
    pub fn spawn(target: Arc<dyn RefreshTarget>, config: SchedulerConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(target, config, receiver));
        Self { sender, task }
    }

    /// Reports that the window regained focus or the tab became visible.
    /// Each call reschedules the pending timer, collapsing bursts.
    pub fn focus_gained(&self) {
        let _ = self.sender.send(());
    }

    pub async fn shutdown(self) {
        drop(self.sender);
        let _ = self.task.await;
    }
}

async fn run(
    target: Arc<dyn RefreshTarget>,
    config: SchedulerConfig,
    mut events: mpsc::UnboundedReceiver<()>,
) {
    debug!(?config, "focus scheduler started");
    let mut deadline: Option<Instant> = None;
    let mut last_refresh: Option<Instant> = None;

    loop {
        // The sleep branch is disabled while no timer is pending; the
        // placeholder deadline is never awaited in that case.
        let sleep_until = deadline.unwrap_or_else(Instant::now);
        tokio::select! {
            event = events.recv() => match event {
                Some(()) => {
                    // Cancel-on-reschedule: the newest event wins.
                    deadline = Some(Instant::now() + config.debounce);
                }
                None => break,
            },
            _ = tokio::time::sleep_until(sleep_until), if deadline.is_some() => {
                deadline = None;
                let due = last_refresh.map_or(true, |at| at.elapsed() >= config.min_interval);
                if due {
                    debug!("focus regained, refreshing cart");
                    target.refresh().await;
                    last_refresh = Some(Instant::now());
                } else {
                    debug!("focus refresh skipped, below minimum interval");
                }
            }
        }
    }
    debug!("focus scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingTarget {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RefreshTarget for Arc<CountingTarget> {
        async fn refresh(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counting() -> (Arc<CountingTarget>, Arc<dyn RefreshTarget>) {
        let counter = Arc::new(CountingTarget {
            calls: AtomicUsize::new(0),
        });
        (Arc::clone(&counter), Arc::new(Arc::clone(&counter)))
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_focus_events_collapses_into_one_refresh() {
        let (counter, target) = counting();
        let scheduler = FocusScheduler::spawn(target, SchedulerConfig::default());

        scheduler.focus_gained();
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.focus_gained();
        tokio::time::sleep(Duration::from_millis(100)).await;
        scheduler.focus_gained();

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_is_rate_limited_to_the_minimum_interval() {
        let (counter, target) = counting();
        let scheduler = FocusScheduler::spawn(target, SchedulerConfig::default());

        scheduler.focus_gained();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

        // Focus again immediately: the debounce fires but the refresh is
        // skipped because the minimum interval has not elapsed.
        scheduler.focus_gained();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);

        // After the minimum interval, a new focus event refreshes again.
        tokio::time::sleep(Duration::from_secs(3)).await;
        scheduler.focus_gained();
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timer() {
        let (counter, target) = counting();
        let scheduler = FocusScheduler::spawn(target, SchedulerConfig::default());

        scheduler.focus_gained();
        scheduler.shutdown().await;

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 0);
    }
}
