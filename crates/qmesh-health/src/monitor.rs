// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::snapshot::HealthSnapshot;
use crate::timing::ResponseTimeWindow;
use crate::{systeminfo, Error};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;

/// Default sampling interval for the periodic background refresh.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

struct Inner {
    queue_capacity: AtomicUsize,
    queue_size: AtomicUsize,
    latest: RwLock<HealthSnapshot>,
    response_times: RwLock<ResponseTimeWindow>,
}

/// Samples host resource usage and current queue pressure to produce
/// `HealthSnapshot`s. Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct HealthMonitor {
    inner: Arc<Inner>,
}

impl HealthMonitor {
    pub fn new(queue_capacity: usize) -> Self {
        let initial = HealthSnapshot::compute(0.0, 0.0, 0, queue_capacity, 0.0);

        Self {
            inner: Arc::new(Inner {
                queue_capacity: AtomicUsize::new(queue_capacity),
                queue_size: AtomicUsize::new(0),
                latest: RwLock::new(initial),
                response_times: RwLock::new(ResponseTimeWindow::new()),
            }),
        }
    }

    /// Re-sample system resources and recompute the snapshot, keeping the
    /// last-known queue size and capacity.
    pub async fn refresh(&self) -> HealthSnapshot {
        let sample = systeminfo::sample();
        let queue_size = self.inner.queue_size.load(Ordering::Relaxed);
        let queue_capacity = self.inner.queue_capacity.load(Ordering::Relaxed);
        let mean_response_ms = self.inner.response_times.read().await.mean_ms();

        let snapshot = HealthSnapshot::compute(
            sample.cpu_pct as f64,
            sample.mem_pct as f64,
            queue_size,
            queue_capacity,
            mean_response_ms,
        );

        *self.inner.latest.write().await = snapshot.clone();
        snapshot
    }

    /// Report a new queue occupancy. Admission must see up-to-date
    /// pressure immediately, so this recomputes the snapshot eagerly
    /// rather than waiting for the next periodic sample.
    pub async fn set_queue_size(&self, queue_size: usize) -> HealthSnapshot {
        self.inner.queue_size.store(queue_size, Ordering::Relaxed);
        self.refresh().await
    }

    pub fn set_queue_capacity(&self, queue_capacity: usize) {
        self.inner
            .queue_capacity
            .store(queue_capacity, Ordering::Relaxed);
    }

    pub async fn record_response_time(&self, duration_ms: f64) {
        self.inner.response_times.write().await.record(duration_ms);
    }

    pub async fn latest(&self) -> HealthSnapshot {
        self.inner.latest.read().await.clone()
    }

    pub fn try_latest(&self) -> Result<HealthSnapshot, Error> {
        self.inner
            .latest
            .try_read()
            .map(|s| s.clone())
            .map_err(|_| Error::Poisoned("health snapshot lock is held".to_string()))
    }

    /// Spawn a background task that periodically refreshes the snapshot.
    /// Runs indefinitely; callers keep the returned `JoinHandle` only if
    /// they need to cancel it (e.g. on worker shutdown).
    pub fn spawn_periodic_refresh(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let snapshot = monitor.refresh().await;
                if snapshot.state == crate::state::HealthState::Overloaded {
                    tracing::warn!(
                        health_score = snapshot.health_score,
                        cpu_pct = snapshot.cpu_pct,
                        mem_pct = snapshot.mem_pct,
                        "worker is overloaded"
                    );
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_queue_size_recomputes_eagerly() {
        let monitor = HealthMonitor::new(10);
        let before = monitor.latest().await;
        assert_eq!(before.queue_size, 0);

        let after = monitor.set_queue_size(5).await;
        assert_eq!(after.queue_size, 5);
        assert_eq!(monitor.latest().await.queue_size, 5);
    }

    #[tokio::test]
    async fn response_times_feed_the_rolling_mean() {
        let monitor = HealthMonitor::new(10);
        monitor.record_response_time(100.0).await;
        monitor.record_response_time(200.0).await;
        let snapshot = monitor.refresh().await;
        assert!((snapshot.mean_response_ms - 150.0).abs() < 1e-6);
    }
}
