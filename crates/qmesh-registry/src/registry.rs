// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::record::PeerRecord;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration as StdDuration;

/// Entries whose `lastSeen` is older than this are evicted by
/// `cleanup_stale` and excluded from `getLeaderboard`.
pub const STALENESS_WINDOW: Duration = Duration::minutes(5);

/// One row of `getLeaderboard`, carrying the rank alongside the record.
#[derive(Debug, Clone)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub record: PeerRecord,
}

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub total_workers: usize,
    pub available_workers: usize,
    pub average_health_score: f64,
    pub total_score: i64,
}

struct Entry {
    record: PeerRecord,
    last_seen: DateTime<Utc>,
}

/// In-memory `workerId -> PeerRecord` table aggregated from score-overlay
/// gossip. Single-process, `RwLock`-guarded: contention is low since
/// updates are infrequent relative to reads from `selectBest`.
#[derive(Default)]
pub struct Registry {
    peers: RwLock<HashMap<String, Entry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored record for `record.worker_id`, unless the
    /// existing entry already has a later `timestamp` (anti-reorder:
    /// gossip can arrive out of order over independent connections).
    pub fn update_peer(&self, record: PeerRecord) {
        let mut peers = self.peers.write().unwrap();
        let now = Utc::now();

        match peers.get(&record.worker_id) {
            Some(existing) if existing.record.timestamp > record.timestamp => {
                return;
            }
            _ => {}
        }

        peers.insert(
            record.worker_id.clone(),
            Entry {
                record,
                last_seen: now,
            },
        );
    }

    pub fn update_many(&self, records: Vec<PeerRecord>) {
        for record in records {
            self.update_peer(record);
        }
    }

    /// Evict entries not seen within the staleness window. Returns the
    /// number of entries removed.
    pub fn cleanup_stale(&self) -> usize {
        let mut peers = self.peers.write().unwrap();
        let cutoff = Utc::now() - STALENESS_WINDOW;
        let before = peers.len();
        peers.retain(|_, entry| entry.last_seen >= cutoff);
        before - peers.len()
    }

    /// Top `limit` peers by `total_score` descending, with ranks
    /// assigned starting at 1.
    pub fn get_leaderboard(&self, limit: usize) -> Vec<LeaderboardEntry> {
        let peers = self.peers.read().unwrap();
        let mut records: Vec<PeerRecord> = peers.values().map(|e| e.record.clone()).collect();
        records.sort_by(|a, b| b.total_score.cmp(&a.total_score));

        records
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, record)| LeaderboardEntry {
                rank: i + 1,
                record,
            })
            .collect()
    }

    /// Peers that are accepting work, have queue headroom, and are not
    /// overloaded.
    pub fn get_available(&self) -> Vec<PeerRecord> {
        self.peers
            .read()
            .unwrap()
            .values()
            .map(|e| e.record.clone())
            .filter(|r| r.is_available())
            .collect()
    }

    pub fn network_stats(&self) -> NetworkStats {
        let peers = self.peers.read().unwrap();
        let total_workers = peers.len();
        let available_workers = peers.values().filter(|e| e.record.is_available()).count();

        if total_workers == 0 {
            return NetworkStats::default();
        }

        let total_score: i64 = peers.values().map(|e| e.record.total_score).sum();
        let average_health_score =
            peers.values().map(|e| e.record.health_score).sum::<f64>() / total_workers as f64;

        NetworkStats {
            total_workers,
            available_workers,
            average_health_score,
            total_score,
        }
    }

    /// The client routing policy: prefer an empty-queue worker with the
    /// best health score; otherwise maximize a blended score across
    /// queue headroom, health, and reliability.
    pub fn select_best(&self) -> Option<PeerRecord> {
        let available = self.get_available();
        if available.is_empty() {
            return None;
        }

        let empty_queue: Vec<&PeerRecord> =
            available.iter().filter(|r| r.queue_size == 0).collect();

        if !empty_queue.is_empty() {
            return empty_queue
                .into_iter()
                .max_by(|a, b| {
                    a.health_score
                        .partial_cmp(&b.health_score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .cloned();
        }

        available
            .into_iter()
            .max_by(|a, b| {
                fallback_score(a)
                    .partial_cmp(&fallback_score(b))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn len(&self) -> usize {
        self.peers.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a background task that runs `cleanup_stale` on a fixed tick
    /// (default 60 s). Returns the task handle for callers that want to
    /// cancel it on shutdown.
    pub fn spawn_stale_sweeper(self: &Arc<Self>, interval: StdDuration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = registry.cleanup_stale();
                if removed > 0 {
                    tracing::debug!("registry sweeper evicted {} stale peers", removed);
                }
            }
        })
    }
}

pub const DEFAULT_SWEEP_INTERVAL: StdDuration = StdDuration::from_secs(60);

fn fallback_score(record: &PeerRecord) -> f64 {
    let queue_term = 60.0 * (1.0 - record.queue_size as f64 / record.queue_capacity.max(1) as f64);
    let health_term = 30.0 * (record.health_score / 100.0);
    let reliability_term = 10.0 * if record.success_rate > 0.0 { 1.0 } else { 0.5 };
    queue_term + health_term + reliability_term
}

#[cfg(test)]
mod tests {
    use super::*;
    use qmesh_health::HealthState;

    fn record(worker_id: &str, total_score: i64, queue_size: usize, health_score: f64) -> PeerRecord {
        PeerRecord {
            worker_id: worker_id.to_owned(),
            total_score,
            success_rate: 100.0,
            health_score,
            state: HealthState::from_score(health_score),
            queue_size,
            queue_capacity: 5,
            accepting: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn select_best_prefers_empty_queue_over_higher_score() {
        let registry = Registry::new();
        registry.update_peer(record("w1", 1000, 2, 80.0));
        registry.update_peer(record("w2", 500, 0, 70.0));
        registry.update_peer(record("w3", 750, 1, 90.0));

        let best = registry.select_best().unwrap();
        assert_eq!(best.worker_id, "w2");
    }

    #[test]
    fn select_best_returns_none_when_nothing_is_available() {
        let registry = Registry::new();
        let mut overloaded = record("w1", 1000, 5, 10.0);
        overloaded.accepting = false;
        registry.update_peer(overloaded);

        assert!(registry.select_best().is_none());
    }

    #[test]
    fn update_peer_discards_out_of_order_gossip() {
        let registry = Registry::new();
        let mut first = record("w1", 100, 0, 50.0);
        first.timestamp = Utc::now();
        registry.update_peer(first.clone());

        let mut stale = record("w1", 9999, 0, 50.0);
        stale.timestamp = first.timestamp - Duration::seconds(10);
        registry.update_peer(stale);

        assert_eq!(registry.get_leaderboard(1)[0].record.total_score, 100);
    }

    #[test]
    fn update_peer_is_idempotent() {
        let registry = Registry::new();
        let r = record("w1", 100, 0, 50.0);
        registry.update_peer(r.clone());
        registry.update_peer(r);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn cleanup_stale_evicts_old_entries_and_leaderboard_excludes_them() {
        let registry = Registry::new();
        registry.update_peer(record("w1", 9000, 0, 90.0));

        {
            let mut peers = registry.peers.write().unwrap();
            let entry = peers.get_mut("w1").unwrap();
            entry.last_seen = Utc::now() - Duration::minutes(6);
        }

        let removed = registry.cleanup_stale();
        assert_eq!(removed, 1);
        assert!(registry.get_leaderboard(10).is_empty());
        assert_eq!(registry.network_stats().total_workers, 0);
    }
}
