// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::achievement::Achievement;
use crate::record::{RequestOutcome, ScoreRecord};
use crate::Error;
use qmesh_store::{Op, Store};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Upper bound on how many ranked rows `write_leaderboard_snapshot`
/// persists per rewrite. Per-update full rewrites are O(N); this keeps
/// that bounded for large populations. The registry's in-memory
/// `get_leaderboard(limit)` is unaffected and can still be queried for
/// the complete ranking -- the snapshot is a persistence convenience.
pub const LEADERBOARD_SNAPSHOT_LIMIT: usize = 200;

fn workers_key(worker_id: &str) -> String {
    format!("workers/{}", worker_id)
}

fn history_key(request_id: &str) -> String {
    format!("history/{}", request_id)
}

fn leaderboard_key(rank: usize) -> String {
    format!("leaderboard/{:04}", rank)
}

/// One ranked row as persisted in a leaderboard snapshot. Deliberately
/// decoupled from `qmesh_registry::LeaderboardEntry` so this crate does
/// not need to depend on the registry -- callers that hold registry
/// entries map them into this shape before persisting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardSnapshotRow {
    pub rank: usize,
    pub worker_id: String,
    pub total_score: i64,
}

/// Owns the local worker's `ScoreRecord` (and, if this process also
/// tracks peers, any other worker records it has seen) and persists
/// every update through a `qmesh_store::Store`.
pub struct ScoreManager {
    store: Arc<Store>,
    records: Mutex<HashMap<String, ScoreRecord>>,
}

impl ScoreManager {
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Load `worker_id`'s record from the store, or create a fresh one
    /// if this is the first time it has been seen.
    pub fn load_or_create(&self, worker_id: &str) -> ScoreRecord {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get(worker_id) {
            return record.clone();
        }

        let record = match self.store.get(&workers_key(worker_id)) {
            Some(value) => serde_json::from_value(value).unwrap_or_else(|_| ScoreRecord::new(worker_id)),
            None => ScoreRecord::new(worker_id),
        };

        records.insert(worker_id.to_owned(), record.clone());
        record
    }

    /// Apply a request outcome to the local worker's record, persist the
    /// updated record, and return the newly earned achievements (if any)
    /// so the caller can gossip or log them.
    pub fn apply_outcome(
        &self,
        worker_id: &str,
        request_id: &str,
        outcome: RequestOutcome,
    ) -> Result<(ScoreRecord, Vec<Achievement>), Error> {
        let mut record = self.load_or_create(worker_id);
        let earned = record.apply_outcome(outcome);

        self.persist(&record)?;
        self.store.put(
            &history_key(request_id),
            serde_json::json!({
                "worker_id": worker_id,
                "success": outcome.success,
                "response_time_ms": outcome.response_time_ms,
            }),
        )?;

        self.records
            .lock()
            .unwrap()
            .insert(worker_id.to_owned(), record.clone());

        Ok((record, earned))
    }

    pub fn current(&self, worker_id: &str) -> Option<ScoreRecord> {
        self.records.lock().unwrap().get(worker_id).cloned()
    }

    /// Rewrite the `leaderboard/` range as a range: first a batch delete
    /// of every existing `leaderboard/` key, then batch puts of the new
    /// ordered rows, applied as one atomic batch (matching §4.10's
    /// delete-then-put snapshot rewrite).
    pub fn write_leaderboard_snapshot(&self, rows: &[LeaderboardSnapshotRow]) -> Result<(), Error> {
        let mut ops: Vec<Op> = self
            .store
            .scan_range("leaderboard/")
            .into_iter()
            .map(|(key, _)| Op::Delete(key))
            .collect();

        for row in rows.iter().take(LEADERBOARD_SNAPSHOT_LIMIT) {
            let value = serde_json::to_value(row)?;
            ops.push(Op::Put(leaderboard_key(row.rank), value));
        }

        self.store.batch(ops)?;
        Ok(())
    }

    fn persist(&self, record: &ScoreRecord) -> Result<(), Error> {
        let value = serde_json::to_value(record)?;
        self.store.put(&workers_key(&record.worker_id), value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RequestOutcome;

    #[test]
    fn apply_outcome_persists_a_new_version_each_time() {
        let manager = ScoreManager::new(Arc::new(Store::in_memory()));

        let (first, _) = manager
            .apply_outcome(
                "worker-1",
                "req-1",
                RequestOutcome {
                    success: true,
                    response_time_ms: 200.0,
                    prompt_length: 40,
                    result_length: 150,
                },
            )
            .unwrap();
        assert_eq!(first.version, 1);

        let (second, _) = manager
            .apply_outcome(
                "worker-1",
                "req-2",
                RequestOutcome {
                    success: true,
                    response_time_ms: 200.0,
                    prompt_length: 40,
                    result_length: 150,
                },
            )
            .unwrap();
        assert_eq!(second.version, 2);
        assert!(second.total_score > first.total_score);
    }

    #[test]
    fn write_leaderboard_snapshot_replaces_the_whole_range() {
        let store = Arc::new(Store::in_memory());
        let manager = ScoreManager::new(Arc::clone(&store));

        manager
            .write_leaderboard_snapshot(&[LeaderboardSnapshotRow {
                rank: 1,
                worker_id: "stale-worker".to_string(),
                total_score: 9999,
            }])
            .unwrap();

        manager
            .write_leaderboard_snapshot(&[
                LeaderboardSnapshotRow {
                    rank: 1,
                    worker_id: "w1".to_string(),
                    total_score: 500,
                },
                LeaderboardSnapshotRow {
                    rank: 2,
                    worker_id: "w2".to_string(),
                    total_score: 100,
                },
            ])
            .unwrap();

        let scanned = store.scan_range("leaderboard/");
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].0, "leaderboard/0001");
        assert_eq!(scanned[0].1["worker_id"], "w1");
    }
}
