// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::Error;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One mutation to apply as part of a `batch`.
#[derive(Debug, Clone)]
pub enum Op {
    Put(String, Value),
    Delete(String),
}

/// A single append-only record, written to the journal file in order.
/// Replaying the journal from an empty map reproduces the current state;
/// this is the store's only durability mechanism, matching its billing as
/// an abstract key/range interface over an external log-structured engine.
#[derive(serde::Serialize, serde::Deserialize)]
struct Record {
    op: RecordOp,
}

#[derive(serde::Serialize, serde::Deserialize)]
enum RecordOp {
    Put { key: String, value: Value },
    Delete { key: String },
}

/// Append-only ordered key/range store. Keys are compared lexically, so
/// prefix scans (`workers/`, `history/`, `leaderboard/`) return entries in
/// a stable, predictable order without a secondary index.
pub struct Store {
    journal_path: Option<PathBuf>,
    journal: Mutex<Option<std::fs::File>>,
    data: Mutex<BTreeMap<String, Value>>,
}

impl Store {
    /// An in-memory-only store, useful for tests and for the client
    /// binary which does not need durable history.
    pub fn in_memory() -> Self {
        Self {
            journal_path: None,
            journal: Mutex::new(None),
            data: Mutex::new(BTreeMap::new()),
        }
    }

    /// Open (or create) a journal file at `path`, replaying any existing
    /// records to rebuild the in-memory index.
    pub fn open(path: &Path) -> Result<Self, Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut data = BTreeMap::new();

        if path.exists() {
            let file = std::fs::File::open(path)?;
            let reader = std::io::BufReader::new(file);
            for line in reader.lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let record: Record = serde_json::from_str(&line)?;
                match record.op {
                    RecordOp::Put { key, value } => {
                        data.insert(key, value);
                    }
                    RecordOp::Delete { key } => {
                        data.remove(&key);
                    }
                }
            }
        }

        let journal = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Ok(Self {
            journal_path: Some(path.to_path_buf()),
            journal: Mutex::new(Some(journal)),
            data: Mutex::new(data),
        })
    }

    pub fn put(&self, key: &str, value: Value) -> Result<(), Error> {
        self.batch(vec![Op::Put(key.to_owned(), value)])
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.lock().unwrap().get(key).cloned()
    }

    pub fn delete(&self, key: &str) -> Result<(), Error> {
        self.batch(vec![Op::Delete(key.to_owned())])
    }

    /// Delete every key with the given prefix.
    pub fn delete_range(&self, prefix: &str) -> Result<(), Error> {
        let keys: Vec<String> = self.scan_range(prefix).into_iter().map(|(k, _)| k).collect();
        self.batch(keys.into_iter().map(Op::Delete).collect())
    }

    /// All entries whose key starts with `prefix`, in key order.
    pub fn scan_range(&self, prefix: &str) -> Vec<(String, Value)> {
        self.data
            .lock()
            .unwrap()
            .range(prefix.to_owned()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Apply a sequence of operations atomically: either all are applied
    /// (to the in-memory index and the journal) or none are.
    pub fn batch(&self, ops: Vec<Op>) -> Result<(), Error> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut lines = Vec::with_capacity(ops.len());
        for op in &ops {
            let record = match op {
                Op::Put(key, value) => Record {
                    op: RecordOp::Put {
                        key: key.clone(),
                        value: value.clone(),
                    },
                },
                Op::Delete(key) => Record {
                    op: RecordOp::Delete { key: key.clone() },
                },
            };
            lines.push(serde_json::to_string(&record)?);
        }

        let mut journal_guard = self.journal.lock().unwrap();
        if let Some(journal) = journal_guard.as_mut() {
            for line in &lines {
                writeln!(journal, "{}", line)?;
            }
            journal.flush()?;
        }
        drop(journal_guard);

        let mut data = self.data.lock().unwrap();
        for op in ops {
            match op {
                Op::Put(key, value) => {
                    data.insert(key, value);
                }
                Op::Delete(key) => {
                    data.remove(&key);
                }
            }
        }

        Ok(())
    }

    pub fn journal_path(&self) -> Option<&Path> {
        self.journal_path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn put_then_get_round_trips() {
        let store = Store::in_memory();
        store.put("workers/abc", json!({"score": 10})).unwrap();
        assert_eq!(store.get("workers/abc"), Some(json!({"score": 10})));
    }

    #[test]
    fn scan_range_only_returns_matching_prefix_in_key_order() {
        let store = Store::in_memory();
        store.put("leaderboard/0002", json!("b")).unwrap();
        store.put("leaderboard/0001", json!("a")).unwrap();
        store.put("workers/x", json!("other")).unwrap();

        let scanned = store.scan_range("leaderboard/");
        assert_eq!(
            scanned,
            vec![
                ("leaderboard/0001".to_string(), json!("a")),
                ("leaderboard/0002".to_string(), json!("b")),
            ]
        );
    }

    #[test]
    fn leaderboard_snapshot_is_rewritten_by_delete_range_then_batch_put() {
        let store = Store::in_memory();
        store.put("leaderboard/0001", json!("stale")).unwrap();

        store.delete_range("leaderboard/").unwrap();
        store
            .batch(vec![
                Op::Put("leaderboard/0001".to_string(), json!("fresh-a")),
                Op::Put("leaderboard/0002".to_string(), json!("fresh-b")),
            ])
            .unwrap();

        let scanned = store.scan_range("leaderboard/");
        assert_eq!(scanned.len(), 2);
        assert_eq!(scanned[0].1, json!("fresh-a"));
    }

    #[test]
    fn reopening_a_journal_replays_all_records() {
        let dir = std::env::temp_dir().join(format!("qmesh-store-test-{}", std::process::id()));
        let path = dir.join("journal.jsonl");

        {
            let store = Store::open(&path).unwrap();
            store.put("workers/abc", json!({"score": 5})).unwrap();
            store.delete("workers/abc").unwrap();
            store.put("workers/def", json!({"score": 7})).unwrap();
        }

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.get("workers/abc"), None);
        assert_eq!(reopened.get("workers/def"), Some(json!({"score": 7})));

        std::fs::remove_dir_all(&dir).ok();
    }
}
