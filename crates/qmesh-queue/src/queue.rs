// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::tier::Tier;
use crate::Error;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One entry held in the admission queue, carrying enough of the request
/// to dispatch it and to report its position without a second lookup.
#[derive(Debug, Clone)]
pub struct QueueEntry<T> {
    pub request_id: String,
    pub priority: i64,
    pub tier: Tier,
    pub enqueued_at: DateTime<Utc>,
    pub payload: T,
}

/// A histogram of how many queued entries fall in each tier, used for
/// the worker's diagnostic snapshot.
#[derive(Debug, Clone, Default)]
pub struct TierHistogram {
    counts: HashMap<Tier, usize>,
}

impl TierHistogram {
    pub fn count(&self, tier: Tier) -> usize {
        self.counts.get(&tier).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tier, usize)> + '_ {
        Tier::ALL.iter().map(move |t| (*t, self.count(*t)))
    }
}

/// Priority-ordered admission queue. Entries are kept fully sorted on
/// insert: the new entry is placed at the first index whose priority is
/// strictly less than its own, so entries of equal priority keep their
/// relative (earlier-timestamp-first) order. No entry is ever evicted --
/// callers who want bounded capacity enforce it before calling `enqueue`.
#[derive(Debug, Default)]
pub struct PriorityQueue<T> {
    entries: Vec<QueueEntry<T>>,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn enqueue(&mut self, entry: QueueEntry<T>) {
        let index = self
            .entries
            .iter()
            .position(|existing| existing.priority < entry.priority)
            .unwrap_or(self.entries.len());

        self.entries.insert(index, entry);
    }

    pub fn dequeue(&mut self) -> Option<QueueEntry<T>> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub fn peek(&self) -> Option<&QueueEntry<T>> {
        self.entries.first()
    }

    /// Zero-based position of `request_id` in dispatch order.
    pub fn position(&self, request_id: &str) -> Result<usize, Error> {
        self.entries
            .iter()
            .position(|e| e.request_id == request_id)
            .ok_or_else(|| Error::NotFound(request_id.to_owned()))
    }

    pub fn remove(&mut self, request_id: &str) -> Option<QueueEntry<T>> {
        let index = self.entries.iter().position(|e| e.request_id == request_id)?;
        Some(self.entries.remove(index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn snapshot(&self) -> TierHistogram {
        let mut counts = HashMap::new();
        for entry in &self.entries {
            *counts.entry(entry.tier).or_insert(0) += 1;
        }
        TierHistogram { counts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(request_id: &str, priority: i64, seconds_ago: i64) -> QueueEntry<()> {
        QueueEntry {
            request_id: request_id.to_owned(),
            priority,
            tier: Tier::from_score(priority),
            enqueued_at: Utc::now() - chrono::Duration::seconds(seconds_ago),
            payload: (),
        }
    }

    #[test]
    fn dequeue_on_empty_queue_returns_none() {
        let mut queue: PriorityQueue<()> = PriorityQueue::new();
        assert!(queue.dequeue().is_none());
    }

    #[test]
    fn higher_priority_dispatches_first() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(entry("a", 50, 3));
        queue.enqueue(entry("b", 1500, 2));
        queue.enqueue(entry("c", 50, 1));

        assert_eq!(queue.dequeue().unwrap().request_id, "b");
        assert_eq!(queue.dequeue().unwrap().request_id, "a");
        assert_eq!(queue.dequeue().unwrap().request_id, "c");
    }

    #[test]
    fn enqueue_then_dequeue_round_trips_a_single_entry() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(entry("only", 100, 0));
        let out = queue.dequeue().unwrap();
        assert_eq!(out.request_id, "only");
        assert!(queue.is_empty());
    }

    #[test]
    fn position_reports_dispatch_order_not_insertion_order() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(entry("low", 10, 0));
        queue.enqueue(entry("high", 9000, 0));
        assert_eq!(queue.position("high").unwrap(), 0);
        assert_eq!(queue.position("low").unwrap(), 1);
    }

    #[test]
    fn snapshot_buckets_entries_by_tier() {
        let mut queue = PriorityQueue::new();
        queue.enqueue(entry("a", 10_000, 0));
        queue.enqueue(entry("b", 50, 0));
        queue.enqueue(entry("c", 0, 0));

        let snap = queue.snapshot();
        assert_eq!(snap.count(Tier::Master), 1);
        assert_eq!(snap.count(Tier::Bronze), 1);
        assert_eq!(snap.count(Tier::Unverified), 1);
        assert_eq!(snap.count(Tier::Gold), 0);
    }
}
