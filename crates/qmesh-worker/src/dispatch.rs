// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use qmesh_health::HealthSnapshot;
use qmesh_health::HealthState;
use qmesh_overlay::PeerId;

/// An admitted inference request, queued against the connection it
/// arrived on so a reply can be sent once dispatched (or dropped if that
/// connection is gone by the time its turn comes).
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub peer: PeerId,
    pub prompt: String,
    pub sender_id: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub submitted_at: DateTime<Utc>,
}

/// `Monitor.acceptingWork(queueLen, capacity)`: whether the worker should
/// admit one more request, given its last health snapshot and the
/// dynamically-shrunk queue bound for the current state.
pub fn accepting_work(queue_len: usize, snapshot: &HealthSnapshot, base_capacity: usize) -> bool {
    snapshot.state != HealthState::Overloaded
        && queue_len < snapshot.dynamic_capacity(base_capacity)
        && snapshot.cpu_pct <= 90.0
        && snapshot.mem_pct <= 90.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(cpu: f64, mem: f64, queue_size: usize, queue_capacity: usize) -> HealthSnapshot {
        HealthSnapshot::compute(cpu, mem, queue_size, queue_capacity, 0.0)
    }

    #[test]
    fn idle_worker_with_room_accepts() {
        let snap = snapshot(10.0, 10.0, 0, 10);
        assert!(accepting_work(0, &snap, 10));
    }

    #[test]
    fn queue_at_dynamic_bound_refuses_even_if_healthy() {
        let snap = snapshot(10.0, 10.0, 0, 10);
        assert!(!accepting_work(10, &snap, 10));
    }

    #[test]
    fn overloaded_state_never_accepts() {
        let snap = snapshot(95.0, 95.0, 0, 10);
        assert!(!accepting_work(0, &snap, 10));
    }
}
