// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::state::HealthState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A computed health reading, cheap to clone and safe to gossip over the
/// score overlay or attach to an admission decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSnapshot {
    pub cpu_pct: f64,
    pub mem_pct: f64,
    pub queue_pct: f64,
    pub health_score: f64,
    pub state: HealthState,
    pub accepting: bool,
    pub queue_size: usize,
    pub queue_capacity: usize,
    pub mean_response_ms: f64,
    pub sampled_at: DateTime<Utc>,
}

impl HealthSnapshot {
    pub fn compute(
        cpu_pct: f64,
        mem_pct: f64,
        queue_size: usize,
        queue_capacity: usize,
        mean_response_ms: f64,
    ) -> Self {
        let queue_pct = if queue_capacity == 0 {
            100.0
        } else {
            (queue_size as f64 / queue_capacity as f64) * 100.0
        };

        let health_score =
            (0.4 * (100.0 - cpu_pct) + 0.4 * (100.0 - mem_pct) + 0.2 * (100.0 - queue_pct))
                .clamp(0.0, 100.0);

        let state = HealthState::from_score(health_score);

        let accepting = state != HealthState::Overloaded
            && queue_size < queue_capacity
            && cpu_pct <= 90.0
            && mem_pct <= 90.0;

        Self {
            cpu_pct,
            mem_pct,
            queue_pct,
            health_score,
            state,
            accepting,
            queue_size,
            queue_capacity,
            mean_response_ms,
            sampled_at: Utc::now(),
        }
    }

    pub fn dynamic_capacity(&self, base: usize) -> usize {
        self.state.dynamic_capacity(base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthy_idle_worker_accepts() {
        let snap = HealthSnapshot::compute(5.0, 10.0, 0, 10, 0.0);
        assert_eq!(snap.state, HealthState::Idle);
        assert!(snap.accepting);
    }

    #[test]
    fn full_queue_is_overloaded_even_with_good_health_score() {
        let snap = HealthSnapshot::compute(5.0, 5.0, 10, 10, 0.0);
        assert!(!snap.accepting, "queue at capacity must never accept");
    }

    #[test]
    fn high_cpu_refuses_admission_regardless_of_state() {
        let snap = HealthSnapshot::compute(95.0, 5.0, 0, 10, 0.0);
        assert!(!snap.accepting);
    }

    #[test]
    fn health_score_matches_the_weighted_formula() {
        let snap = HealthSnapshot::compute(20.0, 30.0, 2, 10, 0.0);
        let expected = 0.4 * 80.0 + 0.4 * 70.0 + 0.2 * 80.0;
        assert!((snap.health_score - expected).abs() < 0.5);
    }
}
