// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use chrono::{DateTime, Utc};
use qmesh_health::HealthState;
use serde::{Deserialize, Serialize};

/// What one peer gossips about itself on the score overlay: its
/// reputation and its current load. The registry stores one of these per
/// `workerId`, replacing the previous entry on each non-stale update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerRecord {
    pub worker_id: String,
    pub total_score: i64,
    pub success_rate: f64,
    pub health_score: f64,
    pub state: HealthState,
    pub queue_size: usize,
    pub queue_capacity: usize,
    pub accepting: bool,
    /// Set by the originating peer; used for anti-reorder on `updatePeer`.
    pub timestamp: DateTime<Utc>,
}

impl PeerRecord {
    pub fn has_headroom(&self) -> bool {
        self.queue_size < self.queue_capacity
    }

    pub fn is_available(&self) -> bool {
        self.accepting && self.has_headroom() && self.state != HealthState::Overloaded
    }
}
