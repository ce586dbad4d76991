// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Cross-checks a request's sender-claimed contribution score against
//! the Global Score Registry before it is used to set admission
//! priority.

use qmesh_registry::Registry;

/// Scores claimed and verified are allowed to diverge by this much
/// before the verified value is trusted over the claim.
const DIVERGENCE_TOLERANCE: i64 = 100;

/// The ceiling applied to an unverified sender's claimed score (the
/// top of the Bronze tier -- see `qmesh_queue::Tier`).
pub const UNVERIFIED_CEILING: i64 = 100;

/// Resolve the effective priority to admit a request at, given what the
/// sender claims and (if known) what the registry has verified for them.
pub fn effective_priority(sender_id: Option<&str>, claimed: i64, registry: &Registry) -> i64 {
    let Some(sender_id) = sender_id else {
        return 0;
    };

    match registry
        .get_leaderboard(usize::MAX)
        .into_iter()
        .find(|entry| entry.record.worker_id == sender_id)
    {
        Some(entry) => {
            let verified = entry.record.total_score;
            if (claimed - verified).abs() <= DIVERGENCE_TOLERANCE {
                claimed
            } else {
                tracing::warn!(
                    sender_id,
                    claimed,
                    verified,
                    "claimed score diverges from registry, using verified value"
                );
                verified
            }
        }
        None if claimed > 0 => claimed.min(UNVERIFIED_CEILING),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qmesh_health::HealthState;
    use qmesh_registry::PeerRecord;

    fn registry_with(worker_id: &str, total_score: i64) -> Registry {
        let registry = Registry::new();
        registry.update_peer(PeerRecord {
            worker_id: worker_id.to_owned(),
            total_score,
            success_rate: 100.0,
            health_score: 90.0,
            state: HealthState::Idle,
            queue_size: 0,
            queue_capacity: 5,
            accepting: true,
            timestamp: Utc::now(),
        });
        registry
    }

    #[test]
    fn no_sender_id_means_unverified_zero_priority() {
        let registry = Registry::new();
        assert_eq!(effective_priority(None, 5000, &registry), 0);
    }

    #[test]
    fn close_claim_is_trusted() {
        let registry = registry_with("alice", 200);
        assert_eq!(effective_priority(Some("alice"), 250, &registry), 250);
    }

    #[test]
    fn divergent_claim_falls_back_to_verified() {
        let registry = registry_with("alice", 200);
        assert_eq!(effective_priority(Some("alice"), 5000, &registry), 200);
    }

    #[test]
    fn unknown_sender_claiming_positive_score_is_capped_at_bronze_ceiling() {
        let registry = Registry::new();
        assert_eq!(effective_priority(Some("mallory"), 10_001, &registry), 100);
    }

    #[test]
    fn unknown_sender_claiming_zero_stays_zero() {
        let registry = Registry::new();
        assert_eq!(effective_priority(Some("mallory"), 0, &registry), 0);
    }
}
