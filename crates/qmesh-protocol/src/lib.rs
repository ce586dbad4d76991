// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Wire messages exchanged over the two overlays. Both the worker and
//! the client decode the overlay's `Message` payload (a
//! `serde_json::Value`) into one of these via the `type` tag. Kept in
//! its own crate so the client binary can speak the protocol without
//! linking the worker's admission, dispatch, and adapter machinery.

use qmesh_registry::PeerRecord;
use qmesh_score::{Achievement, Level};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InferenceMessage {
    Status,
    StatusResponse {
        worker_id: String,
        ready: bool,
        requests_processed: u64,
        queue_length: usize,
        score: i64,
        level: Level,
        rank: Option<usize>,
        achievements: Vec<Achievement>,
    },
    Inference {
        request_id: String,
        prompt: String,
        #[serde(default)]
        sender_id: Option<String>,
        #[serde(default)]
        sender_score: i64,
        #[serde(default)]
        max_tokens: Option<u32>,
        #[serde(default)]
        temperature: Option<f32>,
    },
    InferenceResult {
        request_id: String,
        result: String,
        worker_id: String,
    },
    Error {
        request_id: Option<String>,
        error: String,
        #[serde(default)]
        retry: bool,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScoreMessage {
    ScoreAnnounce { data: PeerRecord },
    ScoreRequest { worker_id: Option<String> },
    ScoreResponse { data: PeerRecord },
    LeaderboardSync { scores: Vec<PeerRecord> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use qmesh_health::HealthState;

    fn sample_record() -> PeerRecord {
        PeerRecord {
            worker_id: "w1".to_string(),
            total_score: 1000,
            success_rate: 98.0,
            health_score: 80.0,
            state: HealthState::Idle,
            queue_size: 0,
            queue_capacity: 10,
            accepting: true,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn inference_message_round_trips_through_json() {
        let message = InferenceMessage::Inference {
            request_id: "r1".to_string(),
            prompt: "2+2?".to_string(),
            sender_id: Some("alice".to_string()),
            sender_score: 250,
            max_tokens: Some(64),
            temperature: None,
        };

        let value = serde_json::to_value(&message).unwrap();
        let decoded: InferenceMessage = serde_json::from_value(value).unwrap();

        match decoded {
            InferenceMessage::Inference { request_id, prompt, .. } => {
                assert_eq!(request_id, "r1");
                assert_eq!(prompt, "2+2?");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn score_announce_round_trips_through_json() {
        let message = ScoreMessage::ScoreAnnounce { data: sample_record() };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "score_announce");
        let decoded: ScoreMessage = serde_json::from_value(value).unwrap();
        match decoded {
            ScoreMessage::ScoreAnnounce { data } => assert_eq!(data.worker_id, "w1"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn error_reply_carries_optional_request_id_and_retry_flag() {
        let message = InferenceMessage::Error {
            request_id: None,
            error: "worker-overloaded".to_string(),
            retry: true,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["retry"], true);
        assert!(value["request_id"].is_null());
    }
}
