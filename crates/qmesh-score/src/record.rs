// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::achievement::Achievement;
use crate::level::Level;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The outcome of one processed request, the raw input to `requestScore`.
#[derive(Debug, Clone, Copy)]
pub struct RequestOutcome {
    pub success: bool,
    pub response_time_ms: f64,
    pub prompt_length: usize,
    pub result_length: usize,
}

/// A worker's cumulative contribution record. Saved to the score store
/// after every update with a monotonically incrementing `version`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreRecord {
    pub worker_id: String,
    pub total_score: i64,
    pub level: Level,
    pub requests_processed: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: f64,
    pub success_rate: f64,
    pub achievements: HashSet<Achievement>,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub version: u64,
}

const FAILURE_PENALTY: i64 = 1;

impl ScoreRecord {
    pub fn new(worker_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            worker_id: worker_id.into(),
            total_score: 0,
            level: Level::Bronze,
            requests_processed: 0,
            successful_requests: 0,
            failed_requests: 0,
            average_response_time_ms: 0.0,
            success_rate: 0.0,
            achievements: HashSet::new(),
            start_time: now,
            last_updated: now,
            version: 0,
        }
    }

    /// `Speed` (0-5) + `Complexity` (0-3) + `Quality` (0-3) as defined by
    /// the per-request scoring rubric.
    pub fn request_score(outcome: &RequestOutcome) -> i64 {
        let speed = if outcome.response_time_ms <= 500.0 {
            5
        } else if outcome.response_time_ms <= 1_000.0 {
            4
        } else if outcome.response_time_ms <= 2_000.0 {
            3
        } else if outcome.response_time_ms <= 3_000.0 {
            2
        } else if outcome.response_time_ms <= 5_000.0 {
            1
        } else {
            0
        };

        let complexity = ((outcome.prompt_length / 50) as i64).min(3);

        let quality = if outcome.success {
            2 + if outcome.result_length > 100 { 1 } else { 0 }
        } else {
            0
        };

        speed + complexity + quality
    }

    /// Apply one request's outcome: update counters, `totalScore`,
    /// rolling averages, `level`, and newly-earned achievements.
    /// Returns the achievements newly earned by this call (empty if
    /// none), so callers can log or notify without re-deriving the diff.
    pub fn apply_outcome(&mut self, outcome: RequestOutcome) -> Vec<Achievement> {
        self.requests_processed += 1;

        if outcome.success {
            self.successful_requests += 1;
            self.total_score += Self::request_score(&outcome);
        } else {
            self.failed_requests += 1;
            self.total_score -= FAILURE_PENALTY;
        }

        self.average_response_time_ms = ((self.average_response_time_ms
            * (self.requests_processed - 1) as f64)
            + outcome.response_time_ms)
            / self.requests_processed as f64;

        self.success_rate =
            self.successful_requests as f64 / self.requests_processed as f64 * 100.0;

        self.level = Level::from_score(self.total_score);

        let newly_earned = self.evaluate_achievements();
        for achievement in &newly_earned {
            self.total_score += achievement.bonus();
        }
        if !newly_earned.is_empty() {
            self.level = Level::from_score(self.total_score);
        }

        self.last_updated = Utc::now();
        self.version += 1;

        newly_earned
    }

    fn evaluate_achievements(&mut self) -> Vec<Achievement> {
        let mut earned = Vec::new();
        let uptime = Utc::now().signed_duration_since(self.start_time);

        let candidates = [
            (
                Achievement::SpeedDemon,
                self.requests_processed >= 10 && self.average_response_time_ms < 500.0,
            ),
            (Achievement::Centurion, self.requests_processed >= 100),
            (
                Achievement::Perfectionist,
                self.requests_processed >= 20 && self.success_rate >= 100.0,
            ),
            (Achievement::Marathoner, uptime.num_hours() >= 24),
        ];

        for (achievement, met) in candidates {
            if met && self.achievements.insert(achievement) {
                earned.push(achievement);
            }
        }

        earned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(success: bool, response_time_ms: f64, prompt_length: usize, result_length: usize) -> RequestOutcome {
        RequestOutcome {
            success,
            response_time_ms,
            prompt_length,
            result_length,
        }
    }

    #[test]
    fn request_score_caps_complexity_at_three() {
        let fast_long_success = outcome(true, 400.0, 500, 200);
        assert_eq!(ScoreRecord::request_score(&fast_long_success), 5 + 3 + 3);
    }

    #[test]
    fn failed_requests_score_zero_quality_and_apply_penalty() {
        let mut record = ScoreRecord::new("w1");
        record.apply_outcome(outcome(false, 100.0, 10, 0));
        assert_eq!(record.total_score, -1);
        assert_eq!(record.failed_requests, 1);
    }

    #[test]
    fn achievements_are_never_awarded_twice() {
        let mut record = ScoreRecord::new("w1");
        for _ in 0..15 {
            record.apply_outcome(outcome(true, 100.0, 10, 50));
        }
        assert!(record.achievements.contains(&Achievement::SpeedDemon));

        let score_after_first_award = record.total_score;
        let earned_again = record.apply_outcome(outcome(true, 100.0, 10, 50));
        assert!(!earned_again.contains(&Achievement::SpeedDemon));
        assert!(record.total_score > score_after_first_award);
    }

    #[test]
    fn level_tracks_total_score_after_bonuses() {
        let mut record = ScoreRecord::new("w1");
        for _ in 0..100 {
            record.apply_outcome(outcome(true, 100.0, 500, 200));
        }
        assert!(record.achievements.contains(&Achievement::Centurion));
        assert_eq!(record.level, Level::from_score(record.total_score));
    }
}
