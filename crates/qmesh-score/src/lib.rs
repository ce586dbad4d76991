// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Per-worker contribution scoring: the request-level scoring rubric,
//! worker levels, one-time achievements, and the manager that applies
//! outcomes to a persisted `ScoreRecord`.

mod achievement;
mod error;
mod level;
mod manager;
mod record;

pub use achievement::Achievement;
pub use error::Error;
pub use level::Level;
pub use manager::{LeaderboardSnapshotRow, ScoreManager, LEADERBOARD_SNAPSHOT_LIMIT};
pub use record::{RequestOutcome, ScoreRecord};
