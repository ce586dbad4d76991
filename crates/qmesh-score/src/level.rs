// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A worker's standing based on cumulative contribution score. Distinct
/// from `qmesh_queue::Tier`: this is the Score Manager's own banding,
/// used for display and achievement thresholds, not admission priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
}

impl Level {
    pub fn from_score(total_score: i64) -> Self {
        if total_score >= 10_000 {
            Level::Master
        } else if total_score >= 5_000 {
            Level::Diamond
        } else if total_score >= 1_000 {
            Level::Platinum
        } else if total_score >= 500 {
            Level::Gold
        } else if total_score >= 100 {
            Level::Silver
        } else {
            Level::Bronze
        }
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Master => "master",
            Level::Diamond => "diamond",
            Level::Platinum => "platinum",
            Level::Gold => "gold",
            Level::Silver => "silver",
            Level::Bronze => "bronze",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_boundaries_match_the_threshold_table() {
        assert_eq!(Level::from_score(10_000), Level::Master);
        assert_eq!(Level::from_score(5_000), Level::Diamond);
        assert_eq!(Level::from_score(1_000), Level::Platinum);
        assert_eq!(Level::from_score(500), Level::Gold);
        assert_eq!(Level::from_score(100), Level::Silver);
        assert_eq!(Level::from_score(99), Level::Bronze);
        assert_eq!(Level::from_score(0), Level::Bronze);
    }
}
