// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A named band of contribution score controlling admission priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub enum Tier {
    Unverified,
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
    Master,
}

impl Tier {
    /// Highest tier whose minimum score does not exceed `score`.
    pub fn from_score(score: i64) -> Self {
        if score >= 10_000 {
            Tier::Master
        } else if score >= 4_000 {
            Tier::Diamond
        } else if score >= 1_500 {
            Tier::Platinum
        } else if score >= 500 {
            Tier::Gold
        } else if score >= 100 {
            Tier::Silver
        } else if score >= 1 {
            Tier::Bronze
        } else {
            Tier::Unverified
        }
    }

    pub fn minimum_score(self) -> i64 {
        match self {
            Tier::Master => 10_000,
            Tier::Diamond => 4_000,
            Tier::Platinum => 1_500,
            Tier::Gold => 500,
            Tier::Silver => 100,
            Tier::Bronze => 1,
            Tier::Unverified => 0,
        }
    }

    pub const ALL: [Tier; 7] = [
        Tier::Master,
        Tier::Diamond,
        Tier::Platinum,
        Tier::Gold,
        Tier::Silver,
        Tier::Bronze,
        Tier::Unverified,
    ];
}

impl Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Master => "master",
            Tier::Diamond => "diamond",
            Tier::Platinum => "platinum",
            Tier::Gold => "gold",
            Tier::Silver => "silver",
            Tier::Bronze => "bronze",
            Tier::Unverified => "unverified",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_match_the_minimum_score_table() {
        assert_eq!(Tier::from_score(10_000), Tier::Master);
        assert_eq!(Tier::from_score(9_999), Tier::Diamond);
        assert_eq!(Tier::from_score(4_000), Tier::Diamond);
        assert_eq!(Tier::from_score(1_500), Tier::Platinum);
        assert_eq!(Tier::from_score(500), Tier::Gold);
        assert_eq!(Tier::from_score(100), Tier::Silver);
        assert_eq!(Tier::from_score(1), Tier::Bronze);
        assert_eq!(Tier::from_score(0), Tier::Unverified);
    }
}
