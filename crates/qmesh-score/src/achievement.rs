// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A one-time, additive bonus awarded the first time a worker meets its
/// criteria. Once earned, an achievement is never awarded (or its bonus
/// applied) again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Achievement {
    /// At least 10 requests processed with an average response time
    /// under 500 ms.
    SpeedDemon,
    /// At least 100 requests processed.
    Centurion,
    /// At least 20 requests processed with a 100% success rate.
    Perfectionist,
    /// At least 24 hours of continuous uptime.
    Marathoner,
}

impl Achievement {
    pub fn bonus(self) -> i64 {
        match self {
            Achievement::SpeedDemon => 100,
            Achievement::Centurion => 200,
            Achievement::Perfectionist => 150,
            Achievement::Marathoner => 300,
        }
    }
}

impl Display for Achievement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Achievement::SpeedDemon => "speed-demon",
            Achievement::Centurion => "centurion",
            Achievement::Perfectionist => "perfectionist",
            Achievement::Marathoner => "marathoner",
        };
        write!(f, "{}", s)
    }
}
