// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// The five-state step function over `healthScore`. Ordering matters:
/// variants are declared from least to most loaded so a numeric cast
/// (`as u8`) ranks them, which the dynamic-capacity table below depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    Idle,
    Light,
    Moderate,
    Busy,
    Overloaded,
}

impl HealthState {
    /// `idle` above 80, `light` above 60, `moderate` above 40, `busy`
    /// above 20, `overloaded` otherwise. These thresholds are design
    /// contracts, not tuning knobs.
    pub fn from_score(health_score: f64) -> Self {
        if health_score > 80.0 {
            HealthState::Idle
        } else if health_score > 60.0 {
            HealthState::Light
        } else if health_score > 40.0 {
            HealthState::Moderate
        } else if health_score > 20.0 {
            HealthState::Busy
        } else {
            HealthState::Overloaded
        }
    }

    /// Shrink the effective queue bound under load, never below the
    /// listed floor for that state.
    pub fn dynamic_capacity(self, base: usize) -> usize {
        let (factor, floor): (f64, usize) = match self {
            HealthState::Idle => (1.0, base),
            HealthState::Light => (0.8, 3),
            HealthState::Moderate => (0.6, 2),
            HealthState::Busy => (0.4, 1),
            HealthState::Overloaded => (0.0, 0),
        };

        ((base as f64 * factor).floor() as usize).max(floor.min(base))
    }
}

impl Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HealthState::Idle => "idle",
            HealthState::Light => "light",
            HealthState::Moderate => "moderate",
            HealthState::Busy => "busy",
            HealthState::Overloaded => "overloaded",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_boundaries_match_the_step_function() {
        assert_eq!(HealthState::from_score(100.0), HealthState::Idle);
        assert_eq!(HealthState::from_score(80.1), HealthState::Idle);
        assert_eq!(HealthState::from_score(80.0), HealthState::Light);
        assert_eq!(HealthState::from_score(60.0), HealthState::Moderate);
        assert_eq!(HealthState::from_score(40.0), HealthState::Busy);
        assert_eq!(HealthState::from_score(20.0), HealthState::Overloaded);
        assert_eq!(HealthState::from_score(0.0), HealthState::Overloaded);
    }

    #[test]
    fn dynamic_capacity_applies_the_documented_factors() {
        assert_eq!(HealthState::Idle.dynamic_capacity(10), 10);
        assert_eq!(HealthState::Light.dynamic_capacity(10), 8);
        assert_eq!(HealthState::Moderate.dynamic_capacity(10), 6);
        assert_eq!(HealthState::Busy.dynamic_capacity(10), 4);
        assert_eq!(HealthState::Overloaded.dynamic_capacity(10), 0);
    }

    #[test]
    fn dynamic_capacity_never_drops_below_the_floor_for_small_bases() {
        assert_eq!(HealthState::Light.dynamic_capacity(2), 2);
        assert_eq!(HealthState::Moderate.dynamic_capacity(1), 1);
    }
}
