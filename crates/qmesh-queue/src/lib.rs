// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! A priority-ordered admission queue keyed by contribution-score tier.

mod error;
mod queue;
mod tier;

pub use error::Error;
pub use queue::{PriorityQueue, QueueEntry, TierHistogram};
pub use tier::Tier;
