// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! The client-side and gossip-aggregation view of every peer's score and
//! health: a staleness-evicting table with the leaderboard and
//! worker-selection helpers the client router needs.

mod record;
mod registry;

pub use record::PeerRecord;
pub use registry::{
    LeaderboardEntry, NetworkStats, Registry, DEFAULT_SWEEP_INTERVAL, STALENESS_WINDOW,
};
