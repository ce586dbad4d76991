// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Resource and queue-pressure sampling for a qmesh worker: turns raw CPU,
//! memory, and queue occupancy into a bounded `HealthSnapshot` the
//! admission path and the score gossip both read from.

mod error;
mod monitor;
mod snapshot;
mod state;
mod systeminfo;
mod timing;

pub use error::Error;
pub use monitor::{HealthMonitor, DEFAULT_SAMPLE_INTERVAL};
pub use snapshot::HealthSnapshot;
pub use state::HealthState;
pub use systeminfo::{sample, SystemSample};
