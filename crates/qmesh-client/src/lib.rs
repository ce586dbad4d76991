// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Discovery, smart routing, and in-flight request tracking for a qmesh
//! client: joins both overlays as a pure client, learns which inference
//! peers are ready from `status` replies, and picks the best one for
//! each prompt using the Global Score Registry's `selectBest` policy.

mod config;
mod error;
mod identity;
mod router;
mod stats;

pub use config::ClientConfig;
pub use error::Error;
pub use identity::ClientIdentity;
pub use router::{BatchResult, RequestOptions, Router};
pub use stats::ClientStats;
