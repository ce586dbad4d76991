// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Admission, single-threaded dispatch, and score gossip for one qmesh
//! inference worker: the glue between the overlay transport, the health
//! monitor, the priority queue, the inference subprocess adapter, the
//! local score manager, and the global score registry.

mod config;
mod dispatch;
mod error;
mod identity;
mod worker;

pub use config::WorkerConfig;
pub use dispatch::{accepting_work, PendingRequest};
pub use error::Error;
pub use identity::WorkerIdentity;
pub use worker::Worker;
