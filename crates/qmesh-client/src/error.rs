// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("toml error: {0}")]
    Toml(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Overlay(#[from] qmesh_overlay::Error),

    /// Overlay join completed but no inference worker answered a status
    /// query within the discovery window (§5's `no-workers-found`).
    #[error("no workers found")]
    NoWorkersFound,

    /// `selectBest`/random selection found no ready peer to route to.
    #[error("no ready worker available")]
    NoReadyWorker,

    /// The in-flight request's deadline elapsed before a reply arrived.
    #[error("request timed out")]
    Timeout,

    /// The worker replied with a structured `error` message.
    #[error("worker error: {0}")]
    WorkerError(String),

    /// The chosen peer disconnected before a reply could be sent.
    #[error("worker disconnected")]
    WorkerDisconnected,
}
