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

    #[error(transparent)]
    Adapter(#[from] qmesh_adapter::Error),

    #[error(transparent)]
    Store(#[from] qmesh_store::Error),

    #[error(transparent)]
    Score(#[from] qmesh_score::Error),

    #[error("not ready")]
    NotReady,
}
