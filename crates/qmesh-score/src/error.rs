// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Store(#[from] qmesh_store::Error),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}
