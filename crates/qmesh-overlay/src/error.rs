// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::Error as AnyError;
use std::io::Error as IOError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    IO(#[from] IOError),

    #[error("{0}")]
    Any(#[from] AnyError),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Toml(String),

    #[error("frame of {0} bytes exceeds the maximum of {1} bytes")]
    FrameTooLarge(usize, usize),

    #[error("no peer with id {0}")]
    UnknownPeer(String),

    #[error("overlay join for topic {0} timed out with no peers reachable")]
    JoinTimedOut(String),

    #[error("{0}")]
    Misconfigured(String),
}
