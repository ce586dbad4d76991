// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use anyhow::Error as AnyError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    IO(#[from] std::io::Error),

    #[error("{0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Any(#[from] AnyError),

    #[error("inference subprocess exited during startup with status {0:?}")]
    ProcessDiedDuringStartup(Option<i32>),

    #[error("inference subprocess did not become healthy within {0:?}")]
    StartupTimedOut(std::time::Duration),

    #[error("inference subprocess is not running")]
    NotRunning,

    #[error("exceeded {0} consecutive restart attempts")]
    RestartLimitExceeded(u32),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}
