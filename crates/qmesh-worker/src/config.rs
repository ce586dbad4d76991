// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::Error;
use qmesh_adapter::AdapterConfig;
use qmesh_overlay::OverlayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a worker process needs to join both overlays, manage its
/// inference subprocess, and persist its score history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub identity_path: PathBuf,
    pub store_path: Option<PathBuf>,
    pub inference_overlay: OverlayConfig,
    pub score_overlay: OverlayConfig,
    pub adapter: AdapterConfig,
    #[serde(default = "default_base_queue_capacity")]
    pub base_queue_capacity: usize,
    #[serde(default = "default_score_broadcast_secs")]
    pub score_broadcast_secs: u64,
}

fn default_base_queue_capacity() -> usize {
    10
}

fn default_score_broadcast_secs() -> u64 {
    30
}

impl WorkerConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        Ok(qmesh_overlay::load(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        Ok(qmesh_overlay::save(self, path)?)
    }
}
