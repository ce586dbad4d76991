// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::Error;
use qmesh_overlay::OverlayConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Everything a client process needs to join both overlays and route
/// prompts to workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub identity_path: PathBuf,
    pub inference_overlay: OverlayConfig,
    pub score_overlay: OverlayConfig,
    /// This client's self-claimed contribution score, sent as
    /// `senderScore` on every request. A worker may trust it, discount
    /// it against the registry, or cap it -- see `qmesh_verify`.
    #[serde(default)]
    pub claimed_score: i64,
    #[serde(default = "default_smart_routing")]
    pub smart_routing: bool,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_discovery_timeout_secs")]
    pub discovery_timeout_secs: u64,
    #[serde(default = "default_health_refresh_secs")]
    pub health_refresh_secs: u64,
    #[serde(default = "default_max_batch_concurrency")]
    pub max_batch_concurrency: usize,
}

fn default_smart_routing() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_discovery_timeout_secs() -> u64 {
    30
}

fn default_health_refresh_secs() -> u64 {
    30
}

fn default_max_batch_concurrency() -> usize {
    5
}

impl ClientConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        Ok(qmesh_overlay::load(path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), Error> {
        Ok(qmesh_overlay::save(self, path)?)
    }
}
