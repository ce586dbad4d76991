// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::error::Error;
use crate::frame::DEFAULT_MAX_FRAME_BYTES;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Per-overlay configuration: where to listen (if this process serves
/// peers), which bootstrap addresses to dial, and frame limits.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct OverlayConfig {
    pub listen: Option<SocketAddr>,
    #[serde(default)]
    pub bootstrap: Vec<SocketAddr>,
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_max_frame_bytes() -> usize {
    DEFAULT_MAX_FRAME_BYTES
}

impl OverlayConfig {
    pub fn new(listen: Option<SocketAddr>, bootstrap: Vec<SocketAddr>) -> Self {
        Self {
            listen,
            bootstrap,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn add_peer(&mut self, addr: SocketAddr) {
        if !self.bootstrap.contains(&addr) {
            self.bootstrap.push(addr);
        }
    }

    pub fn remove_peer(&mut self, addr: &SocketAddr) {
        self.bootstrap.retain(|a| a != addr);
    }
}

/// Load a TOML-serialized config from disk.
pub fn load<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, Error> {
    let data = std::fs::read_to_string(path)?;
    toml::from_str(&data).map_err(|e| Error::Toml(e.to_string()))
}

/// Save a TOML-serialized config to disk, creating the parent directory
/// if needed.
pub fn save<T: Serialize>(value: &T, path: &Path) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let data = toml::to_string_pretty(value).map_err(|e| Error::Toml(e.to_string()))?;
    std::fs::write(path, data)?;
    Ok(())
}

/// Default config directory for a named service, following the platform
/// data-dir convention.
pub fn default_config_dir(service: &str) -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("qmesh")
        .join(service)
}
