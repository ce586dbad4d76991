// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// A stable 128-bit opaque identifier, generated once per install and
/// reused as the logical `workerId` on both overlays. Never rotated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerIdentity(Uuid);

#[derive(Serialize, Deserialize)]
struct IdentityFile {
    worker_id: Uuid,
}

impl WorkerIdentity {
    /// Read the identity from `path`, generating and persisting a fresh
    /// one if no file exists yet.
    pub fn load_or_create(path: &Path) -> Result<Self, Error> {
        if path.exists() {
            let data = std::fs::read_to_string(path)?;
            let file: IdentityFile = toml::from_str(&data).map_err(|e| Error::Toml(e.to_string()))?;
            return Ok(Self(file.worker_id));
        }

        let identity = Self(Uuid::new_v4());

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = IdentityFile {
            worker_id: identity.0,
        };
        let data = toml::to_string_pretty(&file).map_err(|e| Error::Toml(e.to_string()))?;
        std::fs::write(path, data)?;

        Ok(identity)
    }

    pub fn as_hex(&self) -> String {
        self.0.simple().to_string()
    }
}

impl std::fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}
