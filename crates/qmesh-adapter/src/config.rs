// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// How to launch and reach the inference subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub engine_command: PathBuf,
    pub model_path: PathBuf,
    pub port: u16,
    #[serde(default)]
    pub extra_args: Vec<String>,
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
    #[serde(default = "default_health_poll_interval_ms")]
    pub health_poll_interval_ms: u64,
    #[serde(default = "default_max_restarts")]
    pub max_restarts: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_stop_grace_period_secs")]
    pub stop_grace_period_secs: u64,
}

fn default_startup_timeout_secs() -> u64 {
    60
}

fn default_health_poll_interval_ms() -> u64 {
    250
}

fn default_max_restarts() -> u32 {
    3
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_stop_grace_period_secs() -> u64 {
    10
}

impl AdapterConfig {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn health_poll_interval(&self) -> Duration {
        Duration::from_millis(self.health_poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn stop_grace_period(&self) -> Duration {
        Duration::from_secs(self.stop_grace_period_secs)
    }
}
