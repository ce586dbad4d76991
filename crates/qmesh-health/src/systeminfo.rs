// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! System resource sampling using the `sysinfo` crate.

use once_cell::sync::Lazy;
use std::sync::Mutex;
use sysinfo::System;

static SYSTEM: Lazy<Mutex<System>> = Lazy::new(|| Mutex::new(System::new_all()));

/// A point-in-time resource sample for the whole machine this worker runs
/// on (not just this process -- admission needs to know how loaded the
/// host is, per §4.2).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSample {
    pub cpu_pct: f32,
    pub mem_pct: f32,
}

/// Refresh the global `System` and return the current CPU/memory load.
/// The first call always reports `cpu_pct = 0.0`: `sysinfo` needs two
/// samples separated in time to compute a CPU delta.
pub fn sample() -> SystemSample {
    let mut system = match SYSTEM.lock() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("failed to lock system info: {}", e);
            return SystemSample::default();
        }
    };

    system.refresh_cpu_usage();
    system.refresh_memory();

    let cpu_pct = if system.cpus().is_empty() {
        0.0
    } else {
        system.cpus().iter().map(|c| c.cpu_usage()).sum::<f32>() / system.cpus().len() as f32
    };

    let total = system.total_memory();
    let mem_pct = if total > 0 {
        ((total - system.available_memory()) as f64 / total as f64 * 100.0) as f32
    } else {
        0.0
    };

    SystemSample { cpu_pct, mem_pct }
}
