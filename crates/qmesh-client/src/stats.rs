// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};

/// Per-client running totals, updated after every `sendPrompt` resolves
/// (successfully, by error, or by timeout).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ClientStats {
    pub requests_processed: u64,
    pub failed_requests: u64,
    pub timed_out_requests: u64,
    pub total_response_time_ms: f64,
}

impl ClientStats {
    pub fn average_response_time_ms(&self) -> f64 {
        if self.requests_processed == 0 {
            0.0
        } else {
            self.total_response_time_ms / self.requests_processed as f64
        }
    }

    pub(crate) fn record_success(&mut self, elapsed_ms: f64) {
        self.requests_processed += 1;
        self.total_response_time_ms += elapsed_ms;
    }

    pub(crate) fn record_failure(&mut self) {
        self.requests_processed += 1;
        self.failed_requests += 1;
    }

    pub(crate) fn record_timeout(&mut self) {
        self.requests_processed += 1;
        self.failed_requests += 1;
        self.timed_out_requests += 1;
    }
}
