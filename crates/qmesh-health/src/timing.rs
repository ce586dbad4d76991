// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Rolling window of recent response times, for diagnostic display only.

use std::collections::VecDeque;

const WINDOW_SIZE: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct ResponseTimeWindow {
    samples: VecDeque<f64>,
}

impl ResponseTimeWindow {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(WINDOW_SIZE),
        }
    }

    pub fn record(&mut self, duration_ms: f64) {
        if self.samples.len() == WINDOW_SIZE {
            self.samples.pop_front();
        }
        self.samples.push_back(duration_ms);
    }

    pub fn mean_ms(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn samples(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_only_the_last_ten_samples() {
        let mut window = ResponseTimeWindow::new();
        for i in 0..15 {
            window.record(i as f64);
        }
        assert_eq!(window.samples().len(), 10);
        assert_eq!(window.samples(), vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0, 14.0]);
    }
}
