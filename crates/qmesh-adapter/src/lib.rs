// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Mediates the inference subprocess's lifecycle (spawn, health-poll,
//! restart, stop) and its loopback HTTP API (completion, streaming
//! completion, chat).

mod adapter;
mod client;
mod config;
mod error;
mod process;

pub use adapter::InferenceAdapter;
pub use client::{ChatMessage, EngineClient, GenerateOptions, GenerateResult};
pub use config::AdapterConfig;
pub use error::Error;
