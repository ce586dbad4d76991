// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! Hash-addressed overlay transport shared by the worker and client
//! binaries. Two processes that `Overlay::join` with the same topic
//! string derive the same 32-byte key and exchange length-prefixed JSON
//! frames over plain TCP -- there is no peer-identity authentication or
//! payload encryption, matching the network's stated non-goals.

mod client;
mod config;
mod connection;
mod error;
mod events;
mod frame;
mod handshake;
mod overlay;
mod peers;
mod server;
mod topic;

pub use config::{default_config_dir, load, save, OverlayConfig};
pub use error::Error;
pub use events::{OverlayEvent, PeerId, Role};
pub use frame::DEFAULT_MAX_FRAME_BYTES;
pub use overlay::Overlay;
pub use topic::{Topic, INFERENCE_TOPIC, SCORE_TOPIC};
