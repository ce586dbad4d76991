// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{self, Display};

/// The role a peer plays when joining a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Server,
    Client,
    Both,
}

impl Role {
    pub fn listens(self) -> bool {
        matches!(self, Role::Server | Role::Both)
    }

    pub fn dials(self) -> bool {
        matches!(self, Role::Client | Role::Both)
    }
}

/// Handle identifying a peer within one overlay connection. Derived from
/// the connection's per-session public key (see `handshake::Hello`); valid
/// only for the lifetime of the underlying connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub String);

impl Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PeerId {
    /// The public key is hex-encoded; the PeerID is its first 16 hex
    /// characters (8 bytes of entropy -- enough to avoid collisions among
    /// the handful of peers in one overlay, per spec.md PeerEndpoint).
    pub fn from_public_key(public_key_hex: &str) -> Self {
        let prefix: String = public_key_hex.chars().take(16).collect();
        PeerId(prefix)
    }
}

#[derive(Debug, Clone)]
pub enum OverlayEvent {
    PeerConnected {
        peer: PeerId,
        public_key: String,
        role: Role,
    },
    PeerDisconnected {
        peer: PeerId,
    },
    PeerError {
        peer: PeerId,
        error: String,
    },
    Message {
        peer: PeerId,
        payload: Value,
    },
}
