// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::events::Role;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// First frame exchanged on every new connection. There is no peer-identity
/// authentication in this design (spec.md §1 Non-goals): the public key is
/// simply a random per-connection value used to derive a stable-for-the-
/// connection `PeerId`, not a credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    pub public_key: String,
    pub role: Role,
    pub topic: String,
}

impl Hello {
    pub fn new(role: Role, topic: &str) -> Self {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);

        Self {
            public_key: hex::encode(bytes),
            role,
            topic: topic.to_owned(),
        }
    }
}
