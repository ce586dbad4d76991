// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use sha2::{Digest, Sha256};
use std::fmt::{self, Display};

/// A 32-byte overlay key, derived as the SHA-256 digest of a well-known
/// topic string. Two processes that join with the same topic string will
/// derive the same key and can discover one another.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic([u8; 32]);

impl Topic {
    pub fn derive(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();

        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);

        Topic(key)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(self) -> String {
        hex::encode(self.0)
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Topic({}…)", &self.to_hex()[..8])
    }
}

/// Well-known topic strings for the two overlays the core uses.
pub const INFERENCE_TOPIC: &str = "qmesh-inference-network-v1";
pub const SCORE_TOPIC: &str = "qmesh-scores-network-v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_derives_same_topic() {
        assert_eq!(
            Topic::derive(INFERENCE_TOPIC),
            Topic::derive(INFERENCE_TOPIC)
        );
    }

    #[test]
    fn different_names_derive_different_topics() {
        assert_ne!(Topic::derive(INFERENCE_TOPIC), Topic::derive(SCORE_TOPIC));
    }

    #[test]
    fn topic_hex_is_64_chars() {
        assert_eq!(Topic::derive(INFERENCE_TOPIC).to_hex().len(), 64);
    }
}
