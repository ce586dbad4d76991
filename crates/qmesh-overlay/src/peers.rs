// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::connection::PeerHandle;
use crate::events::PeerId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared, cloneable registry of the peers currently connected on one
/// overlay topic. Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct PeerTable {
    inner: Arc<RwLock<HashMap<PeerId, PeerHandle>>>,
}

impl PeerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, peer: PeerId, handle: PeerHandle) {
        self.inner.write().await.insert(peer, handle);
    }

    pub async fn remove(&self, peer: &PeerId) {
        self.inner.write().await.remove(peer);
    }

    /// Drop every peer handle, closing each outbound sender so its
    /// writer task exits.
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }

    pub async fn get(&self, peer: &PeerId) -> Option<PeerHandle> {
        self.inner.read().await.get(peer).cloned()
    }

    pub async fn ids(&self) -> Vec<PeerId> {
        self.inner.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn handles(&self) -> Vec<PeerHandle> {
        self.inner.read().await.values().cloned().collect()
    }
}
