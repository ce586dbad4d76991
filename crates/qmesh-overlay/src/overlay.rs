// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::client;
use crate::config::OverlayConfig;
use crate::events::{OverlayEvent, PeerId, Role};
use crate::peers::PeerTable;
use crate::server;
use crate::topic::Topic;
use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// A joined overlay: one topic, the peers currently connected on it, and
/// the background tasks that accept inbound connections and dial
/// configured bootstrap peers. Dropping the `Overlay` (or calling
/// `leave`) tears those tasks down.
pub struct Overlay {
    topic: Topic,
    peers: PeerTable,
    events_rx: Option<UnboundedReceiver<OverlayEvent>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Overlay {
    /// Join the overlay identified by `topic_name`, deriving its hash
    /// address and spinning up the listener (if `config.listen` is set)
    /// and one dial task per bootstrap address.
    pub async fn join(topic_name: &str, config: &OverlayConfig) -> Result<Self, crate::Error> {
        let topic = Topic::derive(topic_name);
        let peers = PeerTable::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let mut tasks = Vec::new();

        if let Some(listen) = config.listen {
            let topic_name = topic_name.to_owned();
            let max_frame_bytes = config.max_frame_bytes;
            let peers = peers.clone();
            let events_tx = events_tx.clone();

            tasks.push(tokio::spawn(async move {
                if let Err(e) = server::run(listen, topic_name, max_frame_bytes, peers, events_tx).await
                {
                    tracing::error!("overlay listener exited: {}", e);
                }
            }));
        }

        for addr in &config.bootstrap {
            let addr = *addr;
            let topic_name = topic_name.to_owned();
            let max_frame_bytes = config.max_frame_bytes;
            let peers = peers.clone();
            let events_tx = events_tx.clone();

            tasks.push(tokio::spawn(client::dial_with_retry(
                addr,
                topic_name,
                max_frame_bytes,
                peers,
                events_tx,
            )));
        }

        Ok(Self {
            topic,
            peers,
            events_rx: Some(events_rx),
            tasks: Mutex::new(tasks),
        })
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    /// Take ownership of the event stream. Can only be called once; the
    /// typical caller spawns a loop over this receiver immediately after
    /// joining.
    pub fn events(&mut self) -> Option<UnboundedReceiver<OverlayEvent>> {
        self.events_rx.take()
    }

    pub async fn peer_count(&self) -> usize {
        self.peers.len().await
    }

    pub async fn connected_peers(&self) -> Vec<PeerId> {
        self.peers.ids().await
    }

    /// Send a JSON-serializable message to one connected peer.
    pub async fn send<T: Serialize>(&self, peer: &PeerId, value: &T) -> Result<(), crate::Error> {
        let handle = self
            .peers
            .get(peer)
            .await
            .ok_or_else(|| crate::Error::UnknownPeer(peer.to_string()))?;

        handle.send_json(value)
    }

    /// Send a JSON-serializable message to every connected peer, skipping
    /// (but not failing for) peers whose outbound queue has closed.
    pub async fn broadcast<T: Serialize>(&self, value: &T) -> Result<(), crate::Error> {
        for handle in self.peers.handles().await {
            let _ = handle.send_json(value);
        }

        Ok(())
    }

    /// Tear down the listener and dial tasks, disconnecting from the
    /// topic, and drop every connected peer's handle so no further sends
    /// reach a closed connection. Takes `&self` rather than consuming the
    /// overlay so it can be called on a worker or router's shared
    /// `Arc<Overlay>` during shutdown.
    pub async fn leave(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.peers.clear().await;
    }

    pub fn role_for(listen_configured: bool, bootstrap_configured: bool) -> Role {
        match (listen_configured, bootstrap_configured) {
            (true, true) => Role::Both,
            (true, false) => Role::Server,
            (false, _) => Role::Client,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::net::SocketAddr;
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread")]
    async fn two_peers_exchange_a_message() {
        let listen: SocketAddr = "127.0.0.1:28471".parse().unwrap();

        let server_config = OverlayConfig::new(Some(listen), vec![]);
        let mut server = Overlay::join("qmesh-overlay-test", &server_config)
            .await
            .unwrap();
        let mut server_events = server.events().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let client_config = OverlayConfig::new(None, vec![listen]);
        let client = Overlay::join("qmesh-overlay-test", &client_config)
            .await
            .unwrap();

        let server_peer = loop {
            match server_events.recv().await.unwrap() {
                OverlayEvent::PeerConnected { peer, .. } => break peer,
                _ => continue,
            }
        };

        client
            .send(
                &client.connected_peers().await[0].clone(),
                &json!({"hello": "world"}),
            )
            .await
            .unwrap();

        let payload = loop {
            match server_events.recv().await.unwrap() {
                OverlayEvent::Message { peer, payload } if peer == server_peer => break payload,
                _ => continue,
            }
        };

        assert_eq!(payload, json!({"hello": "world"}));

        client.leave().await;
        server.leave().await;
    }
}
