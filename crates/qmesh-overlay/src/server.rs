// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::connection;
use crate::events::{OverlayEvent, PeerId, Role};
use crate::frame::{encode, FrameDecoder};
use crate::handshake::Hello;
use crate::peers::PeerTable;
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedSender;

/// Accept loop for one overlay topic. Runs until the listener is dropped
/// (which happens when the owning `Overlay::leave` aborts this task).
pub async fn run(
    listen: SocketAddr,
    topic: String,
    max_frame_bytes: usize,
    peers: PeerTable,
    events_tx: UnboundedSender<OverlayEvent>,
) -> Result<(), crate::Error> {
    let listener = TcpListener::bind(listen).await?;
    tracing::info!("overlay listening on {} for topic {}", listen, topic);

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("accept failed: {}", e);
                continue;
            }
        };

        let topic = topic.clone();
        let peers = peers.clone();
        let events_tx = events_tx.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_incoming(stream, addr, topic, max_frame_bytes, peers, events_tx).await
            {
                tracing::debug!("incoming connection from {} failed: {}", addr, e);
            }
        });
    }
}

async fn handle_incoming(
    mut stream: tokio::net::TcpStream,
    addr: SocketAddr,
    topic: String,
    max_frame_bytes: usize,
    peers: PeerTable,
    events_tx: UnboundedSender<OverlayEvent>,
) -> Result<(), crate::Error> {
    let our_hello = Hello::new(Role::Server, &topic);
    let body = serde_json::to_vec(&our_hello)?;
    stream.write_all(&encode(&body)).await?;

    let mut decoder = FrameDecoder::new(max_frame_bytes);
    let mut buf = [0u8; 4096];

    let their_hello: Hello = loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(crate::Error::Misconfigured(format!(
                "peer {} disconnected during handshake",
                addr
            )));
        }

        let frames = decoder.push(&buf[..n])?;
        if let Some(frame) = frames.into_iter().next() {
            break serde_json::from_slice(&frame)?;
        }
    };

    if their_hello.topic != topic {
        return Err(crate::Error::Misconfigured(format!(
            "peer {} joined the wrong topic: expected {}, got {}",
            addr, topic, their_hello.topic
        )));
    }

    let peer_id = PeerId::from_public_key(&their_hello.public_key);
    let (handle, _disconnected) = connection::spawn(
        stream,
        peer_id.clone(),
        their_hello.public_key.clone(),
        max_frame_bytes,
        peers.clone(),
        events_tx.clone(),
    );

    peers.insert(peer_id.clone(), handle).await;

    let _ = events_tx.send(OverlayEvent::PeerConnected {
        peer: peer_id,
        public_key: their_hello.public_key,
        role: their_hello.role,
    });

    Ok(())
}
