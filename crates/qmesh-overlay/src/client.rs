// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::connection;
use crate::events::{OverlayEvent, PeerId, Role};
use crate::frame::{encode, FrameDecoder};
use crate::handshake::Hello;
use crate::peers::PeerTable;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;

/// Dial one bootstrap peer, retrying with backoff until it accepts or the
/// overlay is left. Each bootstrap address gets its own long-lived task.
pub async fn dial_with_retry(
    addr: SocketAddr,
    topic: String,
    max_frame_bytes: usize,
    peers: PeerTable,
    events_tx: UnboundedSender<OverlayEvent>,
) {
    let mut backoff = Duration::from_millis(500);
    const MAX_BACKOFF: Duration = Duration::from_secs(30);

    loop {
        match dial_once(addr, &topic, max_frame_bytes, &peers, &events_tx).await {
            Ok(()) => {
                backoff = Duration::from_millis(500);
            }
            Err(e) => {
                tracing::debug!("dial to {} failed: {}, retrying in {:?}", addr, e, backoff);
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = std::cmp::min(backoff * 2, MAX_BACKOFF);
    }
}

async fn dial_once(
    addr: SocketAddr,
    topic: &str,
    max_frame_bytes: usize,
    peers: &PeerTable,
    events_tx: &UnboundedSender<OverlayEvent>,
) -> Result<(), crate::Error> {
    let mut stream = TcpStream::connect(addr).await?;

    let our_hello = Hello::new(Role::Client, topic);
    let body = serde_json::to_vec(&our_hello)?;
    stream.write_all(&encode(&body)).await?;

    let mut decoder = FrameDecoder::new(max_frame_bytes);
    let mut buf = [0u8; 4096];

    let their_hello: Hello = loop {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(crate::Error::Misconfigured(format!(
                "peer {} closed the connection during handshake",
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
            "peer {} serves the wrong topic: expected {}, got {}",
            addr, topic, their_hello.topic
        )));
    }

    let peer_id = PeerId::from_public_key(&their_hello.public_key);
    let (handle, disconnected) = connection::spawn(
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

    // Hold the connection here until it drops, so the retry loop above
    // only redials once this peer is actually gone -- otherwise it would
    // reopen a fresh TCP connection (and register a fresh PeerId) on
    // every backoff tick regardless of whether the first dial is still
    // live.
    let _ = disconnected.await;

    Ok(())
}
