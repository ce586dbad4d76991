// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::events::{OverlayEvent, PeerId};
use crate::frame::{encode, FrameDecoder};
use crate::peers::PeerTable;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;

/// A handle used to send frames to one connected peer. Cloning is cheap;
/// every clone shares the same outbound queue.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    pub public_key: String,
    tx: UnboundedSender<Vec<u8>>,
}

impl PeerHandle {
    pub fn send_json<T: Serialize>(&self, value: &T) -> Result<(), crate::Error> {
        let body = serde_json::to_vec(value)?;
        self.tx
            .send(encode(&body))
            .map_err(|_| crate::Error::UnknownPeer("connection already closed".to_string()))
    }
}

/// Spawn the reader/writer tasks for one accepted or dialed TCP connection.
/// Returns the handle callers use to send to this peer, plus a receiver
/// that resolves once the connection has dropped (reader loop exited,
/// peer removed from `peers`, `PeerDisconnected` sent) -- a dialer waits
/// on this before considering itself free to redial.
pub fn spawn(
    stream: TcpStream,
    peer: PeerId,
    public_key: String,
    max_frame_bytes: usize,
    peers: PeerTable,
    events_tx: UnboundedSender<OverlayEvent>,
) -> (PeerHandle, oneshot::Receiver<()>) {
    let (read_half, write_half) = tokio::io::split(stream);
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
    let (disconnected_tx, disconnected_rx) = oneshot::channel();

    tokio::spawn(writer_loop(write_half, rx));
    tokio::spawn(reader_loop(
        read_half,
        peer,
        max_frame_bytes,
        peers,
        events_tx,
        disconnected_tx,
    ));

    (PeerHandle { public_key, tx }, disconnected_rx)
}

async fn writer_loop(mut write_half: WriteHalf<TcpStream>, mut rx: UnboundedReceiver<Vec<u8>>) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = write_half.write_all(&frame).await {
            tracing::debug!("connection write failed, closing writer: {}", e);
            break;
        }
    }
}

async fn reader_loop(
    mut read_half: ReadHalf<TcpStream>,
    peer: PeerId,
    max_frame_bytes: usize,
    peers: PeerTable,
    events_tx: UnboundedSender<OverlayEvent>,
    disconnected_tx: oneshot::Sender<()>,
) {
    let mut decoder = FrameDecoder::new(max_frame_bytes);
    let mut buf = [0u8; 64 * 1024];

    loop {
        let n = match read_half.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("peer {} closed the connection", peer);
                break;
            }
            Ok(n) => n,
            Err(e) => {
                let _ = events_tx.send(OverlayEvent::PeerError {
                    peer: peer.clone(),
                    error: e.to_string(),
                });
                break;
            }
        };

        let frames = match decoder.push(&buf[..n]) {
            Ok(frames) => frames,
            Err(e) => {
                let _ = events_tx.send(OverlayEvent::PeerError {
                    peer: peer.clone(),
                    error: e.to_string(),
                });
                break;
            }
        };

        for frame in frames {
            match serde_json::from_slice::<Value>(&frame) {
                Ok(payload) => {
                    if events_tx
                        .send(OverlayEvent::Message {
                            peer: peer.clone(),
                            payload,
                        })
                        .is_err()
                    {
                        return;
                    }
                }
                Err(e) => {
                    let _ = events_tx.send(OverlayEvent::PeerError {
                        peer: peer.clone(),
                        error: format!("could not parse frame as JSON: {}", e),
                    });
                }
            }
        }
    }

    peers.remove(&peer).await;
    let _ = events_tx.send(OverlayEvent::PeerDisconnected { peer });
    let _ = disconnected_tx.send(());
}
