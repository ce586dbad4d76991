// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

//! End-to-end exercise of the client router against a hand-rolled fake
//! worker built directly on `qmesh_overlay::Overlay` (no adapter, no
//! dispatch loop) -- enough to answer `status` and `inference` the way
//! a real worker would.

use qmesh_client::{ClientConfig, Error, RequestOptions, Router};
use qmesh_overlay::{Overlay, OverlayConfig, OverlayEvent};
use qmesh_protocol::InferenceMessage;
use std::net::SocketAddr;
use std::time::Duration;

async fn free_addr() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn client_config(dir: &std::path::Path, inference_addr: SocketAddr, score_addr: SocketAddr) -> ClientConfig {
    ClientConfig {
        identity_path: dir.join("client-identity.toml"),
        inference_overlay: OverlayConfig::new(None, vec![inference_addr]),
        score_overlay: OverlayConfig::new(None, vec![score_addr]),
        claimed_score: 50,
        smart_routing: false,
        request_timeout_secs: 5,
        discovery_timeout_secs: 5,
        health_refresh_secs: 30,
        max_batch_concurrency: 5,
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn send_prompt_round_trips_through_a_fake_worker() {
    let inference_listen = free_addr().await;
    let score_listen = free_addr().await;

    let mut fake_inference = Overlay::join(
        "qmesh-inference-network-v1",
        &OverlayConfig::new(Some(inference_listen), vec![]),
    )
    .await
    .unwrap();
    let mut fake_inference_events = fake_inference.events().unwrap();

    let _fake_score = Overlay::join(
        "qmesh-scores-network-v1",
        &OverlayConfig::new(Some(score_listen), vec![]),
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let dir = std::env::temp_dir().join(format!("qmesh-client-test-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let config = client_config(&dir, inference_listen, score_listen);

    let router = Router::connect(config).await.unwrap();

    // Drive the fake worker side: answer status, then answer the
    // inference request that follows.
    let worker_task = tokio::spawn(async move {
        loop {
            match fake_inference_events.recv().await.unwrap() {
                OverlayEvent::Message { peer, payload } => {
                    let message: InferenceMessage = serde_json::from_value(payload).unwrap();
                    match message {
                        InferenceMessage::Status => {
                            let reply = InferenceMessage::StatusResponse {
                                worker_id: "worker-1".to_string(),
                                ready: true,
                                requests_processed: 0,
                                queue_length: 0,
                                score: 0,
                                level: qmesh_score::Level::Bronze,
                                rank: None,
                                achievements: vec![],
                            };
                            fake_inference.send(&peer, &reply).await.unwrap();
                        }
                        InferenceMessage::Inference { request_id, .. } => {
                            let reply = InferenceMessage::InferenceResult {
                                request_id,
                                result: "4".to_string(),
                                worker_id: "worker-1".to_string(),
                            };
                            fake_inference.send(&peer, &reply).await.unwrap();
                            return;
                        }
                        _ => {}
                    }
                }
                _ => continue,
            }
        }
    });

    // Give the status round-trip time to populate `ready_peers`.
    for _ in 0..50 {
        if router.ready_worker_count().await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(router.ready_worker_count().await, 1);

    let result = router.send_prompt("2+2?", RequestOptions::default()).await.unwrap();
    assert_eq!(result, "4");

    let stats = router.stats().await;
    assert_eq!(stats.requests_processed, 1);
    assert_eq!(stats.failed_requests, 0);

    worker_task.await.unwrap();
    router.shutdown().await;
    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test(flavor = "multi_thread")]
async fn send_prompt_times_out_when_nobody_answers() {
    let inference_listen = free_addr().await;
    let score_listen = free_addr().await;

    let mut fake_inference = Overlay::join(
        "qmesh-inference-network-v1",
        &OverlayConfig::new(Some(inference_listen), vec![]),
    )
    .await
    .unwrap();
    let mut fake_inference_events = fake_inference.events().unwrap();

    let _fake_score = Overlay::join(
        "qmesh-scores-network-v1",
        &OverlayConfig::new(Some(score_listen), vec![]),
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;

    let dir = std::env::temp_dir().join(format!("qmesh-client-test-timeout-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let mut config = client_config(&dir, inference_listen, score_listen);
    config.request_timeout_secs = 1;

    let router = Router::connect(config).await.unwrap();

    let worker_task = tokio::spawn(async move {
        // Answer status so the client considers the peer ready, but
        // silently drop any inference request.
        loop {
            if let OverlayEvent::Message { peer, payload } = fake_inference_events.recv().await.unwrap() {
                if let Ok(InferenceMessage::Status) = serde_json::from_value(payload) {
                    let reply = InferenceMessage::StatusResponse {
                        worker_id: "worker-1".to_string(),
                        ready: true,
                        requests_processed: 0,
                        queue_length: 0,
                        score: 0,
                        level: qmesh_score::Level::Bronze,
                        rank: None,
                        achievements: vec![],
                    };
                    fake_inference.send(&peer, &reply).await.unwrap();
                    return;
                }
            }
        }
    });

    for _ in 0..50 {
        if router.ready_worker_count().await > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    let result = router.send_prompt("hello", RequestOptions::default()).await;
    assert!(matches!(result, Err(Error::Timeout)));

    let stats = router.stats().await;
    assert_eq!(stats.timed_out_requests, 1);
    assert_eq!(stats.failed_requests, 1);

    worker_task.await.unwrap();
    router.shutdown().await;
    std::fs::remove_dir_all(&dir).ok();
}
