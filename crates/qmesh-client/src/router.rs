// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::config::ClientConfig;
use crate::identity::ClientIdentity;
use crate::stats::ClientStats;
use crate::Error;
use qmesh_overlay::{Overlay, OverlayEvent, PeerId};
use qmesh_protocol::{InferenceMessage, ScoreMessage};
use qmesh_registry::Registry;
use futures::stream::{FuturesUnordered, StreamExt};
use rand::seq::IteratorRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One prompt's outcome, as returned by `send_batch` alongside its
/// original index.
#[derive(Debug)]
pub struct BatchResult {
    pub index: usize,
    pub outcome: Result<String, Error>,
}

/// Per-request options overriding the client's configured defaults.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub timeout: Option<Duration>,
}

struct PendingReply {
    resolve: oneshot::Sender<Result<String, String>>,
}

/// Discovers qmesh inference workers, picks the best one for each
/// prompt, and tracks in-flight requests by `requestId`. Joins the
/// inference overlay and the score overlay as a pure client on both.
pub struct Router {
    identity: ClientIdentity,
    config: ClientConfig,
    inference_overlay: Arc<Overlay>,
    score_overlay: Arc<Overlay>,
    registry: Arc<Registry>,
    /// `peerId -> workerId`, populated from `status` replies.
    ready_peers: Mutex<HashMap<PeerId, String>>,
    inflight: Mutex<HashMap<String, PendingReply>>,
    stats: Mutex<ClientStats>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Router {
    /// Join both overlays and spawn the background event loops, the
    /// periodic score-health refresher, and the registry stale sweeper.
    pub async fn connect(config: ClientConfig) -> Result<Arc<Self>, Error> {
        let identity = ClientIdentity::load_or_create(&config.identity_path)?;
        let registry = Arc::new(Registry::new());

        let mut inference_overlay =
            Overlay::join("qmesh-inference-network-v1", &config.inference_overlay).await?;
        let inference_events = inference_overlay
            .events()
            .expect("events receiver taken exactly once");

        let mut score_overlay = Overlay::join("qmesh-scores-network-v1", &config.score_overlay).await?;
        let score_events = score_overlay
            .events()
            .expect("events receiver taken exactly once");

        let router = Arc::new(Self {
            identity,
            config,
            inference_overlay: Arc::new(inference_overlay),
            score_overlay: Arc::new(score_overlay),
            registry,
            ready_peers: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            stats: Mutex::new(ClientStats::default()),
            tasks: Mutex::new(Vec::new()),
        });

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(Arc::clone(&router).run_inference_events(inference_events)));
        tasks.push(tokio::spawn(Arc::clone(&router).run_score_events(score_events)));
        tasks.push(tokio::spawn(Arc::clone(&router).run_health_refresher(Duration::from_secs(
            router.config.health_refresh_secs,
        ))));
        tasks.push(router.registry.spawn_stale_sweeper(qmesh_registry::DEFAULT_SWEEP_INTERVAL));

        *router.tasks.lock().await = tasks;

        Ok(router)
    }

    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub async fn stats(&self) -> ClientStats {
        *self.stats.lock().await
    }

    pub async fn ready_worker_count(&self) -> usize {
        self.ready_peers.lock().await.len()
    }

    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
    }

    /// The two-stage routing decision, then submit-and-await. Returns
    /// the worker's inference result text.
    pub async fn send_prompt(&self, prompt: &str, opts: RequestOptions) -> Result<String, Error> {
        let peer = self.choose_peer().await?;
        let request_id = Uuid::new_v4().simple().to_string();
        let timeout = opts.timeout.unwrap_or(Duration::from_secs(self.config.request_timeout_secs));

        let (tx, rx) = oneshot::channel();
        self.inflight
            .lock()
            .await
            .insert(request_id.clone(), PendingReply { resolve: tx });

        let message = InferenceMessage::Inference {
            request_id: request_id.clone(),
            prompt: prompt.to_string(),
            sender_id: Some(self.identity.as_hex()),
            sender_score: self.config.claimed_score,
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
        };

        if let Err(e) = self.inference_overlay.send(&peer, &message).await {
            self.inflight.lock().await.remove(&request_id);
            self.stats.lock().await.record_failure();
            return Err(Error::Overlay(e));
        }

        let start = tokio::time::Instant::now();

        let outcome = tokio::time::timeout(timeout, rx).await;
        match outcome {
            Ok(Ok(Ok(text))) => {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                self.stats.lock().await.record_success(elapsed_ms);
                Ok(text)
            }
            Ok(Ok(Err(error))) => {
                self.stats.lock().await.record_failure();
                Err(Error::WorkerError(error))
            }
            Ok(Err(_recv_error)) => {
                // Sender dropped without resolving -- the peer disconnected
                // before replying.
                self.stats.lock().await.record_failure();
                Err(Error::WorkerDisconnected)
            }
            Err(_elapsed) => {
                self.inflight.lock().await.remove(&request_id);
                self.stats.lock().await.record_timeout();
                Err(Error::Timeout)
            }
        }
    }

    /// Issue up to `min(batch_size, workerCount, maxBatchConcurrency)`
    /// concurrent `send_prompt`s and collect each result by its original
    /// index.
    pub async fn send_batch(&self, prompts: &[String]) -> Vec<BatchResult> {
        let worker_count = self.ready_worker_count().await.max(1);
        let concurrency = prompts
            .len()
            .min(worker_count)
            .min(self.config.max_batch_concurrency)
            .max(1);

        let mut results = Vec::with_capacity(prompts.len());
        let mut iter = prompts.iter().enumerate();
        let mut in_flight = Vec::new();

        // Simple windowed fan-out: keep up to `concurrency` sends
        // running, and pull the next one in as each slot frees up.
        for _ in 0..concurrency {
            if let Some((index, prompt)) = iter.next() {
                in_flight.push(self.send_one_batch_entry(index, prompt.clone()));
            }
        }

        let mut pending = FuturesUnordered::from_iter(in_flight);

        while let Some(result) = pending.next().await {
            results.push(result);
            if let Some((index, prompt)) = iter.next() {
                pending.push(self.send_one_batch_entry(index, prompt.clone()));
            }
        }

        results.sort_by_key(|r| r.index);
        results
    }

    async fn send_one_batch_entry(&self, index: usize, prompt: String) -> BatchResult {
        let outcome = self.send_prompt(&prompt, RequestOptions::default()).await;
        BatchResult { index, outcome }
    }

    /// First tier (empty queue, best health) / fallback-score selection
    /// via the registry, mapped to the inference-overlay peer that last
    /// identified itself as that `workerId`; falls back to a uniform
    /// random ready peer when smart routing is off or no mapping exists.
    async fn choose_peer(&self) -> Result<PeerId, Error> {
        if self.ready_peers.lock().await.is_empty() {
            return Err(Error::NoWorkersFound);
        }

        if self.config.smart_routing {
            if let Some(best) = self.registry.select_best() {
                let ready = self.ready_peers.lock().await;
                if let Some(peer) = ready
                    .iter()
                    .find(|(_, worker_id)| **worker_id == best.worker_id)
                    .map(|(peer, _)| peer.clone())
                {
                    return Ok(peer);
                }
            }
        }

        let ready = self.ready_peers.lock().await;
        ready
            .keys()
            .choose(&mut rand::rng())
            .cloned()
            .ok_or(Error::NoReadyWorker)
    }

    async fn run_inference_events(self: Arc<Self>, mut events: UnboundedReceiver<OverlayEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                OverlayEvent::PeerConnected { peer, .. } => {
                    if let Err(e) = self.inference_overlay.send(&peer, &InferenceMessage::Status).await {
                        tracing::warn!(%peer, error = %e, "failed to send status query");
                    }
                }
                OverlayEvent::PeerDisconnected { peer } => {
                    self.ready_peers.lock().await.remove(&peer);
                    tracing::debug!(%peer, "inference worker disconnected");
                }
                OverlayEvent::PeerError { peer, error } => {
                    tracing::warn!(%peer, %error, "inference peer error");
                }
                OverlayEvent::Message { peer, payload } => {
                    self.handle_inference_message(peer, payload).await;
                }
            }
        }
    }

    async fn handle_inference_message(&self, peer: PeerId, payload: serde_json::Value) {
        let message: InferenceMessage = match serde_json::from_value(payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "failed to decode inference message");
                return;
            }
        };

        match message {
            InferenceMessage::StatusResponse { worker_id, ready, .. } => {
                if ready {
                    self.ready_peers.lock().await.insert(peer, worker_id);
                } else {
                    self.ready_peers.lock().await.remove(&peer);
                }
            }
            InferenceMessage::InferenceResult { request_id, result, .. } => {
                self.resolve(&request_id, Ok(result)).await;
            }
            InferenceMessage::Error { request_id, error, .. } => {
                if let Some(request_id) = request_id {
                    self.resolve(&request_id, Err(error)).await;
                }
            }
            InferenceMessage::Status | InferenceMessage::Inference { .. } => {
                tracing::debug!(%peer, "ignoring request-shaped message addressed to a client");
            }
        }
    }

    /// Deliver a reply to its matching in-flight request, if it is still
    /// outstanding. A reply whose `requestId` is not in the table (it
    /// already timed out) is discarded.
    async fn resolve(&self, request_id: &str, outcome: Result<String, String>) {
        if let Some(pending) = self.inflight.lock().await.remove(request_id) {
            let _ = pending.resolve.send(outcome);
        }
    }

    async fn run_score_events(self: Arc<Self>, mut events: UnboundedReceiver<OverlayEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                OverlayEvent::PeerConnected { peer, .. } => {
                    let message = ScoreMessage::ScoreRequest {
                        worker_id: Some(self.identity.as_hex()),
                    };
                    if let Err(e) = self.score_overlay.send(&peer, &message).await {
                        tracing::warn!(%peer, error = %e, "failed to prime registry");
                    }
                }
                OverlayEvent::Message { peer, payload } => match serde_json::from_value::<ScoreMessage>(payload) {
                    Ok(ScoreMessage::ScoreAnnounce { data }) | Ok(ScoreMessage::ScoreResponse { data }) => {
                        self.registry.update_peer(data);
                    }
                    Ok(ScoreMessage::LeaderboardSync { scores }) => {
                        self.registry.update_many(scores);
                    }
                    Ok(ScoreMessage::ScoreRequest { .. }) => {}
                    Err(e) => tracing::warn!(%peer, error = %e, "failed to decode score message"),
                },
                _ => {}
            }
        }
    }

    async fn run_health_refresher(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let message = ScoreMessage::ScoreRequest {
                worker_id: Some(self.identity.as_hex()),
            };
            if let Err(e) = self.score_overlay.broadcast(&message).await {
                tracing::warn!(error = %e, "failed to broadcast health refresh request");
            }
            self.registry.cleanup_stale();
        }
    }
}
