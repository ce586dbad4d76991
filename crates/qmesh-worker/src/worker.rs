// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::config::WorkerConfig;
use crate::dispatch::{accepting_work, PendingRequest};
use crate::identity::WorkerIdentity;
use crate::Error;
use chrono::Utc;
use qmesh_adapter::{GenerateOptions, InferenceAdapter};
use qmesh_health::{HealthMonitor, DEFAULT_SAMPLE_INTERVAL};
use qmesh_overlay::{Overlay, OverlayEvent, PeerId};
use qmesh_protocol::{InferenceMessage, ScoreMessage};
use qmesh_queue::{PriorityQueue, QueueEntry, Tier};
use qmesh_registry::{PeerRecord, Registry, DEFAULT_SWEEP_INTERVAL};
use qmesh_score::{RequestOutcome, ScoreManager};
use qmesh_store::Store;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

/// Ties the overlays, health monitor, admission queue, inference
/// subprocess, score manager, and global registry into one running
/// worker. Holds no public mutable state -- all interior mutability is
/// behind the types it owns (`HealthMonitor`, `Registry`, `Mutex`).
pub struct Worker {
    identity: WorkerIdentity,
    config: WorkerConfig,
    inference_overlay: Arc<Overlay>,
    score_overlay: Arc<Overlay>,
    health: HealthMonitor,
    registry: Arc<Registry>,
    score_manager: Arc<ScoreManager>,
    adapter: Arc<InferenceAdapter>,
    queue: Mutex<PriorityQueue<PendingRequest>>,
    dispatch_notify: Notify,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Worker {
    /// Bring up a worker: load its identity, start the inference
    /// subprocess, join both overlays, and spawn the background tasks
    /// (health sampler, registry sweeper, score broadcaster, inference
    /// dispatch loop, and the two overlay event loops).
    pub async fn start(config: WorkerConfig) -> Result<Arc<Self>, Error> {
        let identity = WorkerIdentity::load_or_create(&config.identity_path)?;

        let store = match &config.store_path {
            Some(path) => Arc::new(Store::open(path)?),
            None => Arc::new(Store::in_memory()),
        };

        let score_manager = Arc::new(ScoreManager::new(store));
        let registry = Arc::new(Registry::new());
        let health = HealthMonitor::new(config.base_queue_capacity);

        let adapter = Arc::new(InferenceAdapter::new(config.adapter.clone())?);
        adapter.start().await?;

        let mut inference_overlay = Overlay::join("qmesh-inference-network-v1", &config.inference_overlay).await?;
        let inference_events = inference_overlay
            .events()
            .expect("events receiver taken exactly once");

        let mut score_overlay = Overlay::join("qmesh-scores-network-v1", &config.score_overlay).await?;
        let score_events = score_overlay
            .events()
            .expect("events receiver taken exactly once");

        let worker = Arc::new(Self {
            identity,
            config,
            inference_overlay: Arc::new(inference_overlay),
            score_overlay: Arc::new(score_overlay),
            health,
            registry,
            score_manager,
            adapter,
            queue: Mutex::new(PriorityQueue::new()),
            dispatch_notify: Notify::new(),
            tasks: Mutex::new(Vec::new()),
        });

        let mut tasks = Vec::new();
        tasks.push(worker.health.spawn_periodic_refresh(DEFAULT_SAMPLE_INTERVAL));
        tasks.push(worker.registry.spawn_stale_sweeper(DEFAULT_SWEEP_INTERVAL));
        tasks.push(tokio::spawn(Arc::clone(&worker).run_inference_events(inference_events)));
        tasks.push(tokio::spawn(Arc::clone(&worker).run_score_events(score_events)));
        tasks.push(tokio::spawn(Arc::clone(&worker).run_dispatch_loop()));
        tasks.push(tokio::spawn(Arc::clone(&worker).run_score_broadcaster(Duration::from_secs(
            worker.config.score_broadcast_secs,
        ))));

        *worker.tasks.lock().await = tasks;

        Ok(worker)
    }

    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Graceful shutdown, per §5: stop accepting new work by tearing down
    /// the background tasks first (dispatch loop, overlay event loops,
    /// sweepers, broadcaster), close peer connections and destroy both
    /// overlays, then stop the inference subprocess with its configured
    /// grace period before a force-kill.
    pub async fn shutdown(&self) {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }

        self.inference_overlay.leave().await;
        self.score_overlay.leave().await;

        if let Err(e) = self.adapter.stop().await {
            tracing::warn!(error = %e, "failed to stop inference subprocess cleanly");
        }
    }

    async fn run_inference_events(self: Arc<Self>, mut events: UnboundedReceiver<OverlayEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                OverlayEvent::Message { peer, payload } => {
                    self.handle_inference_message(peer, payload).await;
                }
                OverlayEvent::PeerConnected { peer, .. } => {
                    tracing::debug!(%peer, "inference peer connected");
                }
                OverlayEvent::PeerDisconnected { peer } => {
                    tracing::debug!(%peer, "inference peer disconnected");
                }
                OverlayEvent::PeerError { peer, error } => {
                    tracing::warn!(%peer, %error, "inference peer error");
                }
            }
        }
    }

    async fn handle_inference_message(&self, peer: PeerId, payload: Value) {
        let message: InferenceMessage = match serde_json::from_value(payload) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(%peer, error = %e, "failed to decode inference message");
                return;
            }
        };

        match message {
            InferenceMessage::Status => {
                let response = self.status_response().await;
                if let Err(e) = self.inference_overlay.send(&peer, &response).await {
                    tracing::warn!(%peer, error = %e, "failed to send status response");
                }
            }
            InferenceMessage::Inference {
                request_id,
                prompt,
                sender_id,
                sender_score,
                max_tokens,
                temperature,
            } => {
                self.admit(peer, request_id, prompt, sender_id, sender_score, max_tokens, temperature)
                    .await;
            }
            InferenceMessage::InferenceResult { .. } | InferenceMessage::Error { .. } => {
                tracing::debug!(%peer, "ignoring reply-shaped message addressed to a worker");
            }
        }
    }

    /// The five-step admission algorithm: not-ready, overload, verify
    /// priority, enqueue, schedule dispatch.
    #[allow(clippy::too_many_arguments)]
    async fn admit(
        &self,
        peer: PeerId,
        request_id: String,
        prompt: String,
        sender_id: Option<String>,
        sender_score: i64,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) {
        if !self.adapter.is_running().await {
            self.reply_error(&peer, Some(request_id), "worker-not-ready", false).await;
            return;
        }

        let snapshot = self.health.latest().await;
        let queue_len = self.queue.lock().await.len();
        if !accepting_work(queue_len, &snapshot, self.config.base_queue_capacity) {
            self.reply_error(&peer, Some(request_id), "worker-overloaded", true).await;
            return;
        }

        let priority = qmesh_verify::effective_priority(sender_id.as_deref(), sender_score, &self.registry);
        let tier = Tier::from_score(priority);

        let mut queue = self.queue.lock().await;
        queue.enqueue(QueueEntry {
            request_id,
            priority,
            tier,
            enqueued_at: Utc::now(),
            payload: PendingRequest {
                peer,
                prompt,
                sender_id,
                max_tokens,
                temperature,
                submitted_at: Utc::now(),
            },
        });
        let new_len = queue.len();
        drop(queue);

        self.health.set_queue_size(new_len).await;
        self.dispatch_notify.notify_one();
    }

    async fn reply_error(&self, peer: &PeerId, request_id: Option<String>, error: &str, retry: bool) {
        let message = InferenceMessage::Error {
            request_id,
            error: error.to_string(),
            retry,
        };
        if let Err(e) = self.inference_overlay.send(peer, &message).await {
            tracing::warn!(%peer, error = %e, "failed to send error reply");
        }
    }

    /// Single-threaded cooperative dispatch loop: wakes on enqueue, then
    /// drains the queue one entry at a time until empty.
    async fn run_dispatch_loop(self: Arc<Self>) {
        loop {
            self.dispatch_notify.notified().await;

            loop {
                let entry = self.queue.lock().await.dequeue();
                let Some(entry) = entry else { break };

                let remaining = self.queue.lock().await.len();
                self.health.set_queue_size(remaining).await;

                let still_connected = self
                    .inference_overlay
                    .connected_peers()
                    .await
                    .contains(&entry.payload.peer);
                if !still_connected {
                    tracing::debug!(request_id = %entry.request_id, "dropping request, sender disconnected");
                    continue;
                }

                self.dispatch_one(entry).await;
            }
        }
    }

    async fn dispatch_one(&self, entry: QueueEntry<PendingRequest>) {
        let start = tokio::time::Instant::now();
        let opts = GenerateOptions {
            max_tokens: entry.payload.max_tokens,
            temperature: entry.payload.temperature,
        };

        let outcome_result = self.adapter.generate(&entry.payload.prompt, opts).await;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.health.record_response_time(elapsed_ms).await;

        let (success, result_len) = match outcome_result {
            Ok(result) => {
                let message = InferenceMessage::InferenceResult {
                    request_id: entry.request_id.clone(),
                    result: result.text.clone(),
                    worker_id: self.identity.as_hex(),
                };
                if let Err(e) = self.inference_overlay.send(&entry.payload.peer, &message).await {
                    tracing::warn!(error = %e, "failed to send inference result");
                }
                (true, result.text.len())
            }
            Err(e) => {
                self.reply_error(&entry.payload.peer, Some(entry.request_id.clone()), &e.to_string(), false)
                    .await;

                if !self.adapter.is_running().await {
                    tracing::warn!("adapter not running after dispatch failure, marking not-ready and restarting");
                    let adapter = Arc::clone(&self.adapter);
                    tokio::spawn(async move {
                        if let Err(e) = adapter.restart().await {
                            tracing::error!(error = %e, "adapter restart failed");
                        }
                    });
                }
                (false, 0)
            }
        };

        let worker_id = self.identity.as_hex();
        let score_manager = Arc::clone(&self.score_manager);
        let request_id = entry.request_id.clone();
        let outcome = RequestOutcome {
            success,
            response_time_ms: elapsed_ms,
            prompt_length: entry.payload.prompt.len(),
            result_length: result_len,
        };

        // Scoring must not delay the response that was already sent above.
        tokio::spawn(async move {
            match score_manager.apply_outcome(&worker_id, &request_id, outcome) {
                Ok((_, earned)) => {
                    for achievement in earned {
                        tracing::info!(worker_id, ?achievement, "achievement earned");
                    }
                }
                Err(e) => tracing::warn!(worker_id, error = %e, "failed to persist score update"),
            }
        });
    }

    async fn run_score_events(self: Arc<Self>, mut events: UnboundedReceiver<OverlayEvent>) {
        while let Some(event) = events.recv().await {
            let OverlayEvent::Message { peer, payload } = event else {
                continue;
            };

            match serde_json::from_value::<ScoreMessage>(payload) {
                Ok(ScoreMessage::ScoreRequest { .. }) => {
                    let data = self.own_peer_record().await;
                    let message = ScoreMessage::ScoreResponse { data };
                    if let Err(e) = self.score_overlay.send(&peer, &message).await {
                        tracing::warn!(%peer, error = %e, "failed to answer score request");
                    }
                }
                Ok(ScoreMessage::ScoreAnnounce { data }) | Ok(ScoreMessage::ScoreResponse { data }) => {
                    self.registry.update_peer(data);
                }
                Ok(ScoreMessage::LeaderboardSync { scores }) => {
                    self.registry.update_many(scores);
                }
                Err(e) => tracing::warn!(%peer, error = %e, "failed to decode score message"),
            }
        }
    }

    async fn run_score_broadcaster(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let data = self.own_peer_record().await;
            self.registry.update_peer(data.clone());
            let message = ScoreMessage::ScoreAnnounce { data };
            if let Err(e) = self.score_overlay.broadcast(&message).await {
                tracing::warn!(error = %e, "failed to broadcast score update");
            }

            let rows: Vec<qmesh_score::LeaderboardSnapshotRow> = self
                .registry
                .get_leaderboard(qmesh_score::LEADERBOARD_SNAPSHOT_LIMIT)
                .into_iter()
                .map(|entry| qmesh_score::LeaderboardSnapshotRow {
                    rank: entry.rank,
                    worker_id: entry.record.worker_id,
                    total_score: entry.record.total_score,
                })
                .collect();

            if let Err(e) = self.score_manager.write_leaderboard_snapshot(&rows) {
                tracing::warn!(error = %e, "failed to persist leaderboard snapshot");
            }
        }
    }

    async fn own_peer_record(&self) -> PeerRecord {
        let snapshot = self.health.latest().await;
        let worker_id = self.identity.as_hex();
        let record = self.score_manager.load_or_create(&worker_id);

        PeerRecord {
            worker_id,
            total_score: record.total_score,
            success_rate: record.success_rate,
            health_score: snapshot.health_score,
            state: snapshot.state,
            queue_size: snapshot.queue_size,
            queue_capacity: snapshot.queue_capacity,
            accepting: snapshot.accepting,
            timestamp: Utc::now(),
        }
    }

    async fn status_response(&self) -> InferenceMessage {
        let worker_id = self.identity.as_hex();
        let record = self.score_manager.load_or_create(&worker_id);
        let ready = self.adapter.is_running().await;
        let queue_length = self.queue.lock().await.len();

        let rank = self
            .registry
            .get_leaderboard(usize::MAX)
            .into_iter()
            .find(|entry| entry.record.worker_id == worker_id)
            .map(|entry| entry.rank);

        InferenceMessage::StatusResponse {
            worker_id,
            ready,
            requests_processed: record.requests_processed,
            queue_length,
            score: record.total_score,
            level: record.level,
            rank,
            achievements: record.achievements.into_iter().collect(),
        }
    }
}
