// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::client::{ChatMessage, EngineClient, GenerateOptions, GenerateResult};
use crate::config::AdapterConfig;
use crate::process::Subprocess;
use crate::Error;
use tokio::sync::Mutex;

/// Façade over the inference engine subprocess: owns its lifecycle and
/// exposes the completion/chat/health surface the worker dispatches
/// against. Not `Clone` -- callers share one instance behind an `Arc`.
pub struct InferenceAdapter {
    config: AdapterConfig,
    client: EngineClient,
    process: Mutex<Subprocess>,
    consecutive_restarts: Mutex<u32>,
    chat_history: Mutex<Vec<ChatMessage>>,
}

impl InferenceAdapter {
    pub fn new(config: AdapterConfig) -> Result<Self, Error> {
        let client = EngineClient::new(config.base_url(), config.request_timeout())?;

        Ok(Self {
            config,
            client,
            process: Mutex::new(Subprocess::not_running()),
            consecutive_restarts: Mutex::new(0),
            chat_history: Mutex::new(Vec::new()),
        })
    }

    /// Spawn the subprocess and poll `/health` until it answers, the
    /// child exits first, or the startup timeout expires.
    pub async fn start(&self) -> Result<(), Error> {
        let mut process = self.process.lock().await;
        *process = Subprocess::spawn(&self.config)?;

        let deadline = tokio::time::Instant::now() + self.config.startup_timeout();

        loop {
            if let Some(status) = process.exit_status()? {
                return Err(Error::ProcessDiedDuringStartup(status.code()));
            }

            if self.client.health_check().await {
                *self.consecutive_restarts.lock().await = 0;
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(Error::StartupTimedOut(self.config.startup_timeout()));
            }

            tokio::time::sleep(self.config.health_poll_interval()).await;
        }
    }

    pub async fn stop(&self) -> Result<(), Error> {
        self.process.lock().await.stop(self.config.stop_grace_period()).await
    }

    /// Restart after an unexpected exit, up to `max_restarts`
    /// consecutive attempts. The counter resets to zero on success (in
    /// `start`), so only a run of failures trips the limit.
    pub async fn restart(&self) -> Result<(), Error> {
        let mut restarts = self.consecutive_restarts.lock().await;
        if *restarts >= self.config.max_restarts {
            return Err(Error::RestartLimitExceeded(self.config.max_restarts));
        }
        *restarts += 1;
        drop(restarts);

        self.stop().await?;
        self.start().await
    }

    pub async fn health_check(&self) -> bool {
        self.client.health_check().await
    }

    pub async fn generate(&self, prompt: &str, opts: GenerateOptions) -> Result<GenerateResult, Error> {
        self.client.generate(prompt, &opts).await
    }

    pub async fn generate_stream<F>(
        &self,
        prompt: &str,
        opts: GenerateOptions,
        on_token: F,
    ) -> Result<GenerateResult, Error>
    where
        F: FnMut(&str),
    {
        self.client.generate_stream(prompt, &opts, on_token).await
    }

    /// Append `user_msg` to the running conversation, send the full
    /// history, and append the assistant's reply once streaming
    /// completes.
    pub async fn chat_stream<F>(&self, user_msg: &str, on_token: F) -> Result<GenerateResult, Error>
    where
        F: FnMut(&str),
    {
        let mut history = self.chat_history.lock().await;
        history.push(ChatMessage {
            role: "user".to_string(),
            content: user_msg.to_string(),
        });

        let result = self.client.chat_stream(&history, on_token).await?;

        history.push(ChatMessage {
            role: "assistant".to_string(),
            content: result.text.clone(),
        });

        Ok(result)
    }

    /// Whether the subprocess is still alive, per the last-known exit
    /// status (does not itself probe `/health`).
    pub async fn is_running(&self) -> bool {
        self.process.lock().await.is_running()
    }
}
