// SPDX-FileCopyrightText: © 2024 Christopher Woods <Christopher.Woods@bristol.ac.uk>
// SPDX-License-Identifier: MIT

use crate::Error;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateOptions {
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResult {
    pub text: String,
    pub token_count: u32,
    pub stop_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Thin HTTP client over the inference engine's loopback API. One
/// instance is reused across calls so connections (and, for `reqwest`,
/// the underlying pool) are shared.
pub struct EngineClient {
    http: reqwest::Client,
    base_url: String,
    request_timeout: Duration,
}

impl EngineClient {
    pub fn new(base_url: String, request_timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            request_timeout,
        })
    }

    /// Short-timeout probe used both during startup polling and for
    /// periodic liveness checks.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match tokio::time::timeout(Duration::from_secs(2), self.http.get(&url).send()).await {
            Ok(Ok(response)) => response.status().is_success(),
            _ => false,
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
    ) -> Result<GenerateResult, Error> {
        let url = format!("{}/completion", self.base_url);
        let body = serde_json::json!({
            "prompt": prompt,
            "n_predict": opts.max_tokens,
            "temperature": opts.temperature,
            "stream": false,
        });

        let response = tokio::time::timeout(self.request_timeout, self.http.post(&url).json(&body).send())
            .await
            .map_err(|_| Error::Timeout(self.request_timeout))??
            .error_for_status()?;

        Ok(response.json::<GenerateResult>().await?)
    }

    /// Stream tokens via a line-delimited event stream, calling
    /// `on_token` for each non-empty content chunk until the `[DONE]`
    /// sentinel (or the response simply ends).
    pub async fn generate_stream<F>(
        &self,
        prompt: &str,
        opts: &GenerateOptions,
        mut on_token: F,
    ) -> Result<GenerateResult, Error>
    where
        F: FnMut(&str),
    {
        let url = format!("{}/completion", self.base_url);
        let body = serde_json::json!({
            "prompt": prompt,
            "n_predict": opts.max_tokens,
            "temperature": opts.temperature,
            "stream": true,
        });

        let response = self.http.post(&url).json(&body).send().await?.error_for_status()?;
        stream_tokens(response, &mut on_token).await
    }

    /// Maintain the conversation as `{role:user}`/`{role:assistant}`
    /// pairs and send the whole history on each turn, matching a
    /// stateless chat-completions API.
    pub async fn chat_stream<F>(
        &self,
        history: &[ChatMessage],
        mut on_token: F,
    ) -> Result<GenerateResult, Error>
    where
        F: FnMut(&str),
    {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "messages": history,
            "stream": true,
        });

        let response = self.http.post(&url).json(&body).send().await?.error_for_status()?;
        stream_tokens(response, &mut on_token).await
    }
}

async fn stream_tokens<F>(response: reqwest::Response, on_token: &mut F) -> Result<GenerateResult, Error>
where
    F: FnMut(&str),
{
    let mut text = String::new();
    let mut stop_reason = "stop".to_string();
    let mut stream = response.bytes_stream();
    let mut buffer = Vec::new();

    while let Some(chunk) = stream.next().await {
        buffer.extend_from_slice(&chunk?);

        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line = buffer.drain(..=pos).collect::<Vec<u8>>();
            let line = String::from_utf8_lossy(&line);
            let line = line.trim();

            let Some(payload) = line.strip_prefix("data:") else {
                continue;
            };
            let payload = payload.trim();

            if payload == "[DONE]" {
                return Ok(GenerateResult {
                    text,
                    token_count: 0,
                    stop_reason,
                });
            }

            if payload.is_empty() {
                continue;
            }

            if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload) {
                if let Some(chunk) = value.get("content").and_then(|c| c.as_str()) {
                    if !chunk.is_empty() {
                        text.push_str(chunk);
                        on_token(chunk);
                    }
                }
                if let Some(reason) = value.get("stop_reason").and_then(|r| r.as_str()) {
                    stop_reason = reason.to_string();
                }
            }
        }
    }

    Ok(GenerateResult {
        text,
        token_count: 0,
        stop_reason,
    })
}
