//! HTTP bridge to the editor's command endpoint.
//!
//! Commands go out as `POST {base}/command` with a JSON body naming the
//! command id; execution state comes from `GET {base}/execution-state`.

use super::{ExecutionState, HostCommand, NotebookHost};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct HttpBridge {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct CommandRequest<'a> {
    command: &'a str,
}

#[derive(Deserialize)]
struct StateResponse {
    state: String,
}

impl HttpBridge {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("Failed to build host bridge HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn state_from_wire(state: &str) -> ExecutionState {
    match state {
        "idle" => ExecutionState::Idle,
        "busy" => ExecutionState::Busy,
        _ => ExecutionState::Unknown,
    }
}

#[async_trait]
impl NotebookHost for HttpBridge {
    async fn dispatch(&mut self, command: HostCommand) -> Result<()> {
        let url = format!("{}/command", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(&CommandRequest { command: command.id() })
            .send()
            .await
            .with_context(|| format!("host bridge unreachable dispatching {}", command.id()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("host rejected {} ({}): {}", command.id(), status, body);
        }
        Ok(())
    }

    async fn execution_state(&mut self) -> Result<ExecutionState> {
        let url = format!("{}/execution-state", self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context("host bridge unreachable querying execution state")?;

        // Bridge builds without the state endpoint still work; the caller
        // falls back to its fixed cooldown.
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(ExecutionState::Unknown);
        }
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("execution-state query failed ({}): {}", status, body);
        }
        let parsed: StateResponse = resp
            .json()
            .await
            .context("Failed to parse execution-state response")?;
        Ok(state_from_wire(&parsed.state))
    }
}
