use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use scrummate_core::errors::TierError;

use crate::remote::{AgentPlatform, RemoteAgent, RunState, ThreadMessage};

/// HTTP client for the hosted agent platform. Speaks the assistants-style
/// thread/run protocol: create a thread, post the user message, start a run
/// against a named agent, then poll the run and read messages back.
pub struct HttpAgentPlatform {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl HttpAgentPlatform {
    pub fn new(
        endpoint: &str,
        api_key: SecretString,
        connect_timeout: Duration,
    ) -> Result<Self, TierError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|error| TierError::Remote(error.to_string()))?;

        Ok(Self { client, base_url: endpoint.trim_end_matches('/').to_string(), api_key })
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.api_key.expose_secret())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TierError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(remote_error(status, &body));
    }

    response.json::<T>().await.map_err(|error| TierError::Protocol(error.to_string()))
}

fn remote_error(status: StatusCode, body: &str) -> TierError {
    let detail: String = body.chars().take(200).collect();
    TierError::Remote(format!("platform returned {status}: {detail}"))
}

fn send_error(error: reqwest::Error) -> TierError {
    if error.is_timeout() || error.is_connect() {
        TierError::Remote(format!("platform unreachable: {error}"))
    } else {
        TierError::Remote(error.to_string())
    }
}

#[async_trait]
impl AgentPlatform for HttpAgentPlatform {
    async fn list_agents(&self, limit: usize) -> Result<Vec<RemoteAgent>, TierError> {
        let response = self
            .authorized(self.client.get(self.url("/assistants")))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(send_error)?;

        let listing: AgentListing = decode(response).await?;
        Ok(listing
            .data
            .into_iter()
            .map(|agent| RemoteAgent { id: agent.id, name: agent.name })
            .collect())
    }

    async fn create_thread(&self) -> Result<String, TierError> {
        let response = self
            .authorized(self.client.post(self.url("/threads")))
            .json(&json!({}))
            .send()
            .await
            .map_err(send_error)?;

        let thread: ObjectId = decode(response).await?;
        Ok(thread.id)
    }

    async fn post_message(&self, thread_id: &str, text: &str) -> Result<(), TierError> {
        let response = self
            .authorized(self.client.post(self.url(&format!("/threads/{thread_id}/messages"))))
            .json(&json!({ "role": "user", "content": text }))
            .send()
            .await
            .map_err(send_error)?;

        decode::<ObjectId>(response).await?;
        Ok(())
    }

    async fn start_run(&self, thread_id: &str, agent_id: &str) -> Result<String, TierError> {
        let response = self
            .authorized(self.client.post(self.url(&format!("/threads/{thread_id}/runs"))))
            .json(&json!({ "assistant_id": agent_id }))
            .send()
            .await
            .map_err(send_error)?;

        let run: ObjectId = decode(response).await?;
        Ok(run.id)
    }

    async fn run_state(&self, thread_id: &str, run_id: &str) -> Result<RunState, TierError> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/threads/{thread_id}/runs/{run_id}"))))
            .send()
            .await
            .map_err(send_error)?;

        let run: RunStatus = decode(response).await?;
        parse_run_state(&run.status)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>, TierError> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/threads/{thread_id}/messages"))))
            .send()
            .await
            .map_err(send_error)?;

        let listing: MessageListing = decode(response).await?;
        Ok(listing.data.into_iter().map(MessageEntry::into_message).collect())
    }
}

fn parse_run_state(status: &str) -> Result<RunState, TierError> {
    match status {
        "queued" => Ok(RunState::Queued),
        "in_progress" => Ok(RunState::InProgress),
        "requires_action" => Ok(RunState::RequiresAction),
        "completed" => Ok(RunState::Completed),
        "failed" => Ok(RunState::Failed),
        "cancelled" => Ok(RunState::Cancelled),
        "expired" => Ok(RunState::Expired),
        other => Err(TierError::Protocol(format!("unknown run status `{other}`"))),
    }
}

#[derive(Debug, Deserialize)]
struct ObjectId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct AgentListing {
    #[serde(default)]
    data: Vec<AgentEntry>,
}

#[derive(Debug, Deserialize)]
struct AgentEntry {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct RunStatus {
    status: String,
}

#[derive(Debug, Deserialize)]
struct MessageListing {
    #[serde(default)]
    data: Vec<MessageEntry>,
}

#[derive(Debug, Deserialize)]
struct MessageEntry {
    #[serde(default)]
    role: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
}

impl MessageEntry {
    fn into_message(self) -> ThreadMessage {
        let text = self
            .content
            .into_iter()
            .filter_map(|block| block.text.map(|text| text.value))
            .collect::<Vec<_>>()
            .join("\n");
        ThreadMessage { role: self.role, text }
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    #[serde(default)]
    value: String,
}
