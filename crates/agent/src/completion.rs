use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use scrummate_core::errors::TierError;

use crate::remote::CompletionService;

/// Chat-completions client for the middle tier. One request, one answer; the
/// orchestrator wraps the call in its own timeout.
pub struct HttpCompletionService {
    client: Client,
    base_url: String,
    api_key: SecretString,
    model: String,
}

impl HttpCompletionService {
    pub fn new(
        endpoint: &str,
        api_key: SecretString,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, TierError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| TierError::Remote(error.to_string()))?;

        Ok(Self {
            client,
            base_url: endpoint.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, prompt: &str) -> Result<String, TierError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "model": self.model,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await
            .map_err(|error| TierError::Remote(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail: String = body.chars().take(200).collect();
            return Err(TierError::Remote(format!("completion returned {status}: {detail}")));
        }

        let completion: CompletionPayload =
            response.json().await.map_err(|error| TierError::Protocol(error.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(TierError::Protocol("completion response had no content".to_string()));
        }

        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct CompletionPayload {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::CompletionPayload;

    #[test]
    fn first_choice_content_is_extracted() {
        let payload: CompletionPayload = serde_json::from_value(serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "try limiting WIP" } },
                { "message": { "role": "assistant", "content": "ignored second choice" } }
            ]
        }))
        .expect("payload should deserialize");

        let text = payload.choices.into_iter().next().map(|choice| choice.message.content);
        assert_eq!(text.as_deref(), Some("try limiting WIP"));
    }

    #[test]
    fn empty_choices_deserialize_to_empty_vec() {
        let payload: CompletionPayload =
            serde_json::from_value(serde_json::json!({})).expect("payload should deserialize");
        assert!(payload.choices.is_empty());
    }
}
