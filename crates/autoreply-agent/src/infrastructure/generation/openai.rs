//! `TextGenerationClient` backed by an OpenAI-compatible chat-completions API.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::application::compose_reply::{
    GenerationError, GenerationOptions, TextGenerationClient,
};

/// Client for `POST {base_url}/chat/completions`.
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key_env: String,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(base_url: impl Into<String>, api_key_env: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key_env: api_key_env.into(),
            timeout,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn api_key(&self) -> Result<String, GenerationError> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| GenerationError::MissingApiKey(self.api_key_env.clone()))
    }
}

/// Request body for the chat-completions endpoint.
pub fn request_body(prompt: &str, options: &GenerationOptions) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": options.model,
        "messages": [
            { "role": "system", "content": options.system_prompt },
            { "role": "user", "content": prompt },
        ],
        "temperature": options.temperature,
        "max_tokens": options.max_tokens,
        "n": options.candidates,
        "presence_penalty": options.presence_penalty,
        "frequency_penalty": options.frequency_penalty,
    });
    if !options.stop.is_empty() {
        body["stop"] = serde_json::json!(options.stop);
    }
    body
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts `choices[i].message.content` from a response body, trimmed.
pub fn parse_candidates(body: &str) -> Result<Vec<String>, GenerationError> {
    let response: CompletionResponse =
        serde_json::from_str(body).map_err(|e| GenerationError::Decode(e.to_string()))?;
    Ok(response
        .choices
        .into_iter()
        .filter_map(|c| c.message.content)
        .map(|c| c.trim().to_string())
        .collect())
}

#[async_trait]
impl TextGenerationClient for OpenAiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Vec<String>, GenerationError> {
        let key = self.api_key()?;
        let url = self.endpoint();
        debug!(%url, model = %options.model, "posting chat completion");

        let response = self
            .http
            .post(&url)
            .bearer_auth(key)
            .json(&request_body(prompt, options))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Transport(e.to_string()))?;
        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }

        parse_candidates(&body)
    }
}
