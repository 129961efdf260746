use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::provider::{check_status, to_api_messages, LlmError, LlmProvider, Message};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible chat completions. Mistral speaks the same protocol.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    name: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            name: "OpenAI".to_string(),
        }
    }

    /// Override the display name (e.g. "Mistral" for api.mistral.ai).
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = json!({
            "model": self.model,
            "messages": to_api_messages(messages.iter()),
            "temperature": temperature,
            "max_tokens": max_tokens,
        });

        debug!("{} request to {}", self.name, url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let resp: serde_json::Value = check_status(response).await?.json().await?;
        let content = resp["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| LlmError::ParseError("missing choices[0].message.content".into()))?
            .to_string();

        Ok(content)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
