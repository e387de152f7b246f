use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatBackend, ChatReply};
use crate::config::SummarizationConfig;
use crate::Result;

/// Chat-completions client for OpenRouter
pub struct OpenRouterClient {
    client: Client,
    endpoint: String,
    api_key: String,
    referer: String,
    app_title: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenRouterClient {
    pub fn new(config: &SummarizationConfig, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            referer: config.referer.clone(),
            app_title: config.app_title.clone(),
        }
    }
}

/// Pull the generated text out of a successful completion body
fn completion_text(body: &str) -> Result<String> {
    let completion: ChatCompletion =
        serde_json::from_str(body).context("Failed to parse completion response")?;

    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow::anyhow!("Completion response contained no message"))
}

#[async_trait]
impl ChatBackend for OpenRouterClient {
    async fn complete(&self, model: &str, prompt: &str) -> Result<ChatReply> {
        let request = ChatRequest {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.app_title)
            .json(&request)
            .send()
            .await
            .context("Failed to reach text-generation service")?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        let text = if status == 200 { completion_text(&body)? } else { body };

        Ok(ChatReply { status, text })
    }
}
