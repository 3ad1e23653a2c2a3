//! OpenAI-compatible summarization backend
//!
//! Uses `/v1/chat/completions` with a bearer key, so any compatible gateway
//! works when `llm.base_url` points at it.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::summarizer::{build_http_client, request_error, retry_transient, status_error};
use super::{Summary, SummarizationClient};

/// Chat completions client
pub struct OpenAiSummarizer {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    max_input_chars: usize,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
    }
}

impl OpenAiSummarizer {
    /// Create a new client; requires `llm.api_key`
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| Error::Config("OpenAI backend requires an API key".into()))?;

        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url().to_string(),
            api_key,
            model: config.model().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            max_input_chars: config.max_input_chars,
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: PromptBuilder::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            Error::permanent(format!("Failed to parse chat completion response: {}", e))
        })?;

        chat.into_text()
            .ok_or_else(|| Error::permanent("Chat completion returned no content"))
    }
}

#[async_trait]
impl SummarizationClient for OpenAiSummarizer {
    async fn summarize(&self, content: &str) -> Result<Summary> {
        if let Some(text) = PromptBuilder::short_text_summary(content) {
            tracing::warn!("Extracted text is very short, returning it as the summary");
            return Ok(Summary::new(text));
        }

        let prompt = PromptBuilder::build_summary_prompt(content, self.max_input_chars);
        tracing::info!("Generating summary with model: {}", self.model);

        let text = retry_transient(self.max_retries, || self.complete(&prompt)).await?;
        tracing::info!("Generated summary ({} characters)", text.len());

        Ok(Summary::new(text.trim()))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/v1/models", self.base_url);

        match self.client.get(&url).bearer_auth(&self.api_key).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SummarizerBackend;

    fn config() -> LlmConfig {
        LlmConfig {
            backend: SummarizerBackend::OpenAi,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_requires_api_key() {
        let mut config = config();
        config.api_key = None;
        assert!(matches!(OpenAiSummarizer::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_defaults_for_backend() {
        let summarizer = OpenAiSummarizer::new(&config()).unwrap();
        assert_eq!(
            summarizer.completions_url(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(summarizer.model(), "gpt-4o-mini");
        assert_eq!(summarizer.name(), "openai");
    }

    #[test]
    fn test_request_has_system_and_user_messages() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: PromptBuilder::SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: "Summarize this",
                },
            ],
            temperature: 0.3,
            max_tokens: 1000,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "Summarize this");
        assert_eq!(json["max_tokens"], 1000);
    }

    #[test]
    fn test_response_text_extraction() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"The report covers Q3."}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.into_text().as_deref(), Some("The report covers Q3."));

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(empty.into_text().is_none());
    }
}
