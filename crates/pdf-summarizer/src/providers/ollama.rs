//! Ollama summarization backend
//!
//! Talks to a local Ollama server through `/api/generate` with streaming off.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::{Error, Result};
use crate::generation::PromptBuilder;

use super::summarizer::{build_http_client, request_error, retry_transient, status_error};
use super::{Summary, SummarizationClient};

/// Ollama API client with automatic retry of transient failures
pub struct OllamaSummarizer {
    client: Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    max_retries: u32,
    max_input_chars: usize,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaSummarizer {
    /// Create a new Ollama summarizer
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            base_url: config.base_url().to_string(),
            model: config.model().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            max_input_chars: config.max_input_chars,
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url)
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.temperature,
                num_predict: self.max_tokens,
            },
        };

        let response = self
            .client
            .post(self.generate_url())
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let generated: GenerateResponse = response.json().await.map_err(|e| {
            Error::permanent(format!("Failed to parse generation response: {}", e))
        })?;

        Ok(generated.response)
    }
}

#[async_trait]
impl SummarizationClient for OllamaSummarizer {
    async fn summarize(&self, content: &str) -> Result<Summary> {
        if let Some(text) = PromptBuilder::short_text_summary(content) {
            tracing::warn!("Extracted text is very short, returning it as the summary");
            return Ok(Summary::new(text));
        }

        let prompt = PromptBuilder::build_completion_prompt(content, self.max_input_chars);
        tracing::info!("Generating summary with model: {}", self.model);

        let text = retry_transient(self.max_retries, || self.generate(&prompt)).await?;
        tracing::info!("Generated summary ({} characters)", text.len());

        Ok(Summary::new(text.trim()))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
