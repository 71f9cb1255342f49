//! OpenAI-compatible chat completions client for image classification.
//!
//! Sends one user message with a text part (the prompt) and an `image_url` part (data URI),
//! bounded by `max_tokens` and an overall deadline.

use crate::image::EncodedImage;
use crate::llm::classifier::{build_prompt, ClassifyError, ImageClassifier};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Vision classifier backed by `/chat/completions`.
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    prompt: String,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(
        base_url: Option<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        categories: &[&str],
    ) -> Self {
        let base_url = base_url
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self {
            base_url,
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(crate::config::DEFAULT_CLASSIFY_TIMEOUT_SECS),
            prompt: build_prompt(categories),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn request_body(&self, image: &EncodedImage) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: self.prompt.clone(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_uri(),
                        },
                    },
                ],
            }],
            max_tokens: self.max_tokens,
        }
    }

    /// POST /chat/completions — returns the trimmed content of the first choice.
    async fn chat(&self, image: &EncodedImage) -> Result<String, ClassifyError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(image);
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }
        let data: ChatResponse = res.json().await?;
        first_content(data)
    }
}

fn status_error(status: u16, body: String) -> ClassifyError {
    match status {
        401 | 403 => ClassifyError::Unauthorized(body),
        429 => ClassifyError::RateLimited(body),
        _ => ClassifyError::Api { status, body },
    }
}

fn first_content(data: ChatResponse) -> Result<String, ClassifyError> {
    let content = data
        .choices
        .and_then(|c| c.into_iter().next())
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .map(|s| s.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        Err(ClassifyError::EmptyResponse)
    } else {
        Ok(content)
    }
}

#[async_trait]
impl ImageClassifier for OpenAiClient {
    async fn classify(&self, image: &EncodedImage) -> Result<String, ClassifyError> {
        log::info!("classifying image with model {}", self.model);
        let verdict = tokio::time::timeout(self.timeout, self.chat(image))
            .await
            .map_err(|_| ClassifyError::Timeout(self.timeout))??;
        log::info!("classification verdict: {}", verdict);
        Ok(verdict)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Option<Vec<Choice>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}
