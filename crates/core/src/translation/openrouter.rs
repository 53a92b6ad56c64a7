//! OpenRouter chat-completions translator.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{TranslationError, Translator};
use crate::context::RunContext;
use crate::metrics;

const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-0528:free";
const DEFAULT_TARGET_LANGUAGE: &str = "Russian";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const REFERER: &str = "https://github.com/newsbot/newsbot";
const APP_TITLE: &str = "AI News Bot";

/// Connection settings for [`OpenRouterTranslator`].
#[derive(Debug, Clone)]
pub struct OpenRouterConfig {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub target_language: String,
    pub timeout: Duration,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Translator backed by an OpenAI-compatible chat-completions endpoint.
pub struct OpenRouterTranslator {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterTranslator {
    pub fn new(config: OpenRouterConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn target_language(&self) -> &str {
        &self.config.target_language
    }

    fn build_prompt(&self, text: &str) -> String {
        format!(
            "Translate the following text into {}. Preserve the original formatting and structure. \
             Translate only the content and do not add any comments or explanations:\n\n{}",
            self.config.target_language, text
        )
    }

    async fn request(&self, text: &str) -> Result<String, TranslationError> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: self.build_prompt(text),
            }],
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .bearer_auth(&self.config.api_key)
            .header("content-type", "application/json")
            .header("HTTP-Referer", REFERER)
            .header("X-Title", APP_TITLE)
            .timeout(self.config.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::Timeout(self.config.timeout)
                } else {
                    TranslationError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TranslationError::Http(e.to_string()))?;

        if status != 200 {
            let message = serde_json::from_str::<ChatResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            return Err(TranslationError::Service {
                status: Some(status),
                message,
            });
        }

        parse_completion(&body)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Extract the translated text from a successful response body.
fn parse_completion(body: &str) -> Result<String, TranslationError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| TranslationError::Json(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(TranslationError::Service {
            status: None,
            message: error.message,
        });
    }

    let content = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or(TranslationError::EmptyResult)?;

    let text = strip_reasoning(&content).trim().to_string();
    if text.is_empty() {
        return Err(TranslationError::EmptyResult);
    }
    Ok(text)
}

/// Reasoning models may prefix their answer with a `<think>` block.
fn strip_reasoning(content: &str) -> &str {
    let trimmed = content.trim_start();
    if trimmed.starts_with("<think>") {
        if let Some(end) = trimmed.find("</think>") {
            return &trimmed[end + "</think>".len()..];
        }
    }
    content
}

#[async_trait]
impl Translator for OpenRouterTranslator {
    fn name(&self) -> &str {
        "openrouter"
    }

    async fn translate(&self, ctx: &RunContext, text: &str) -> Result<String, TranslationError> {
        if text.trim().is_empty() {
            return Err(TranslationError::EmptyInput);
        }

        debug!(
            model = %self.config.model,
            chars = text.chars().count(),
            "Requesting translation"
        );

        let timer = metrics::EXTERNAL_SERVICE_DURATION
            .with_label_values(&["openrouter", "translate"])
            .start_timer();
        let result = ctx.run(self.request(text)).await;
        timer.observe_duration();

        metrics::EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                "openrouter",
                "translate",
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        result
    }
}
