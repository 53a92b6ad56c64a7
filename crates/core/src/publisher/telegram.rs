//! Telegram Bot API publisher.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{PublishError, Publisher};
use crate::context::RunContext;
use crate::item::Item;
use crate::metrics;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const PARSE_MODE: &str = "Markdown";

/// Telegram's limit for media captions, in characters.
pub const MAX_CAPTION_CHARS: usize = 1024;
/// Telegram's limit for text messages, in characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Connection settings for [`TelegramPublisher`].
#[derive(Debug, Clone)]
pub struct TelegramPublisherConfig {
    pub bot_token: String,
    pub chat_id: i64,
    pub api_base: String,
    pub timeout: Duration,
}

impl TelegramPublisherConfig {
    pub fn new(bot_token: impl Into<String>, chat_id: i64) -> Self {
        Self {
            bot_token: bot_token.into(),
            chat_id,
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Bot API method used to deliver a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SendMethod {
    Message,
    Photo,
    Video,
    Animation,
}

impl SendMethod {
    /// Pick the method for the first media URI of a post.
    fn for_media(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
        let ext = path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
        match ext {
            "jpg" | "jpeg" | "png" | "webp" => Self::Photo,
            "mp4" | "mov" | "avi" => Self::Video,
            "gif" => Self::Animation,
            _ => Self::Message,
        }
    }

    fn endpoint(&self) -> &'static str {
        match self {
            Self::Message => "sendMessage",
            Self::Photo => "sendPhoto",
            Self::Video => "sendVideo",
            Self::Animation => "sendAnimation",
        }
    }
}

#[derive(Debug, Serialize)]
struct SendRequest {
    chat_id: i64,
    parse_mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    photo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    video: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    animation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Publisher posting items to a Telegram chat through the Bot API.
pub struct TelegramPublisher {
    client: reqwest::Client,
    config: TelegramPublisherConfig,
}

impl TelegramPublisher {
    pub fn new(config: TelegramPublisherConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn chat_id(&self) -> i64 {
        self.config.chat_id
    }

    fn build_request(&self, item: &Item) -> (SendMethod, SendRequest) {
        let method = item
            .media_refs
            .first()
            .map(|url| SendMethod::for_media(url))
            .unwrap_or(SendMethod::Message);

        let mut request = SendRequest {
            chat_id: self.config.chat_id,
            parse_mode: PARSE_MODE,
            text: None,
            caption: None,
            photo: None,
            video: None,
            animation: None,
        };

        let media = item.media_refs.first().cloned();
        match method {
            SendMethod::Message => request.text = Some(format_message(item, MAX_MESSAGE_CHARS)),
            SendMethod::Photo => {
                request.caption = Some(format_message(item, MAX_CAPTION_CHARS));
                request.photo = media;
            }
            SendMethod::Video => {
                request.caption = Some(format_message(item, MAX_CAPTION_CHARS));
                request.video = media;
            }
            SendMethod::Animation => {
                request.caption = Some(format_message(item, MAX_CAPTION_CHARS));
                request.animation = media;
            }
        }

        (method, request)
    }

    async fn send(&self, method: SendMethod, request: &SendRequest) -> Result<(), PublishError> {
        let url = format!(
            "{}/bot{}/{}",
            self.config.api_base,
            self.config.bot_token,
            method.endpoint()
        );

        let response = self
            .client
            .post(&url)
            .timeout(self.config.timeout)
            .json(request)
            .send()
            .await
            .map_err(|e| PublishError::Http(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PublishError::Http(e.without_url().to_string()))?;

        check_response(status, &body)
    }
}

/// Interpret a Bot API response.
fn check_response(status: u16, body: &str) -> Result<(), PublishError> {
    let parsed = serde_json::from_str::<ApiResponse>(body);

    match parsed {
        Ok(response) if response.ok && (200..300).contains(&status) => Ok(()),
        Ok(response) => Err(PublishError::Service {
            status: Some(status),
            message: response
                .description
                .unwrap_or_else(|| "request rejected".to_string()),
        }),
        Err(_) if !(200..300).contains(&status) => Err(PublishError::Service {
            status: Some(status),
            message: body.to_string(),
        }),
        Err(e) => Err(PublishError::Json(e.to_string())),
    }
}

const TITLE_OPEN: &str = "📰 *";
const TITLE_CLOSE: &str = "*\n\n";

/// Render the post text: bold title, blank line, translated body.
///
/// The result holds at most `max_chars` characters. Text is cut before
/// escaping so an escape sequence or the title's closing `*` is never split.
pub fn format_message(item: &Item, max_chars: usize) -> String {
    let mut message = String::new();
    let mut budget = max_chars;

    let frame = TITLE_OPEN.chars().count() + TITLE_CLOSE.chars().count();
    if !item.title.is_empty() && budget > frame {
        message.push_str(TITLE_OPEN);
        budget -= frame;
        budget -= push_escaped(&mut message, &item.title, budget);
        message.push_str(TITLE_CLOSE);
    }

    push_escaped(&mut message, &item.translated_body, budget);
    message
}

/// Escape characters with meaning in Telegram's legacy Markdown.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    push_escaped(&mut escaped, text, usize::MAX);
    escaped
}

fn needs_escape(c: char) -> bool {
    matches!(c, '*' | '_' | '`' | '[' | ']' | '(' | ')')
}

/// Append `text` escaped, stopping before the first character whose escaped
/// form would exceed `budget`. Returns the characters written.
fn push_escaped(out: &mut String, text: &str, budget: usize) -> usize {
    let mut used = 0;
    for c in text.chars() {
        let width = if needs_escape(c) { 2 } else { 1 };
        if used + width > budget {
            break;
        }
        if needs_escape(c) {
            out.push('\\');
        }
        out.push(c);
        used += width;
    }
    used
}

#[async_trait]
impl Publisher for TelegramPublisher {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, ctx: &RunContext, item: &Item) -> Result<(), PublishError> {
        if item.translated_body.is_empty() {
            return Err(PublishError::NotReady(item.source_id.clone()));
        }

        let (method, request) = self.build_request(item);
        debug!(
            source_id = %item.source_id,
            method = method.endpoint(),
            "Delivering item"
        );

        let timer = metrics::EXTERNAL_SERVICE_DURATION
            .with_label_values(&["telegram", method.endpoint()])
            .start_timer();
        let result = ctx.run(self.send(method, &request)).await;
        timer.observe_duration();

        metrics::EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[
                "telegram",
                method.endpoint(),
                if result.is_ok() { "success" } else { "error" },
            ])
            .inc();

        result
    }
}
