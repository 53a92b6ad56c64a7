use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::collector::RedditCollectorConfig;
use crate::orchestrator::OrchestratorConfig;
use crate::publisher::TelegramPublisherConfig;
use crate::translation::OpenRouterConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    pub translation: TranslationConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("newsbot.db")
}

/// Reddit collector configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedditConfig {
    /// Listing URLs to collect from, in order
    #[serde(default = "default_reddit_urls")]
    pub urls: Vec<String>,
    /// Minimum upvotes for a post to be collected (default: 100)
    #[serde(default = "default_upvote_threshold")]
    pub upvote_threshold: i64,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    /// Optional User-Agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            urls: default_reddit_urls(),
            upvote_threshold: default_upvote_threshold(),
            timeout_secs: default_http_timeout(),
            user_agent: None,
        }
    }
}

impl RedditConfig {
    pub fn to_collector_config(&self) -> RedditCollectorConfig {
        let mut config = RedditCollectorConfig::new(self.urls.clone());
        config.upvote_threshold = self.upvote_threshold;
        config.timeout = Duration::from_secs(self.timeout_secs);
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        config
    }
}

fn default_reddit_urls() -> Vec<String> {
    vec!["https://www.reddit.com/r/ArtificialIntelligence/top/".to_string()]
}

fn default_upvote_threshold() -> i64 {
    100
}

fn default_http_timeout() -> u64 {
    30
}

/// Translation service configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    /// OpenRouter API key
    pub api_key: String,
    /// Model identifier (default: deepseek/deepseek-r1-0528:free)
    #[serde(default)]
    pub model: Option<String>,
    /// API base URL (default: https://openrouter.ai/api/v1)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Language to translate into (default: Russian)
    #[serde(default = "default_target_language")]
    pub target_language: String,
    /// Pause between consecutive translation calls in milliseconds (default: 1000)
    #[serde(default = "default_translation_interval")]
    pub interval_ms: u64,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_translation_timeout")]
    pub timeout_secs: u64,
}

impl TranslationConfig {
    pub fn to_openrouter_config(&self) -> OpenRouterConfig {
        let mut config = OpenRouterConfig::new(self.api_key.clone());
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.trim_end_matches('/').to_string();
        }
        config.target_language = self.target_language.clone();
        config.timeout = Duration::from_secs(self.timeout_secs);
        config
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

fn default_target_language() -> String {
    "Russian".to_string()
}

fn default_translation_interval() -> u64 {
    1000
}

fn default_translation_timeout() -> u64 {
    60
}

/// Telegram publisher configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelegramConfig {
    /// Bot API token
    pub bot_token: String,
    /// Destination chat id (channels are negative)
    pub chat_id: i64,
    /// Bot API base URL (default: https://api.telegram.org)
    #[serde(default)]
    pub api_base: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl TelegramConfig {
    pub fn to_publisher_config(&self) -> TelegramPublisherConfig {
        let mut config = TelegramPublisherConfig::new(self.bot_token.clone(), self.chat_id);
        if let Some(api_base) = &self.api_base {
            config.api_base = api_base.trim_end_matches('/').to_string();
        }
        config.timeout = Duration::from_secs(self.timeout_secs);
        config
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub reddit: RedditConfig,
    pub translation: SanitizedTranslationConfig,
    pub telegram: SanitizedTelegramConfig,
    pub orchestrator: OrchestratorConfig,
}

/// Sanitized translation config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTranslationConfig {
    pub api_key_configured: bool,
    pub model: Option<String>,
    pub api_base: Option<String>,
    pub target_language: String,
    pub interval_ms: u64,
    pub timeout_secs: u64,
}

/// Sanitized Telegram config (bot token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelegramConfig {
    pub bot_token_configured: bool,
    pub chat_id: i64,
    pub api_base: Option<String>,
    pub timeout_secs: u64,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            reddit: config.reddit.clone(),
            translation: SanitizedTranslationConfig {
                api_key_configured: !config.translation.api_key.is_empty(),
                model: config.translation.model.clone(),
                api_base: config.translation.api_base.clone(),
                target_language: config.translation.target_language.clone(),
                interval_ms: config.translation.interval_ms,
                timeout_secs: config.translation.timeout_secs,
            },
            telegram: SanitizedTelegramConfig {
                bot_token_configured: !config.telegram.bot_token.is_empty(),
                chat_id: config.telegram.chat_id,
                api_base: config.telegram.api_base.clone(),
                timeout_secs: config.telegram.timeout_secs,
            },
            orchestrator: config.orchestrator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[translation]
api_key = "sk-or-test"

[telegram]
bot_token = "123:abc"
chat_id = -1001234567890
"#;

    #[test]
    fn test_deserialize_minimal_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.database.path.to_str().unwrap(), "newsbot.db");
        assert_eq!(
            config.reddit.urls,
            vec!["https://www.reddit.com/r/ArtificialIntelligence/top/"]
        );
        assert_eq!(config.reddit.upvote_threshold, 100);
        assert_eq!(config.translation.target_language, "Russian");
        assert_eq!(config.translation.interval_ms, 1000);
        assert_eq!(config.telegram.chat_id, -1001234567890);
        assert!(config.orchestrator.enabled);
    }

    #[test]
    fn test_deserialize_missing_translation_fails() {
        let toml = r#"
[telegram]
bot_token = "123:abc"
chat_id = 1
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 9000

[database]
path = "/data/newsbot.sqlite"

[reddit]
urls = ["https://www.reddit.com/r/MachineLearning/top/", "https://www.reddit.com/r/LocalLLaMA/top/"]
upvote_threshold = 250
timeout_secs = 10
user_agent = "newsbot-test/1.0"

[translation]
api_key = "sk-or-test"
model = "openai/gpt-4o-mini"
api_base = "http://localhost:4000/v1/"
target_language = "German"
interval_ms = 250
timeout_secs = 20

[telegram]
bot_token = "123:abc"
chat_id = 42
api_base = "http://localhost:8081"

[orchestrator]
enabled = false
run_interval_secs = 900
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.reddit.urls.len(), 2);
        assert!(!config.orchestrator.enabled);
        assert_eq!(config.orchestrator.run_interval_secs, 900);

        let reddit = config.reddit.to_collector_config();
        assert_eq!(reddit.upvote_threshold, 250);
        assert_eq!(reddit.timeout, Duration::from_secs(10));
        assert_eq!(reddit.user_agent, "newsbot-test/1.0");

        let openrouter = config.translation.to_openrouter_config();
        assert_eq!(openrouter.model, "openai/gpt-4o-mini");
        assert_eq!(openrouter.api_base, "http://localhost:4000/v1");
        assert_eq!(openrouter.target_language, "German");
        assert_eq!(openrouter.timeout, Duration::from_secs(20));
        assert_eq!(config.translation.interval(), Duration::from_millis(250));

        let telegram = config.telegram.to_publisher_config();
        assert_eq!(telegram.chat_id, 42);
        assert_eq!(telegram.api_base, "http://localhost:8081");
        assert_eq!(telegram.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_defaults_carry_into_component_configs() {
        let config: Config = toml::from_str(MINIMAL).unwrap();

        let openrouter = config.translation.to_openrouter_config();
        assert_eq!(openrouter.api_base, "https://openrouter.ai/api/v1");
        assert_eq!(openrouter.model, "deepseek/deepseek-r1-0528:free");

        let telegram = config.telegram.to_publisher_config();
        assert_eq!(telegram.api_base, "https://api.telegram.org");
    }

    #[test]
    fn test_sanitized_config() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.translation.api_key_configured);
        assert!(sanitized.telegram.bot_token_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("sk-or-test"));
        assert!(!json.contains("123:abc"));
    }
}
