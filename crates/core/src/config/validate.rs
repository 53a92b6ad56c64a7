use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Required sections exist (enforced by serde)
/// - Server port is not 0
/// - At least one non-empty http(s) Reddit URL
/// - Translation API key and Telegram bot token are set
/// - Telegram chat id is not 0
/// - Orchestrator run timeout and interval are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Reddit validation
    if config.reddit.urls.is_empty() {
        return Err(ConfigError::ValidationError(
            "reddit.urls must contain at least one URL".to_string(),
        ));
    }
    for url in &config.reddit.urls {
        let url = url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "reddit.urls contains an invalid URL: {:?}",
                url
            )));
        }
    }

    // Translation validation
    if config.translation.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "translation.api_key cannot be empty".to_string(),
        ));
    }

    // Telegram validation
    if config.telegram.bot_token.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "telegram.bot_token cannot be empty".to_string(),
        ));
    }
    if config.telegram.chat_id == 0 {
        return Err(ConfigError::ValidationError(
            "telegram.chat_id cannot be 0".to_string(),
        ));
    }

    // Orchestrator validation
    if config.orchestrator.run_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.run_timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.orchestrator.enabled && config.orchestrator.run_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "orchestrator.run_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
