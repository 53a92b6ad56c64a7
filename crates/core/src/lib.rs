pub mod collector;
pub mod config;
pub mod context;
pub mod item;
pub mod metrics;
pub mod orchestrator;
pub mod publisher;
pub mod testing;
pub mod translation;

pub use collector::{CollectError, Collector, RedditCollector, RedditCollectorConfig};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use context::{ContextError, RunContext};
pub use item::{Item, ItemStore, SqliteItemStore, StoreError, StoreStats};
pub use orchestrator::{
    OrchestratorConfig, OrchestratorStatus, PipelineError, PipelineOrchestrator, RunOutcome,
    RunReport, RunSummary, SkipReason,
};
pub use publisher::{PublishError, Publisher, TelegramPublisher, TelegramPublisherConfig};
pub use translation::{
    BatchTranslator, OpenRouterConfig, OpenRouterTranslator, TranslationError, Translator,
};
