use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsbot_core::{
    load_config, validate_config, BatchTranslator, Collector, ItemStore, OpenRouterTranslator,
    PipelineOrchestrator, Publisher, RedditCollector, RunContext, SanitizedConfig, SqliteItemStore,
    TelegramPublisher, Translator,
};
use newsbot_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Upper bound for the startup translator health check
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("NEWSBOT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Database path: {:?}", config.database.path);

    // Create SQLite item store
    let store: Arc<dyn ItemStore> = Arc::new(
        SqliteItemStore::new(&config.database.path).context("Failed to create item store")?,
    );
    info!("Item store initialized");

    let collector: Arc<dyn Collector> =
        Arc::new(RedditCollector::new(config.reddit.to_collector_config()));
    info!(
        "Reddit collector watching {} listing(s), upvote threshold {}",
        config.reddit.urls.len(),
        config.reddit.upvote_threshold
    );

    let translator: Arc<dyn Translator> = Arc::new(OpenRouterTranslator::new(
        config.translation.to_openrouter_config(),
    ));
    let batch_translator =
        BatchTranslator::new(translator).with_interval(config.translation.interval());

    // Check the translator once, a failure is only logged
    let check_ctx = RunContext::with_deadline_in(HEALTH_CHECK_TIMEOUT);
    match batch_translator.health_check(&check_ctx).await {
        Ok(()) => info!("Translation service reachable"),
        Err(e) => warn!(error = %e, "Translation health check failed"),
    }

    let publisher: Arc<dyn Publisher> = Arc::new(TelegramPublisher::new(
        config.telegram.to_publisher_config(),
    ));
    info!("Telegram publisher targeting chat {}", config.telegram.chat_id);

    let orchestrator = PipelineOrchestrator::new(
        config.orchestrator.clone(),
        collector,
        store,
        batch_translator,
        publisher,
    );

    if config.orchestrator.enabled {
        orchestrator.start().await;
        info!(
            "Pipeline orchestrator started (interval {}s)",
            config.orchestrator.run_interval_secs
        );
    } else {
        info!("Orchestrator disabled in config, runs only on demand");
    }

    // Create app state
    let state = Arc::new(AppState::new(config.clone(), orchestrator.clone()));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(orchestrator))
        .await
        .context("Server error")?;

    info!("Server shut down");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then stop the orchestrator.
///
/// Stopping cancels a run in flight, including one triggered over HTTP, so
/// the request holding it open can complete and the server can drain.
async fn shutdown_signal(orchestrator: PipelineOrchestrator) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Stopping orchestrator...");
    orchestrator.stop().await;
}
