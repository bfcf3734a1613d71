//! NyayAI - legal assistant chat dashboard
//!
//! Serves a single-page chat over India's criminal laws, backed by the
//! Gemini `generateContent` API.

mod api;
mod config;
mod conversation;
mod dashboard;
mod exchange;
mod llm;
mod media;
mod runtime;
mod state_machine;
mod system_prompt;

use api::{create_router, AppState};
use config::AppConfig;
use exchange::{ExchangeClient, ExchangeOptions};
use llm::{GeminiService, LoggingService};
use runtime::ConversationRuntime;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nyaya_chat=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration; a missing key stops startup here
    let config = AppConfig::from_env().inspect_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
    })?;
    tracing::info!(config = ?config, "Loaded configuration");

    let gemini = GeminiService::new(
        config.api_key.clone(),
        &config.model,
        config.base_url.as_deref(),
    )?;
    let service = Arc::new(LoggingService::new(Arc::new(gemini)));

    let client = ExchangeClient::new(
        service,
        ExchangeOptions {
            system_instruction: system_prompt::SYSTEM_INSTRUCTION.to_string(),
            replay: config.replay,
            normalize_bullets: config.features.normalize_bullets,
        },
    );
    let runtime = ConversationRuntime::new(client, dashboard::GREETING);

    // Create application state
    let state = AppState::new(runtime, config.features);

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new().gzip(true).br(true).deflate(true).zstd(true);

    let app = create_router(state)
        .layer(cors)
        .layer(compression)
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(model = %config.model, "NyayAI server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
