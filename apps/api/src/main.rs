mod chat;
mod config;
mod db;
mod errors;
mod jobs;
mod llm_client;
mod matching;
mod models;
mod query;
mod routes;
mod session;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::chat::dispatch::Deps;
use crate::config::Config;
use crate::db::create_pool;
use crate::jobs::HttpJobProvider;
use crate::llm_client::LlmClient;
use crate::matching::oracle::{LlmCriticOracle, LlmScoringOracle};
use crate::routes::build_router;
use crate::session::registry::SessionRegistry;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (panics on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Copilot API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let pool = create_pool(&config.database_url).await?;

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone());
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Job search provider
    let jobs = HttpJobProvider::new(
        config.job_search_endpoint.clone(),
        config.job_search_api_key.clone(),
    );

    // Dispatch collaborators behind their trait seams
    let deps = Deps {
        store: Arc::new(PgStore::new(pool)),
        jobs: Arc::new(jobs),
        scoring: Arc::new(LlmScoringOracle(llm.clone())),
        critic: Arc::new(LlmCriticOracle(llm.clone())),
        llm,
    };

    let state = AppState {
        deps,
        sessions: Arc::new(SessionRegistry::new()),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
