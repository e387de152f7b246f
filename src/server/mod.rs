use anyhow::Context;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::pipeline::BatchPipeline;
use crate::progress::JobRegistry;
use crate::Result;

pub mod handlers;

/// Shared state for all handlers
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<BatchPipeline>,
    pub jobs: Arc<JobRegistry>,
    pub default_model: String,
}

impl AppState {
    pub fn new(pipeline: BatchPipeline, default_model: impl Into<String>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            jobs: Arc::new(JobRegistry::new()),
            default_model: default_model.into(),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::home))
        .route("/progress", get(handlers::latest_progress))
        .route("/progress/{job_id}", get(handlers::job_progress))
        .route("/transcripts", post(handlers::transcripts))
        .route("/process", post(handlers::process))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(config: &Config, host: &str, port: u16) -> Result<()> {
    let state = AppState::new(
        BatchPipeline::from_config(config),
        config.summarization.default_model.clone(),
    );

    let address = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Server running on http://{}", address);

    axum::serve(listener, create_app(state))
        .await
        .context("Server stopped unexpectedly")?;

    Ok(())
}
