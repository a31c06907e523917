//! HTTP integration for the task engine.
//!
//! One POST endpoint turns a request into a task submission and renders the
//! single completion outcome as a response; health and stats exist for the
//! supervisor's probes and for operators. The whole graph — registry,
//! strategy, queue, codec, sink — is built once at startup from
//! configuration and shared immutably.

pub mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use chrono::{DateTime, Utc};
use tower_http::cors::CorsLayer;

use drossel_core::{ComputeRegistry, DrosselConfig, EventSink, PayloadCodec, TracingSink};
use drossel_engine::{build_strategy, AsyncTaskQueue, EngineError, QueueConfig};

/// Everything a handler needs, built once at startup.
pub struct AppState {
    pub queue: AsyncTaskQueue,
    pub codec: Arc<dyn PayloadCodec>,
    pub started_at: DateTime<Utc>,
}

pub type SharedState = Arc<AppState>;

/// Build the full processing graph from configuration.
pub fn build_state(config: &DrosselConfig) -> Result<SharedState, EngineError> {
    let registry = ComputeRegistry::standard();
    let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
    let strategy = build_strategy(&config.engine, registry, Arc::clone(&sink))?;
    let queue = AsyncTaskQueue::new(QueueConfig::from_engine(&config.engine), strategy, sink);
    Ok(Arc::new(AppState {
        queue,
        codec: config.engine.codec.build(),
        started_at: Utc::now(),
    }))
}

/// The HTTP surface.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/tasks/{kind}", post(handlers::submit_task))
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
