//! HTTP front end.
//!
//! `POST /enrich` accepts a JSON array of flat string maps and answers with
//! the enriched array. Malformed input is a 400; enrichment failure is a 500.

pub mod error;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::core::Executor;
use crate::domain::Alert;

pub use error::AppError;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<dyn Executor>,
}

impl AppState {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        Self { executor }
    }
}

/// Build the axum Router with all routes and middleware
pub fn build_router(executor: Arc<dyn Executor>) -> Router {
    Router::new()
        .route("/enrich", post(enrich_alerts))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState::new(executor))
}

/// Parse a request body into alerts
pub fn parse_alerts(body: &[u8]) -> Result<Vec<Alert>, serde_json::Error> {
    serde_json::from_slice(body)
}

async fn enrich_alerts(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Vec<Alert>>, AppError> {
    let alerts = parse_alerts(&body)
        .map_err(|e| AppError::bad_request(format!("Failed to parse alerts: {e}")))?;
    debug!(count = alerts.len(), "Received alerts");

    let enriched = state.executor.enrich(alerts).await?;
    Ok(Json(enriched))
}

/// Serve the API on a pre-bound listener
pub async fn serve_on(listener: tokio::net::TcpListener, executor: Arc<dyn Executor>) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    let app = build_router(executor);

    info!("alertflow API listening on http://{addr}");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Bind `address` and serve the API until the process exits
pub async fn serve(address: &str, executor: Arc<dyn Executor>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    serve_on(listener, executor).await
}
