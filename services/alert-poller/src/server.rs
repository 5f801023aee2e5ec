//! HTTP API for current alerts and poller status.
//!
//! Provides endpoints for:
//! - Filtered alert lists and map layers
//! - The event catalog
//! - Cycle status and history
//! - Health and Prometheus metrics

use std::sync::Arc;

use alert_common::SeverityTier;
use axum::{
    extract::{Extension, Query},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use ingestion::{
    event_catalog, map_layers, AlertFilter, CycleState, EventCount, MapLayer, NormalizedAlert,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::{AlertStore, CycleRecord};

/// Severity query value that disables severity filtering.
const ALL_SEVERITIES: &str = "all";

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct AlertsResponse<'a> {
    pub count: usize,
    pub updated_at: Option<DateTime<Utc>>,
    pub alerts: Vec<&'a NormalizedAlert>,
}

#[derive(Debug, Serialize)]
pub struct MapResponse {
    pub count: usize,
    pub layers: Vec<MapLayer>,
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<EventCount>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub service: String,
    pub source: String,
    pub cycle_state: CycleState,
    pub poll_interval_secs: u64,
    pub alert_count: usize,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_cycle: Option<CycleRecord>,
    pub recent_cycles: Vec<CycleRecord>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

// ============================================================================
// Query Parameters
// ============================================================================

/// Alert selection. Omitted parameters fall back to the dashboard defaults
/// (Spanish, yellow and above).
#[derive(Debug, Default, Deserialize)]
pub struct AlertsQuery {
    /// Language prefix; empty matches every language.
    pub lang: Option<String>,
    /// Comma-separated tiers, or `all`.
    pub severity: Option<String>,
    /// Exact event name.
    pub event: Option<String>,
    /// Comma-separated preferred event types (partial match).
    pub event_type: Option<String>,
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value.split(',').map(str::trim).filter(|s| !s.is_empty())
}

impl AlertsQuery {
    pub fn to_filter(&self) -> Result<AlertFilter, String> {
        let mut filter = AlertFilter::default();

        if let Some(lang) = &self.lang {
            filter.language = lang.trim().to_string();
        }

        // An empty value keeps the default tiers.
        let severity = self
            .severity
            .as_deref()
            .filter(|s| split_list(s).next().is_some());
        if let Some(severity) = severity {
            filter.severities = if severity.trim().eq_ignore_ascii_case(ALL_SEVERITIES) {
                vec![
                    SeverityTier::Red,
                    SeverityTier::Orange,
                    SeverityTier::Yellow,
                    SeverityTier::Green,
                    SeverityTier::Unknown,
                ]
            } else {
                split_list(severity)
                    .map(|s| s.to_lowercase().parse::<SeverityTier>().map_err(|e| e.to_string()))
                    .collect::<Result<Vec<_>, _>>()?
            };
        }

        if let Some(event_type) = &self.event_type {
            filter.event_types = split_list(event_type).map(str::to_string).collect();
        }

        filter.selected_event = self
            .event
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string);

        Ok(filter)
    }
}

// ============================================================================
// Shared State
// ============================================================================

pub struct ServerState {
    pub store: Arc<AlertStore>,
    pub cycle_state: watch::Receiver<CycleState>,
    pub source_name: String,
    pub poll_interval_secs: u64,
    /// Absent when no recorder is installed (tests).
    pub prometheus: Option<PrometheusHandle>,
}

// ============================================================================
// Router
// ============================================================================

/// Create the API router.
pub fn create_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/alerts", get(alerts_handler))
        .route("/alerts/map", get(map_handler))
        .route("/events", get(events_handler))
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(Extension(state))
}

// ============================================================================
// Handlers
// ============================================================================

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message })).into_response()
}

/// GET /alerts - Current alerts matching the query
async fn alerts_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Query(query): Query<AlertsQuery>,
) -> Response {
    let filter = match query.to_filter() {
        Ok(filter) => filter,
        Err(e) => return bad_request(e),
    };

    let snapshot = state.store.snapshot();
    let alerts = filter.apply(&snapshot.alerts);

    Json(AlertsResponse {
        count: alerts.len(),
        updated_at: snapshot.updated_at,
        alerts,
    })
    .into_response()
}

/// GET /alerts/map - Polygon layers, least severe first
async fn map_handler(
    Extension(state): Extension<Arc<ServerState>>,
    Query(query): Query<AlertsQuery>,
) -> Response {
    let filter = match query.to_filter() {
        Ok(filter) => filter,
        Err(e) => return bad_request(e),
    };

    let snapshot = state.store.snapshot();
    let layers = map_layers(filter.apply(&snapshot.alerts));

    Json(MapResponse {
        count: layers.len(),
        layers,
    })
    .into_response()
}

/// GET /events - Event names with counts
async fn events_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let snapshot = state.store.snapshot();
    Json(EventsResponse {
        events: event_catalog(&snapshot.alerts),
    })
}

/// GET /status - Poller status and recent cycles
async fn status_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let snapshot = state.store.snapshot();
    let cycle_state = *state.cycle_state.borrow();

    Json(StatusResponse {
        service: "alert-poller".to_string(),
        source: state.source_name.clone(),
        cycle_state,
        poll_interval_secs: state.poll_interval_secs,
        alert_count: snapshot.alerts.len(),
        updated_at: snapshot.updated_at,
        last_cycle: state.store.last_cycle().await,
        recent_cycles: state.store.recent_cycles(20).await,
    })
}

/// GET /health
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "alert-poller",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /metrics - Prometheus exposition
async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "metrics recorder not installed\n",
        )
            .into_response(),
    }
}

/// Run the HTTP server.
pub async fn run_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = create_router(state);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    info!(port = port, "Starting alert API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
