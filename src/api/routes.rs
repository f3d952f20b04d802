// JSON API Routes

use crate::api::state::AppState;
use crate::ct::record::Record;
use crate::stream::broker::ClientCounts;
use crate::stream::buffer::BufferStats;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Response body of `/latest.json`
#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub certificates: Vec<Record>,
    pub count: usize,
}

/// Buffered records, newest-first, up to the buffer capacity
pub async fn latest_certificates(State(state): State<Arc<AppState>>) -> Json<LatestResponse> {
    let certificates: Vec<Record> = state
        .buffer
        .latest(None)
        .iter()
        .map(|record| (**record).clone())
        .collect();
    let count = certificates.len();

    Json(LatestResponse {
        certificates,
        count,
    })
}

/// The most recently buffered record, or 404 while the buffer is empty
pub async fn example_certificate(State(state): State<Arc<AppState>>) -> Response {
    match state.buffer.example() {
        Some(record) => Json((*record).clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "No certificates available yet"})),
        )
            .into_response(),
    }
}

/// Response body of `/stats`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub buffer: BufferStats,
    pub clients: ClientsSection,
    pub config: crate::api::state::ConfigSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ClientsSection {
    pub clients: ClientCounts,
    pub max_clients_per_endpoint: usize,
}

/// Buffer, subscriber, and configuration statistics
pub async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        buffer: state.buffer.stats(),
        clients: ClientsSection {
            clients: state.broker.client_counts(),
            max_clients_per_endpoint: state.broker.max_clients_per_endpoint(),
        },
        config: state.config.clone(),
    })
}

/// Health check endpoint
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}
