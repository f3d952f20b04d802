// API Server
//
// Binds the JSON API on the base port and one WebSocket stream listener per
// view on the three ports above it: lite, full, domains-only.

use crate::api::routes;
use crate::api::state::AppState;
use crate::api::ws::{self, WsEndpoint};
use crate::constants::{DOMAINS_PORT_OFFSET, FULL_PORT_OFFSET, LITE_PORT_OFFSET};
use crate::ct::record::StreamView;
use crate::Result;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// HTTP API plus the three stream listeners
pub struct ApiServer {
    state: Arc<AppState>,
    host: String,
    port: u16,
    ping_timeout: Duration,
}

impl ApiServer {
    pub fn new(state: Arc<AppState>, host: &str, port: u16, ping_timeout: Duration) -> Self {
        Self {
            state,
            host: host.to_string(),
            port,
            ping_timeout,
        }
    }

    /// Build the JSON API router
    fn build_router(&self) -> Router {
        Router::new()
            .route("/latest.json", get(routes::latest_certificates))
            .route("/example.json", get(routes::example_certificate))
            .route("/stats", get(routes::stats))
            .route("/health", get(routes::health))
            .layer(CompressionLayer::new())
            .layer(TraceLayer::new_for_http())
            .with_state(Arc::clone(&self.state))
    }

    /// Serve until the process exits
    ///
    /// The stream listeners run as background tasks; a listener that fails to
    /// bind logs and leaves the other endpoints up.
    pub async fn run(self) -> Result<()> {
        for (view, offset) in [
            (StreamView::Lite, LITE_PORT_OFFSET),
            (StreamView::Full, FULL_PORT_OFFSET),
            (StreamView::DomainsOnly, DOMAINS_PORT_OFFSET),
        ] {
            let endpoint = Arc::new(WsEndpoint {
                broker: Arc::clone(&self.state.broker),
                view,
                ping_timeout: self.ping_timeout,
            });
            let addr = format!("{}:{}", self.host, self.port + offset);

            tokio::spawn(async move {
                if let Err(e) = serve_stream(endpoint, addr.clone()).await {
                    error!("Stream listener on {} failed: {}", addr, e);
                }
            });
        }

        let app = self.build_router();
        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("CertWire API listening on {}", addr);
        info!(
            "Stream endpoints: lite :{}, full :{}, domains-only :{}",
            self.port + LITE_PORT_OFFSET,
            self.port + FULL_PORT_OFFSET,
            self.port + DOMAINS_PORT_OFFSET
        );

        axum::serve(listener, app).await?;
        Ok(())
    }
}

/// Bind one WebSocket listener for a single view
async fn serve_stream(endpoint: Arc<WsEndpoint>, addr: String) -> Result<()> {
    let view = endpoint.view;
    let app = Router::new()
        .route("/", get(ws::stream_handler))
        .with_state(endpoint);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("{} stream listening on {}", view, addr);

    axum::serve(listener, app).await?;
    Ok(())
}
