//! HTTP server exposing the probe endpoint.
//!
//! One exporter instance can front any number of printers: each scrape
//! request may name its own `target` and `modules`, falling back to the
//! configured defaults. The response body is one collection pass rendered
//! in Prometheus text format.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use parking_lot::RwLock;
use serde::Deserialize;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::client::HttpClient;
use crate::collector::Collector;
use crate::metrics::render;

/// Counters over the server's lifetime, reported at shutdown.
#[derive(Debug, Clone, Default)]
pub struct ScrapeStats {
    /// Probe requests served.
    pub scrapes: u64,
    /// Probe requests rejected for lack of a target.
    pub scrapes_rejected: u64,
    /// Samples emitted across all passes.
    pub samples_emitted: u64,
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    client: HttpClient,
    default_target: Option<String>,
    default_modules: Arc<Vec<String>>,
    stats: Arc<RwLock<ScrapeStats>>,
}

impl AppState {
    /// Create the shared server state.
    pub fn new(
        client: HttpClient,
        default_target: Option<String>,
        default_modules: Vec<String>,
    ) -> Self {
        Self {
            client,
            default_target,
            default_modules: Arc::new(default_modules),
            stats: Arc::new(RwLock::new(ScrapeStats::default())),
        }
    }

    /// Get a snapshot of the scrape statistics.
    pub fn stats(&self) -> ScrapeStats {
        self.stats.read().clone()
    }
}

/// Query parameters of the probe endpoint.
#[derive(Debug, Deserialize)]
struct ProbeParams {
    /// Moonraker target, `host[:port]` or a full URL.
    target: Option<String>,
    /// Comma-separated module names.
    modules: Option<String>,
}

/// Create the HTTP router.
fn create_router(state: AppState, probe_path: &str) -> Router {
    Router::new()
        .route(probe_path, get(probe_handler))
        .route("/health", get(health_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the probe endpoint: one collection pass per request.
async fn probe_handler(
    State(state): State<AppState>,
    Query(params): Query<ProbeParams>,
) -> Response {
    let Some(target) = params.target.or_else(|| state.default_target.clone()) else {
        state.stats.write().scrapes_rejected += 1;
        return (
            StatusCode::BAD_REQUEST,
            "missing target: pass ?target=<host[:port]> or configure a default\n",
        )
            .into_response();
    };

    let modules: Vec<String> = match &params.modules {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect(),
        None => state.default_modules.as_ref().clone(),
    };

    let collector = Collector::new(state.client.clone(), modules);
    let samples = collector.collect(&target).await;

    {
        let mut stats = state.stats.write();
        stats.scrapes += 1;
        stats.samples_emitted += samples.len() as u64;
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        render(&samples),
    )
        .into_response()
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// HTTP server for the probe endpoint.
pub struct HttpServer {
    state: AppState,
    listen_addr: SocketAddr,
    probe_path: String,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(state: AppState, listen_addr: SocketAddr, probe_path: String) -> Self {
        Self {
            state,
            listen_addr,
            probe_path,
        }
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        let router = create_router(self.state, &self.probe_path);

        let listener = tokio::net::TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        info!(
            addr = %self.listen_addr,
            path = %self.probe_path,
            "HTTP server listening"
        );

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
