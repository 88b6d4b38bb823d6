//! HTTP read endpoint
//!
//! Serves the latest snapshot and lets operators adjust thresholds at runtime.
//!
//! ## Endpoints
//!
//! - `GET /sys_health` - Plain-text health report
//! - `GET /api/v1/snapshot` - Latest snapshot as JSON (404 before the first tick)
//! - `GET /api/v1/health` - Health check including the scheduler state
//! - `GET /api/v1/thresholds` - Active thresholds
//! - `PUT /api/v1/thresholds` - Partial threshold update

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{HealthResponse, ThresholdsRequest, ThresholdsResponse};

#[cfg(feature = "api")]
use axum::{Router, routing::get};
#[cfg(feature = "api")]
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
#[cfg(feature = "api")]
use tracing::{error, info};

use std::net::SocketAddr;

use crate::util::get_default_bind_addr;
#[cfg(feature = "api")]
use crate::{HealthError, HealthResult};

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "127.0.0.1:51243")
    pub bind_addr: SocketAddr,

    /// Optional authentication token
    pub auth_token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: get_default_bind_addr(),
            auth_token: None,
        }
    }
}

/// Build the router with all routes and middleware
#[cfg(feature = "api")]
pub fn router(state: ApiState, auth_token: Option<String>) -> Router {
    use tower_http::trace::TraceLayer;

    let mut app = Router::new()
        .route("/sys_health", get(routes::report::sys_health))
        .route("/api/v1/snapshot", get(routes::snapshot::get_snapshot))
        .route("/api/v1/health", get(routes::health::health_check))
        .route(
            "/api/v1/thresholds",
            get(routes::thresholds::get_thresholds).put(routes::thresholds::put_thresholds),
        )
        .with_state(state);

    if let Some(token) = auth_token {
        app = app.layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::require_token,
        ));
    }

    app.layer(TraceLayer::new_for_http())
}

/// Register the endpoint by binding its listener.
///
/// Done before anything else is started, so a taken port fails fast.
#[cfg(feature = "api")]
pub async fn bind(addr: SocketAddr) -> HealthResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| HealthError::RegistrationFailed(format!("cannot bind {addr}: {e}")))
}

/// A running API server
#[cfg(feature = "api")]
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

#[cfg(feature = "api")]
impl ApiServer {
    /// Address the server actually listens on
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections, let in-flight requests finish, and wait
    /// for the server task to exit.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            error!("API server task failed: {e}");
        }
        info!("API server on {} stopped", self.addr);
    }
}

/// Serve the API on an already bound listener in a background task
#[cfg(feature = "api")]
pub fn spawn_api_server(
    listener: TcpListener,
    config: &ApiConfig,
    state: ApiState,
) -> HealthResult<ApiServer> {
    let addr = listener
        .local_addr()
        .map_err(|e| HealthError::RegistrationFailed(e.to_string()))?;
    let app = router(state, config.auth_token.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    info!("API server listening on {addr}");

    let task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        if let Err(e) = server.await {
            error!("API server error: {e}");
        }
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
