//! HTTP server: routing, shared state, and the access-log middleware.
//!
//! The server is a collaborator of the core: it turns HTTP requests into
//! [`crate::store::TaskStore`] calls, notifies the broadcaster after
//! successful mutations, and renders store state into pages, JSON, and SSE
//! streams.

pub mod handlers;
pub mod views;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::Router;

use crate::config::Config;
use crate::error::Result;
use crate::events::TaskBroadcaster;
use crate::store::TaskStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// The task store.
    pub store: Arc<TaskStore>,
    /// Broadcaster for task-change notifications.
    pub broadcaster: TaskBroadcaster,
}

impl AppState {
    /// Create state around a fresh store and broadcaster.
    #[must_use]
    pub fn new() -> Self {
        Self { store: Arc::new(TaskStore::new()), broadcaster: TaskBroadcaster::new() }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the application router.
#[must_use]
pub fn router(state: AppState, access_log: bool) -> Router {
    let mut app = Router::new()
        // Pages
        .route("/", get(handlers::get_index))
        .route("/archive", get(handlers::get_archive))
        // Healthchecks
        .route("/livez", get(handlers::get_livez))
        .route("/readyz", get(handlers::get_readyz))
        // API
        .route("/api/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route("/api/tasks/validate", post(handlers::validate_task))
        .route("/api/tasks/{id}", put(handlers::update_task).delete(handlers::delete_task))
        .route("/api/tasks/{id}/archive", post(handlers::archive_task))
        .route("/api/events", get(handlers::get_events))
        .with_state(state);

    if access_log {
        app = app.layer(middleware::from_fn(access_log_middleware));
    }
    app
}

/// Serve the application until the listener fails.
///
/// # Errors
///
/// Returns an error if the listener cannot bind or the server fails.
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "tasklight server listening");
    axum::serve(listener, router(state, config.access_log)).await?;
    Ok(())
}

/// Start the server on `addr`, returning the bound address and the serve
/// task. Binding to port 0 picks a free port; tests rely on this.
///
/// # Errors
///
/// Returns an error if the listener cannot bind.
pub async fn start(
    addr: &str,
    state: AppState,
    access_log: bool,
) -> Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    let app = router(state, access_log);
    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!(error = %err, "server error");
        }
    });

    Ok((bound_addr, handle))
}

/// Log method, path, status, and latency for each request.
async fn access_log_middleware(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        latency_ms = start.elapsed().as_millis(),
        "request"
    );
    response
}
