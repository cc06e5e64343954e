//! HTTP control plane.
//!
//! The controller manages this poller through a small JSON API: schedule a
//! task, inspect the queue, fetch result histories, delete a task.

mod errors;
mod handlers;
mod wire;

pub use errors::ApiError;
pub use handlers::ApiState;
pub use wire::TaskWire;

use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::queue::TaskQueue;
use crate::scheduler::{Archive, SchedulerHandle};

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9090,
        }
    }
}

impl ApiConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

/// Build the control-plane router.
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/tasks",
            get(handlers::get_tasks)
                .post(handlers::post_tasks)
                .delete(handlers::delete_task),
        )
        .route("/tasks/{id}", get(handlers::get_task))
        .route("/results", get(handlers::get_results))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Assemble the API state from the poller's collaborators.
pub fn create_api_state(
    queue: Arc<TaskQueue>,
    archive: Arc<Archive>,
    handle: SchedulerHandle,
) -> ApiState {
    ApiState {
        queue,
        archive,
        handle,
    }
}

/// Bind and serve the control plane; returns the spawned server task.
pub async fn start_server(
    config: ApiConfig,
    state: ApiState,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    let addr = config
        .socket_addr()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let router = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("control plane listening on http://{}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!("control plane server error: {}", e);
        }
    });

    Ok(handle)
}
