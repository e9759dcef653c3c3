//! HTTP service exposing the config store.
//!
//! # Endpoints
//! - `GET /config/{key}`: 200 with the raw stored bytes, 404 if never written
//! - `PUT /config/{key}`: stores the body verbatim and echoes it back
//!
//! Both successful answers carry `Content-Type: application/json`.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::configapi::{ConfigApiError, ConfigStore};

const MAX_VALUE_BYTES: usize = 1024 * 1024;

/// HTTP server for the config store.
pub struct ConfigServer {
    router: Router,
}

impl ConfigServer {
    /// Create a new server backed by `store`.
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            router: Self::build_router(store),
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(store: Arc<dyn ConfigStore>) -> Router {
        Router::new()
            .route(
                "/config/{key}",
                get(get_configuration).put(set_configuration),
            )
            .with_state(store)
            .layer(DefaultBodyLimit::max(MAX_VALUE_BYTES))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve on `listener` until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Config service starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Config service stopped");
        Ok(())
    }
}

fn json_response(body: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

async fn get_configuration(
    State(store): State<Arc<dyn ConfigStore>>,
    Path(key): Path<String>,
) -> Response {
    match store.get(&key) {
        Ok(value) => json_response(value),
        Err(ConfigApiError::NotFound(_)) => {
            tracing::debug!(key = %key, "Config key not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Failed to read config value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn set_configuration(
    State(store): State<Arc<dyn ConfigStore>>,
    Path(key): Path<String>,
    body: Bytes,
) -> Response {
    let value = body.to_vec();
    match store.set(&key, value.clone()) {
        Ok(()) => {
            tracing::debug!(key = %key, bytes = value.len(), "Config value updated");
            json_response(value)
        }
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Failed to write config value");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
