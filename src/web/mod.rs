//! HTTP front end
//!
//! Accepts transcription jobs from the HTML form or JSON, queues them on the
//! shared [`TaskExecutor`] and answers status polls.

mod handlers;
mod routes;

pub use routes::create_router;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::AppConfig;
use crate::error::{Error, ErrorCode, Result};
use crate::executor::TaskExecutor;
use crate::transcription::PipelineContext;

/// State shared with every handler
#[derive(Clone, Debug)]
pub struct AppState {
    pub executor: TaskExecutor,
    pub pipeline: PipelineContext,
}

impl AppState {
    pub fn new(executor: TaskExecutor, pipeline: PipelineContext) -> Self {
        Self { executor, pipeline }
    }
}

/// Bind the configured address and serve until Ctrl+C
pub async fn serve(config: &AppConfig, executor: TaskExecutor) -> Result<()> {
    let pipeline = PipelineContext::from_config(config)?;
    let app = create_router(AppState::new(executor, pipeline));

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down...");
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.code() {
            ErrorCode::TaskNotFound => StatusCode::NOT_FOUND,
            ErrorCode::InvalidRequest | ErrorCode::InvalidUrl => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
