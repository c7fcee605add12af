use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;

mod config;
mod models;
mod research;
mod upstream;

use config::{Config, ConfigError};
use models::{ErrorBody, ResearchRequest, ResearchResponse};
use upstream::{HttpUpstream, Upstream, UpstreamError};

const METHOD_NOT_ALLOWED: &str = "Method not allowed";
const INTERNAL_ERROR: &str = "Internal server error";

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] UpstreamError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;
    tracing::info!(
        retriever = %config.retriever_url,
        answerer = %config.answerer_url,
        timeout_secs = config.request_timeout.as_secs(),
        "configuration loaded"
    );

    let upstream: Arc<dyn Upstream> = Arc::new(HttpUpstream::new(&config)?);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(upstream))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("server stopped");
    Ok(())
}

fn router(upstream: Arc<dyn Upstream>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/researcher",
            post(research_endpoint).fallback(method_not_allowed),
        )
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(upstream)
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn research_endpoint(
    State(upstream): State<Arc<dyn Upstream>>,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            tracing::error!(error = %rejection, "unreadable request body");
            return internal_error();
        }
    };

    tracing::debug!(links = ?req.links, questions = ?req.questions, "research request");

    match research::process(upstream.as_ref(), &req.links, &req.questions).await {
        Ok(answers) => (StatusCode::OK, Json(ResearchResponse { answers })).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "research failed");
            internal_error()
        }
    }
}

async fn method_not_allowed() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(ErrorBody::new(METHOD_NOT_ALLOWED)),
    )
        .into_response()
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody::new(INTERNAL_ERROR)),
    )
        .into_response()
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "handler panicked");
    internal_error()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
