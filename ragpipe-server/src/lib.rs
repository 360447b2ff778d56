//! `ragpipe-server` exposes a [`RagService`] over HTTP.
//!
//! Routes: `GET /` (question page), `POST /ask`, `POST /ingest`, `GET /health`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::{get, post},
};
use ragpipe_core::{Document, IngestReport, RagService, ServerSettings};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RagService>,
}

impl AppState {
    pub fn new(service: Arc<RagService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AskRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub id: String,
    pub text: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ask", post(ask))
        .route("/ingest", post(ingest))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind `config.host:config.port` and serve until Ctrl-C.
pub async fn run_server(service: Arc<RagService>, config: &ServerSettings) -> anyhow::Result<()> {
    let app = app_router(AppState::new(service));
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for ragpipe server")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("ragpipe listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Html(include_str!("../ui/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"healthy","service":"ragpipe"}))
}

async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, (StatusCode, Json<Value>)> {
    let query = request.query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "Missing query parameter"})),
        ));
    }

    let answer = state.service.answer(&query).await;
    Ok(Json(AskResponse { answer }))
}

async fn ingest(
    State(state): State<AppState>,
    Json(request): Json<IngestRequest>,
) -> Result<Json<IngestReport>, (StatusCode, Json<Value>)> {
    let document = Document::new(request.id, request.text);
    state.service.ingest(&document).await.map(Json).map_err(|e| {
        error!(document.id = %document.id, error = %e, "ingest request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": e.to_string()})))
    })
}
