//! The HTTP surface: the chat endpoint, CDS Hooks, and thread inspection.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use cdss_graph::{Checkpoint, GraphError, GraphInput, GuidelineGraph};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::cds::{self, Discovery, HookRequest, HookResponse, SERVICE_ID};
use crate::config::DEFAULT_THREAD_ID;
use crate::fhir::format_query_from_fhir;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8000 }
    }
}

/// Shared handler state. `graph` is `None` when startup could not build the
/// pipeline; every pipeline endpoint then answers 503.
#[derive(Clone)]
pub struct AppState {
    pub graph: Option<Arc<GuidelineGraph>>,
    pub unavailable_reason: String,
    pub guideline_path: PathBuf,
    pub frontend_url: Option<String>,
}

impl AppState {
    pub fn new(graph: Arc<GuidelineGraph>, guideline_path: impl Into<PathBuf>) -> Self {
        Self {
            graph: Some(graph),
            unavailable_reason: String::new(),
            guideline_path: guideline_path.into(),
            frontend_url: None,
        }
    }

    /// State for a server whose pipeline failed to initialise.
    pub fn unavailable(reason: impl Into<String>, guideline_path: impl Into<PathBuf>) -> Self {
        Self {
            graph: None,
            unavailable_reason: reason.into(),
            guideline_path: guideline_path.into(),
            frontend_url: None,
        }
    }

    pub fn with_frontend_url(mut self, frontend_url: Option<String>) -> Self {
        self.frontend_url = frontend_url;
        self
    }

    fn graph(&self) -> Result<&Arc<GuidelineGraph>, ApiError> {
        self.graph.as_ref().ok_or_else(|| ApiError::Unavailable(self.unavailable_reason.clone()))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("RAG application is not initialized: {0}")]
    Unavailable(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Pipeline(#[from] GraphError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Pipeline(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({"error": self.to_string()}))).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotResponse {
    pub output: String,
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/bot", post(bot))
        .route("/cds-services", get(discovery))
        .route("/cds-services/{service_id}", post(handle_hook))
        .route("/threads/{thread_id}", get(thread_state))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn run_server(config: ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = app_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| "invalid host/port for cdss server")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("cdss-server listening on http://{}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    Json(json!({"status":"ok","service":"cdss-server"}))
}

async fn bot(
    State(state): State<AppState>,
    Json(request): Json<BotRequest>,
) -> Result<Json<BotResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("message cannot be empty".to_string()));
    }
    let graph = state.graph()?;
    let thread_id = request.thread_id.as_deref().unwrap_or(DEFAULT_THREAD_ID);

    let output = graph
        .ask(thread_id, GraphInput::new(request.message, &state.guideline_path))
        .await
        .map_err(|e| {
            error!(thread_id, error = %e, "bot request failed");
            e
        })?;
    Ok(Json(BotResponse { output }))
}

async fn discovery() -> Json<Discovery> {
    Json(cds::discovery())
}

async fn handle_hook(
    Path(service_id): Path<String>,
    State(state): State<AppState>,
    Json(request): Json<HookRequest>,
) -> Result<Json<HookResponse>, ApiError> {
    if service_id != SERVICE_ID {
        return Err(ApiError::NotFound(format!("unknown CDS service '{service_id}'")));
    }
    let graph = state.graph()?;
    if request.hook != "patient-view" {
        warn!(hook = %request.hook, "unexpected hook for {SERVICE_ID}");
    }

    let query = format_query_from_fhir(&request.prefetch, Utc::now().date_naive());
    let detail = graph
        .ask(&request.hook_instance, GraphInput::new(query, &state.guideline_path))
        .await
        .map_err(|e| {
            error!(hook_instance = %request.hook_instance, error = %e, "CDS hook failed");
            e
        })?;

    let card = cds::guideline_card(detail, state.frontend_url.as_deref());
    Ok(Json(HookResponse { cards: vec![card] }))
}

async fn thread_state(
    Path(thread_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Checkpoint>, ApiError> {
    let graph = state.graph()?;
    graph
        .checkpointer()
        .latest(&thread_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no checkpoints for thread '{thread_id}'")))
}
