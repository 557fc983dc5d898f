use crate::config::ServerConfig;
use crate::domain::{DEFAULT_RECENT_ACTIVITY_LIMIT, DerivedMessage, DerivedToolCall, TimelineEntry};
use crate::infra::{SessionStore, StoreError};
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use serde::{Deserialize, Serialize};
use std::io;
use std::net::SocketAddr;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

pub const SERVICE_NAME: &str = "Agent Operations Dashboard API";
const DEFAULT_EVENTS_LIMIT: usize = 100;
const SPA_INDEX: &str = "index.html";

#[derive(Clone, Debug)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub static_dir: Option<Arc<PathBuf>>,
}

impl AppState {
    pub fn new(store: SessionStore, static_dir: Option<PathBuf>) -> Self {
        Self {
            store: Arc::new(store),
            static_dir: static_dir.map(Arc::new),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("Session not found")]
    SessionNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::SessionNotFound => StatusCode::NOT_FOUND,
            Self::Store(_) | Self::Join(_) => {
                tracing::error!(error = %self, "request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        detail_response(status, &self.to_string())
    }
}

fn detail_response(status: StatusCode, detail: &str) -> Response {
    (status, Json(serde_json::json!({ "detail": detail }))).into_response()
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    #[serde(default = "default_events_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_events_limit() -> usize {
    DEFAULT_EVENTS_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    #[serde(default = "default_activity_limit")]
    pub limit: usize,
}

fn default_activity_limit() -> usize {
    DEFAULT_RECENT_ACTIVITY_LIMIT
}

#[derive(Debug, Serialize)]
struct TimelineResponse {
    session_id: String,
    timeline: Vec<TimelineEntry>,
    total_events: usize,
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    session_id: String,
    messages: Vec<DerivedMessage>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct ToolCallsResponse {
    session_id: String,
    tool_calls: Vec<DerivedToolCall>,
    total: usize,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{session_id}", get(session_details))
        .route("/api/sessions/{session_id}/events", get(session_events))
        .route("/api/sessions/{session_id}/timeline", get(session_timeline))
        .route("/api/sessions/{session_id}/messages", get(session_messages))
        .route("/api/sessions/{session_id}/tool-calls", get(session_tool_calls))
        .route("/api/analytics/overview", get(analytics_overview))
        .route("/api/recent-activity", get(recent_activity))
        .fallback(static_fallback)
        .layer(middleware::map_response(allow_any_origin))
        .with_state(state)
}

/// Runs a blocking store read off the async executor.
async fn with_store<T, F>(state: &AppState, read: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&SessionStore) -> Result<T, StoreError> + Send + 'static,
{
    let store = Arc::clone(&state.store);
    let value = tokio::task::spawn_blocking(move || read(store.as_ref())).await??;
    Ok(value)
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "ok": true }))
}

async fn list_sessions(State(state): State<AppState>) -> Result<Response, ApiError> {
    let runs = with_store(&state, |store| store.list_runs()).await?;
    tracing::debug!(count = runs.len(), "listed sessions");
    Ok(Json(runs).into_response())
}

async fn session_details(
    UrlPath(session_id): UrlPath<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let id = session_id.clone();
    let details = with_store(&state, move |store| store.run_details(&id)).await?;
    if details.run.id.is_empty() {
        return Err(ApiError::SessionNotFound);
    }
    tracing::debug!(
        session_id = %session_id,
        status = details.run.status.as_str(),
        events = details.events.len(),
        "session details"
    );
    Ok(Json(details).into_response())
}

async fn session_events(
    UrlPath(session_id): UrlPath<String>,
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let page = with_store(&state, move |store| {
        store.session_events(&session_id, query.limit, query.offset)
    })
    .await?;
    Ok(Json(page).into_response())
}

async fn session_timeline(
    UrlPath(session_id): UrlPath<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let id = session_id.clone();
    let details = with_store(&state, move |store| store.run_details(&id)).await?;
    Ok(Json(TimelineResponse {
        session_id,
        total_events: details.events.len(),
        timeline: details.timeline,
    })
    .into_response())
}

async fn session_messages(
    UrlPath(session_id): UrlPath<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let id = session_id.clone();
    let details = with_store(&state, move |store| store.run_details(&id)).await?;
    Ok(Json(MessagesResponse {
        session_id,
        total: details.messages.len(),
        messages: details.messages,
    })
    .into_response())
}

async fn session_tool_calls(
    UrlPath(session_id): UrlPath<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let id = session_id.clone();
    let details = with_store(&state, move |store| store.run_details(&id)).await?;
    Ok(Json(ToolCallsResponse {
        session_id,
        total: details.tool_calls.len(),
        tool_calls: details.tool_calls,
    })
    .into_response())
}

async fn analytics_overview(State(state): State<AppState>) -> Result<Response, ApiError> {
    let overview = with_store(&state, |store| store.overview()).await?;
    Ok(Json(overview).into_response())
}

async fn recent_activity(
    Query(query): Query<ActivityQuery>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let activity = with_store(&state, move |store| store.recent_activity(query.limit)).await?;
    Ok(Json(activity).into_response())
}

async fn allow_any_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}

/// Serves the built frontend, falling back to `index.html` for client-side routes.
async fn static_fallback(State(state): State<AppState>, uri: Uri) -> Response {
    let path = uri.path();
    let Some(static_dir) = state.static_dir.as_deref() else {
        return detail_response(StatusCode::NOT_FOUND, "Not Found");
    };
    if path == "/api" || path.starts_with("/api/") {
        return detail_response(StatusCode::NOT_FOUND, "Not Found");
    }

    let file_path = resolve_static_file(static_dir, path)
        .await
        .unwrap_or_else(|| static_dir.join(SPA_INDEX));

    match tokio::fs::read(&file_path).await {
        Ok(bytes) => (
            [(header::CONTENT_TYPE, content_type_for(&file_path))],
            bytes,
        )
            .into_response(),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            detail_response(StatusCode::NOT_FOUND, "Not Found")
        }
        Err(error) => {
            tracing::error!(path = %file_path.display(), error = %error, "failed to read static file");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn resolve_static_file(static_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let relative = Path::new(request_path.trim_start_matches('/'));
    if relative.as_os_str().is_empty() {
        return None;
    }
    if !relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return None;
    }

    let candidate = static_dir.join(relative);
    let metadata = tokio::fs::metadata(&candidate).await.ok()?;
    metadata.is_file().then_some(candidate)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg") => "image/jpg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("eot") => "application/vnd.ms-fontobject",
        _ => "application/octet-stream",
    }
}

pub async fn run_http_server(config: ServerConfig) -> Result<(), ServeError> {
    let store = SessionStore::new(config.sessions_dir.clone(), config.line_policy);
    let app = build_router(AppState::new(store, config.static_dir.clone()));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.bind,
            source,
        })?;

    tracing::info!(
        addr = %config.bind,
        sessions_dir = %config.sessions_dir.display(),
        static_dir = ?config.static_dir,
        line_policy = ?config.line_policy,
        "serving"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServeError::Serve)
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
