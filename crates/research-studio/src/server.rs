use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Form, State};
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use shared::{AppError, Pipeline, PostStyle, ResearchSession, SearchFilters, SessionStore};

use crate::page::{self, PageContext};

pub const SESSION_COOKIE: &str = "studio_session";

pub struct AppState {
    pub pipeline: Pipeline,
    pub sessions: SessionStore,
    pub model_name: String,
    pub default_days_back: u32,
}

impl AppState {
    pub fn new(pipeline: Pipeline, model_name: impl Into<String>, default_days_back: u32) -> Self {
        Self {
            pipeline,
            sessions: SessionStore::new(),
            model_name: model_name.into(),
            default_days_back,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ResearchForm {
    topic: String,
    days_back: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    angle: Option<String>,
    custom_angle: Option<String>,
    style: String,
}

/// The draft textarea. Every draft action saves the edit before running.
#[derive(Debug, Default, Deserialize)]
pub struct DraftForm {
    body: Option<String>,
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/research", post(handle_research))
        .route("/generate", post(handle_generate))
        .route("/regenerate", post(handle_regenerate))
        .route("/hook", post(handle_hook))
        .route("/edit", post(handle_edit))
        .route("/reset", post(handle_reset))
        .route("/download", get(handle_download).post(handle_download_edited))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(state: Arc<AppState>, bind: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    info!(address = %bind, "research studio listening");

    axum::serve(listener, build_router(state))
        .await
        .context("server stopped unexpectedly")
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| Uuid::parse_str(value.trim()).ok())
}

/// Attach the session cookie when the browser does not already carry it.
fn with_session_cookie(mut response: Response, id: Uuid, known: Option<Uuid>) -> Response {
    if known == Some(id) {
        return response;
    }
    let cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", SESSION_COOKIE, id);
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

fn back_to_page(id: Uuid, known: Option<Uuid>) -> Response {
    with_session_cookie(Redirect::to("/").into_response(), id, known)
}

fn back_home() -> Response {
    Redirect::to("/").into_response()
}

fn attachment(file_name: String, body: String) -> Response {
    (
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        body,
    )
        .into_response()
}

/// Apply the submitted draft text, if any. Errors land in the banner.
fn apply_edit(session: &mut ResearchSession, form: &DraftForm) -> bool {
    match form.body.as_deref() {
        Some(body) => session.edit_draft(body).is_ok(),
        None => true,
    }
}

async fn handle_index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let sources = state.pipeline.collector.source_names();
    let render = |session: &ResearchSession| {
        page::render(&PageContext {
            session,
            sources: &sources,
            model_name: &state.model_name,
            default_days_back: state.default_days_back,
        })
    };

    // no session until the first research request
    let html = match state.sessions.get(session_id(&headers)).await {
        Some(session) => render(&*session.lock().await),
        None => render(&ResearchSession::new(Uuid::nil())),
    };

    ([(CACHE_CONTROL, "no-store")], Html(html)).into_response()
}

async fn handle_research(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ResearchForm>,
) -> Response {
    let known = session_id(&headers);
    let (id, session) = state.sessions.get_or_create(known).await;
    let mut session = session.lock().await;

    let filters = SearchFilters {
        days_back: form.days_back.as_deref().and_then(|d| d.trim().parse().ok()),
        ..SearchFilters::default()
    };
    // failures land in the session banner
    let _ = session
        .start_research(&state.pipeline, &form.topic, filters)
        .await;

    back_to_page(id, known)
}

async fn handle_generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<GenerateForm>,
) -> Response {
    let Some(session) = state.sessions.get(session_id(&headers)).await else {
        return back_home();
    };
    let mut session = session.lock().await;

    let Some(style) = PostStyle::from_slug(&form.style) else {
        session.record_error(&AppError::InvalidInput(format!(
            "Unknown post style \"{}\"",
            form.style
        )));
        return back_home();
    };

    // a typed angle wins over the radio choice
    let angle = form
        .custom_angle
        .filter(|a| !a.trim().is_empty())
        .or(form.angle)
        .unwrap_or_default();

    let _ = session.generate_post(&state.pipeline, &angle, style).await;
    back_home()
}

async fn handle_regenerate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<DraftForm>,
) -> Response {
    let Some(session) = state.sessions.get(session_id(&headers)).await else {
        return back_home();
    };
    let mut session = session.lock().await;
    if apply_edit(&mut session, &form) {
        let _ = session.regenerate(&state.pipeline).await;
    }
    back_home()
}

async fn handle_hook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<DraftForm>,
) -> Response {
    let Some(session) = state.sessions.get(session_id(&headers)).await else {
        return back_home();
    };
    let mut session = session.lock().await;
    if apply_edit(&mut session, &form) {
        let _ = session.improve_hook(&state.pipeline).await;
    }
    back_home()
}

async fn handle_edit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<DraftForm>,
) -> Response {
    if let Some(session) = state.sessions.get(session_id(&headers)).await {
        apply_edit(&mut *session.lock().await, &form);
    }
    back_home()
}

async fn handle_reset(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(session) = state.sessions.get(session_id(&headers)).await {
        session.lock().await.reset();
    }
    back_home()
}

async fn handle_download(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let download = match state.sessions.get(session_id(&headers)).await {
        Some(session) => session.lock().await.download(),
        None => None,
    };
    match download {
        Some((file_name, body)) => attachment(file_name, body),
        None => (StatusCode::NOT_FOUND, "No post to download yet").into_response(),
    }
}

/// Save the textarea contents, then download them.
async fn handle_download_edited(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<DraftForm>,
) -> Response {
    let Some(session) = state.sessions.get(session_id(&headers)).await else {
        return (StatusCode::NOT_FOUND, "No post to download yet").into_response();
    };
    let mut session = session.lock().await;
    if !apply_edit(&mut session, &form) {
        return back_home();
    }
    match session.download() {
        Some((file_name, body)) => attachment(file_name, body),
        None => (StatusCode::NOT_FOUND, "No post to download yet").into_response(),
    }
}

async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "model": state.model_name,
        "sources": state.pipeline.collector.source_names(),
        "sessions": state.sessions.len().await,
    }))
}
