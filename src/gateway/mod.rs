//! Browser-facing HTTP surface.
//!
//! Every interaction renders the whole page again, like the upload sidebar
//! and chat panel were one form. Sessions are tracked with a cookie.

use crate::config::Config;
use crate::files::UploadedFile;
use crate::notice::Notice;
use crate::session::{Controller, Session, SessionStore, SharedSession, Speaker};
use anyhow::{Context, Result};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use minijinja::{context, Environment};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use uuid::Uuid;

const SESSION_COOKIE: &str = "filechat_session";

pub struct AppState {
    controller: Controller,
    sessions: SessionStore,
    templates: Environment<'static>,
}

impl AppState {
    pub fn new(controller: Controller, sessions: SessionStore) -> Result<Self> {
        let mut templates = Environment::new();
        templates
            .add_template("page.html", include_str!("page.html"))
            .context("Failed to load page template")?;
        Ok(Self { controller, sessions, templates })
    }
}

#[derive(Serialize)]
struct MessageView<'a> {
    user: bool,
    text: &'a str,
}

#[derive(Deserialize)]
struct ChatForm {
    #[serde(default)]
    message: String,
}

pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload))
        .route("/summarize", post(summarize))
        .route("/chat", post(chat))
        .route("/session/end", post(end_session))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
        .with_state(state)
}

/// Serve the UI until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let controller = Controller::from_config(&config)?;
    // Retried on first use if this fails.
    if let Err(e) = controller.documents().provision().await {
        warn!(error = %e, "vector index not available yet");
    }

    let sessions = SessionStore::new(Duration::from_secs(config.session.idle_timeout_secs));
    let state = Arc::new(AppState::new(controller, sessions)?);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    axum::serve(listener, router(state, config.gateway.max_upload_bytes))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutting down");
    }
}

fn session_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find_map(|v| Uuid::parse_str(v).ok())
}

/// The caller's session, or a new one (with restored context) when the cookie
/// is missing or stale. A new session comes with the cookie to set.
async fn resolve(state: &AppState, headers: &HeaderMap) -> (SharedSession, Vec<Notice>, Option<String>) {
    if let Some(session) = session_id(headers).and_then(|id| state.sessions.get(&id)) {
        return (session, Vec::new(), None);
    }
    let (session, notices) = state.controller.start_session().await;
    let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", session.id());
    (state.sessions.insert(session), notices, Some(cookie))
}

fn page(
    state: &AppState,
    session: &Session,
    notices: &[Notice],
    cookie: Option<String>,
    status: StatusCode,
) -> Response {
    let messages: Vec<MessageView> = session
        .transcript()
        .map(|(speaker, text)| MessageView { user: speaker == Speaker::User, text })
        .collect();
    let rendered = state.templates.get_template("page.html").and_then(|t| {
        t.render(context! {
            notices => notices,
            messages => messages,
            files => session.uploaded_files,
            context_chars => session.file_content.chars().count(),
        })
    });

    let mut response = match rendered {
        Ok(html) => (status, Html(html)).into_response(),
        Err(e) => {
            error!(error = %e, "failed to render page");
            return (StatusCode::INTERNAL_SERVER_ERROR, "failed to render page").into_response();
        }
    };
    if let Some(value) = cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().insert(SET_COOKIE, value);
    }
    response
}

async fn index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (shared, notices, cookie) = resolve(&state, &headers).await;
    let session = shared.lock().await;
    page(&state, &session, &notices, cookie, StatusCode::OK)
}

async fn upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    let (shared, mut notices, cookie) = resolve(&state, &headers).await;

    let mut files = Vec::new();
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() != Some("files") {
                    continue;
                }
                // Browsers send an empty, unnamed part when nothing was picked.
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    continue;
                }
                match field.bytes().await {
                    Ok(data) => files.push(UploadedFile::new(filename, data.to_vec())),
                    Err(e) => {
                        notices.push(Notice::error(format!("Upload of {filename} failed: {e}")));
                        break;
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                notices.push(Notice::error(format!("Upload failed: {e}")));
                break;
            }
        }
    }

    let mut session = shared.lock().await;
    info!(session = %session.id(), files = files.len(), "upload");
    notices.extend(state.controller.upload(&mut session, files).await);
    page(&state, &session, &notices, cookie, StatusCode::OK)
}

async fn summarize(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let (shared, mut notices, cookie) = resolve(&state, &headers).await;
    let session = shared.lock().await;
    notices.extend(state.controller.summarize(&session));
    page(&state, &session, &notices, cookie, StatusCode::OK)
}

async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let (shared, mut notices, cookie) = resolve(&state, &headers).await;
    let mut session = shared.lock().await;

    // UI guard: the controller itself accepts any text.
    if form.message.trim().is_empty() {
        notices.push(Notice::warning("Type a question first."));
        return page(&state, &session, &notices, cookie, StatusCode::OK);
    }

    match state.controller.submit(&mut session, &form.message).await {
        Ok(_) => page(&state, &session, &notices, cookie, StatusCode::OK),
        Err(e) => {
            error!(session = %session.id(), error = %e, "chat turn failed");
            notices.push(Notice::error(format!("The assistant could not answer: {e}")));
            page(&state, &session, &notices, cookie, StatusCode::BAD_GATEWAY)
        }
    }
}

async fn end_session(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(id) = session_id(&headers) {
        if state.sessions.remove(&id) {
            info!(session = %id, "session ended");
        }
    }
    let mut response = Redirect::to("/").into_response();
    response.headers_mut().insert(
        SET_COOKIE,
        HeaderValue::from_static("filechat_session=; Path=/; Max-Age=0"),
    );
    response
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
