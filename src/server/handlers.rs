use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path as UrlPath, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, header};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ReadError;
use crate::explain::{Explainer, Explanation};
use crate::ocr::decode_image_b64;
use crate::reader::{CaptureAnalysis, Reader};
use crate::settings::Settings;

use super::models::{CaptureForm, ErrorResponse, ExplainForm};
use super::state::ServerState;

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }
}

impl From<ReadError> for ServerError {
    fn from(err: ReadError) -> Self {
        let status = if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

pub async fn run_server(settings: Settings, explainer: Explainer) -> Result<()> {
    match settings.ocr.tesseract().missing_languages() {
        Ok(missing) if missing.is_empty() => {}
        Ok(missing) => warn!(
            "tesseract is missing language data: {} (install the jpn/jpn_vert traineddata)",
            missing.join(", ")
        ),
        Err(err) => warn!("could not list tesseract languages: {:#}", err),
    }

    let server = &settings.server;
    let state = ServerState {
        reader: Reader::from_settings(&settings),
        explainer,
        index: server.index.clone(),
        static_dir: server.static_dir.clone(),
    };
    let listener = tokio::net::TcpListener::bind(&server.addr)
        .await
        .with_context(|| format!("failed to bind server address {}", server.addr))?;
    info!("listening on {}", server.addr);
    axum::serve(listener, router(state, server.max_body_bytes)).await?;
    Ok(())
}

/// Routes of the service; request bodies are capped at `max_body_bytes`.
pub fn router(state: ServerState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/static/*path", get(static_file))
        .route("/health", get(health))
        .route("/capture_analyze", post(capture_analyze))
        .route("/explain_gpt", post(explain_gpt))
        .with_state(Arc::new(state))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(axum::middleware::from_fn(cors_middleware))
}

async fn index(State(state): State<Arc<ServerState>>) -> Result<Html<String>, ServerError> {
    std::fs::read_to_string(&state.index)
        .map(Html)
        .map_err(|err| {
            warn!("failed to read {}: {}", state.index.display(), err);
            ServerError::not_found(format!("index page not found: {}", state.index.display()))
        })
}

async fn static_file(
    State(state): State<Arc<ServerState>>,
    UrlPath(path): UrlPath<String>,
) -> Result<impl IntoResponse, ServerError> {
    let not_found = || ServerError::not_found(format!("not found: /static/{}", path));
    let file = static_path(&state.static_dir, &path).ok_or_else(not_found)?;
    let bytes = std::fs::read(&file).map_err(|_| not_found())?;
    Ok(([(header::CONTENT_TYPE, content_type(&file))], bytes))
}

/// Resolves `requested` below `root`; anything but plain path segments is refused.
fn static_path(root: &Path, requested: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    let mut segments = 0;
    for component in Path::new(requested).components() {
        match component {
            Component::Normal(segment) => {
                path.push(segment);
                segments += 1;
            }
            _ => return None,
        }
    }
    (segments > 0).then_some(path)
}

fn content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js" | "mjs") => "text/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("woff2") => "font/woff2",
        _ => "application/octet-stream",
    }
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("*"),
    );
}

async fn capture_analyze(
    State(state): State<Arc<ServerState>>,
    Form(form): Form<CaptureForm>,
) -> Result<Json<CaptureAnalysis>, ServerError> {
    let reader = state.reader.clone();
    let analysis = tokio::task::spawn_blocking(move || {
        let request = form.capture_request();
        let image = decode_image_b64(&form.image_b64)?;
        reader.analyze(image, &request)
    })
    .await
    .map_err(|err| ServerError::internal(format!("server task failed: {}", err)))?;

    match analysis {
        Ok(analysis) => Ok(Json(analysis)),
        Err(err) => {
            warn!("capture analysis failed: {}", err);
            Err(err.into())
        }
    }
}

async fn explain_gpt(
    State(state): State<Arc<ServerState>>,
    Form(form): Form<ExplainForm>,
) -> Json<Explanation> {
    Json(
        state
            .explainer
            .explain(&form.japanese, &form.context_hint)
            .await,
    )
}
