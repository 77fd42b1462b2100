//! HTTP boundary: the relay's REST surface over axum.
//!
//! ```text
//! GET  /health     liveness
//! GET  /languages  {source: [...], target: [...]}
//! GET  /usage      {characterCount, characterLimit, documentCount, documentLimit}
//! POST /translate  multipart file + targetLang [+ sourceLang] → translated bytes
//! ```
//!
//! Every route is also mounted under `/api`. Errors are rendered as
//! `{error, message}` JSON with the status from
//! [`TranslateError::status_code`].

use crate::config::ServiceConfig;
use crate::credential::{resolver_for, CredentialResolver, ResolvedCredential};
use crate::error::TranslateError;
use crate::job::{SourceFile, TranslationRequest};
use crate::pipeline::naming;
use crate::pipeline::provider::{supported_languages, SupportedLanguages, UsageSnapshot};
use crate::translate::Orchestrator;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub credentials: Arc<dyn CredentialResolver>,
    api_key_header: HeaderName,
    max_upload_bytes: usize,
}

impl AppState {
    /// State for a server backed by the real provider.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, TranslateError> {
        let orchestrator = Orchestrator::from_config(config)?;
        Self::new(orchestrator, resolver_for(config), config)
    }

    /// State around an existing orchestrator (tests inject stub providers here).
    pub fn new(
        orchestrator: Orchestrator,
        credentials: Arc<dyn CredentialResolver>,
        config: &ServiceConfig,
    ) -> Result<Self, TranslateError> {
        let api_key_header = HeaderName::try_from(config.api_key_header.as_str())
            .map_err(|e| TranslateError::InvalidConfig(format!("api_key_header: {e}")))?;
        Ok(Self {
            orchestrator,
            credentials,
            api_key_header,
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    fn resolve_credential(&self, headers: &HeaderMap) -> Result<ResolvedCredential, TranslateError> {
        let supplied = headers
            .get(&self.api_key_header)
            .and_then(|v| v.to_str().ok());
        self.credentials.resolve(supplied)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for TranslateError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed with {}: {}", status.as_u16(), self);
        } else {
            warn!("Request rejected with {}: {}", status.as_u16(), self);
        }
        let body = ErrorBody {
            error: self.summary(),
            message: self.detail(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

/// Room on top of the file limit for multipart framing and the text fields.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the router, with every route under `/` and `/api`.
pub fn router(state: AppState, config: &ServiceConfig) -> Router {
    let cors = if config.cors_origins.is_empty() {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect();
        CorsLayer::new().allow_origin(origins)
    };
    let cors = cors
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([CONTENT_DISPOSITION]);

    let body_limit = state.max_upload_bytes.saturating_add(FORM_OVERHEAD_BYTES);
    Router::new()
        .merge(routes())
        .nest("/api", routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/languages", get(get_languages))
        .route("/usage", get(get_usage))
        .route("/translate", post(translate_document))
}

/// Bind `config.bind_addr` and serve until Ctrl-C.
pub async fn serve(config: ServiceConfig) -> Result<(), TranslateError> {
    let state = AppState::from_config(&config)?;
    let app = router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .map_err(|e| TranslateError::Internal(format!("bind {}: {e}", config.bind_addr)))?;
    info!(
        "Translation relay listening on {} ({:?} credentials)",
        config.bind_addr, config.credential_mode
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| TranslateError::Internal(format!("server: {e}")))?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, draining connections");
}

// -- Handlers --

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        message: "DeepL Wrapper API is running",
    })
}

async fn get_languages(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<SupportedLanguages>, TranslateError> {
    let credential = state.resolve_credential(&headers)?;
    let languages =
        supported_languages(state.orchestrator.provider().as_ref(), &credential).await?;
    Ok(Json(languages))
}

async fn get_usage(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<UsageSnapshot>, TranslateError> {
    let credential = state.resolve_credential(&headers)?;
    let usage = state.orchestrator.provider().usage(&credential).await?;
    Ok(Json(usage))
}

/// The credential is checked before the form is read, so a keyless
/// request is rejected without buffering its upload.
async fn translate_document(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, TranslateError> {
    let credential = state.resolve_credential(&headers)?;
    let mut multipart = multipart.map_err(|e| TranslateError::InvalidRequest(e.body_text()))?;
    let request = read_translate_form(&mut multipart, state.max_upload_bytes).await?;

    // Runs to completion even if the client disconnects.
    let orchestrator = state.orchestrator.clone();
    let task = tokio::spawn(async move { orchestrator.translate(request, &credential).await });
    let doc = task
        .await
        .map_err(|e| TranslateError::Internal(format!("translation task aborted: {e}")))??;

    let disposition = HeaderValue::from_str(&naming::content_disposition(&doc.file_name))
        .map_err(|e| TranslateError::Internal(format!("Content-Disposition: {e}")))?;
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, HeaderValue::from_static("application/octet-stream")),
            (CONTENT_DISPOSITION, disposition),
        ],
        doc.content,
    )
        .into_response())
}

/// Collect `file`, `targetLang` and `sourceLang`; other parts are ignored.
async fn read_translate_form(
    multipart: &mut Multipart,
    limit_bytes: usize,
) -> Result<TranslationRequest, TranslateError> {
    let form_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            TranslateError::UploadTooLarge { limit_bytes }
        } else {
            TranslateError::InvalidRequest(e.body_text())
        }
    };

    let mut file = None;
    let mut target_lang = None;
    let mut source_lang = None;

    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("document").to_string();
                let content = field.bytes().await.map_err(form_error)?;
                if content.len() > limit_bytes {
                    return Err(TranslateError::UploadTooLarge { limit_bytes });
                }
                file = Some(SourceFile::new(file_name, content));
            }
            Some("targetLang") => target_lang = Some(field.text().await.map_err(form_error)?),
            Some("sourceLang") => source_lang = Some(field.text().await.map_err(form_error)?),
            _ => {}
        }
    }

    TranslationRequest::new(file, target_lang, source_lang)
}
