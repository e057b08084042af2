// docshield/src/server.rs
//! HTTP surface over [`RedactionService`].
//!
//! Every route acts on behalf of the user named in the `x-user-id` header.
//! Failures are returned as `{"success": false, "kind": ..., "message": ...}`
//! where `kind` is [`DocshieldError::kind`].
//!
//! License: MIT OR APACHE 2.0

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use log::{error, info};
use serde::{Deserialize, Serialize};

use docshield_core::{
    DocshieldError, EnrichmentSummary, EntityUpdate, RedactedEntity, RedactionOutcome, RedactionReport,
    RedactionService, TemplateEnrichment,
};

/// Header naming the calling user.
pub const CALLER_HEADER: &str = "x-user-id";

/// Shared application state handed to every handler.
pub struct AppState {
    pub service: RedactionService,
}

impl AppState {
    pub fn new(service: RedactionService) -> Self {
        Self { service }
    }
}

// ── Errors ──────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] DocshieldError),

    #[error("Missing or empty `x-user-id` header")]
    MissingCaller,

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub success: bool,
    pub kind: String,
    pub message: String,
}

/// HTTP status for a core error kind.
pub fn status_for(err: &DocshieldError) -> StatusCode {
    match err {
        DocshieldError::NotFound { .. } => StatusCode::NOT_FOUND,
        DocshieldError::Permission { .. } => StatusCode::FORBIDDEN,
        DocshieldError::MissingMetadata { .. }
        | DocshieldError::ChecksumMismatch { .. }
        | DocshieldError::RedactionInProgress(_) => StatusCode::CONFLICT,
        DocshieldError::DocumentGone(_) => StatusCode::GONE,
        DocshieldError::Processing { .. }
        | DocshieldError::RuleCompilation(..)
        | DocshieldError::PatternLengthExceeded(..) => StatusCode::UNPROCESSABLE_ENTITY,
        DocshieldError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self {
            ApiError::Core(err) => (status_for(err), err.kind()),
            ApiError::MissingCaller => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
        };
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = ErrorBody {
            success: false,
            kind: kind.to_string(),
            message: self.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

// ── Caller extraction ───────────────────────────────────────────────

/// The user named by the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct Caller(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| Caller(value.to_string()))
            .ok_or(ApiError::MissingCaller)
    }
}

// ── Request / response types ────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EnrichParams {
    pub template: Option<String>,
    pub all: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum EnrichResponse {
    Template(TemplateEnrichment),
    All(EnrichmentSummary),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactRequest {
    pub template_id: String,
}

// ── Handlers ────────────────────────────────────────────────────────

/// Enrich one template (`?template=ID`) or all of the caller's templates (`?all=true`).
pub(crate) async fn enrich_rules(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    params: Result<Query<EnrichParams>, QueryRejection>,
) -> Result<Json<EnrichResponse>, ApiError> {
    let Query(params) = params?;
    match (params.template, params.all.unwrap_or(false)) {
        (Some(template_id), false) => {
            let outcome = state.service.enrich_template(&caller, &template_id).await?;
            Ok(Json(EnrichResponse::Template(outcome)))
        }
        (None, true) => {
            let summary = state.service.enrich_all_templates(&caller).await?;
            Ok(Json(EnrichResponse::All(summary)))
        }
        _ => Err(ApiError::BadRequest(
            "pass exactly one of `template=<id>` or `all=true`".to_string(),
        )),
    }
}

pub(crate) async fn redact_document(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(document_id): Path<String>,
    payload: Result<Json<RedactRequest>, JsonRejection>,
) -> Result<Json<RedactionOutcome>, ApiError> {
    let Json(request) = payload?;
    let outcome = state
        .service
        .redact_document(&caller, &document_id, &request.template_id)
        .await?;
    Ok(Json(outcome))
}

/// Returns the report, or JSON `null` when the document was never redacted.
pub(crate) async fn get_report(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path(document_id): Path<String>,
) -> Result<Json<Option<RedactionReport>>, ApiError> {
    let report = state.service.get_redaction_report(&caller, &document_id).await?;
    Ok(Json(report))
}

pub(crate) async fn update_entity(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
    Path((document_id, entity_id)): Path<(String, String)>,
    payload: Result<Json<EntityUpdate>, JsonRejection>,
) -> Result<Json<RedactedEntity>, ApiError> {
    let Json(update) = payload?;
    let entity = state
        .service
        .update_redaction_entity(&caller, &document_id, &entity_id, update)
        .await?;
    Ok(Json(entity))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

// ── Router ──────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/rules/enrich", post(enrich_rules))
        .route("/api/documents/{id}/redact", post(redact_document))
        .route("/api/documents/{id}/report", get(get_report))
        .route("/api/documents/{id}/entities/{entity_id}", patch(update_entity))
        .with_state(state)
}

/// Serves the API until Ctrl-C.
pub async fn serve(service: RedactionService, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(Arc::new(AppState::new(service)));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("docshield listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down.");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docshield_core::RecordKind;

    #[test]
    fn core_errors_map_to_distinct_statuses() {
        assert_eq!(status_for(&DocshieldError::not_found(RecordKind::Template, "t1")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&DocshieldError::DocumentGone("d1".into())), StatusCode::GONE);
        assert_eq!(status_for(&DocshieldError::processing("d1", "bad utf-8")), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            status_for(&DocshieldError::MissingMetadata {
                template_id: "t1".into(),
                rule_id: "r1".into(),
                rule_name: "ssn".into(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&DocshieldError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&DocshieldError::Store(anyhow::anyhow!("disk full"))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
