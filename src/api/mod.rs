//! HTTP surface: a thin `axum` adapter over the core operations.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::error::ScriptoriumError;
use crate::ids::Id;
use crate::model::Metadata;
use crate::publish::{PublishRequest, RollbackRequest};
use crate::query::SearchRequest;
use crate::AppState;

/// Maps the crate-wide error taxonomy onto the error envelope and status
/// codes the HTTP surface promises callers.
pub struct AppError(ScriptoriumError);

impl From<ScriptoriumError> for AppError {
    fn from(err: ScriptoriumError) -> Self {
        AppError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            ScriptoriumError::Validation(_) => (StatusCode::BAD_REQUEST, "ValidationError"),
            ScriptoriumError::NotFound { .. } => (StatusCode::NOT_FOUND, "NotFound"),
            ScriptoriumError::Conflict(_) => (StatusCode::CONFLICT, "Conflict"),
            ScriptoriumError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RateLimited"),
            ScriptoriumError::Integrity(_)
            | ScriptoriumError::StorageFault(_)
            | ScriptoriumError::IndexingFailure(_)
            | ScriptoriumError::AnchorResolutionFailed(_)
            | ScriptoriumError::TokenizationFailed(_)
            | ScriptoriumError::Io(_)
            | ScriptoriumError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "Internal"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                kind,
                message: self.0.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/health", get(health))
        .route("/notes", post(create_note))
        .route("/collections", post(create_collection).get(list_collections))
        .route("/collections/:id", patch(update_collection))
        .route("/drafts", post(save_draft))
        .route("/drafts/:note_id", get(get_draft))
        .route("/publish", post(publish))
        .route("/rollback", post(rollback))
        .route("/notes/:id/versions", get(list_versions))
        .route("/versions/:id", get(get_version))
        .route("/search", get(search))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct StatusOk {
    status: &'static str,
}

async fn healthz() -> Json<StatusOk> {
    Json(StatusOk { status: "ok" })
}

#[derive(Serialize)]
struct ComponentHealth {
    name: &'static str,
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    components: Vec<ComponentHealth>,
}

async fn health(State(state): State<Arc<AppState>>) -> Result<Json<HealthResponse>, AppError> {
    let storage = state.store.get_storage_health().await?;
    let components = vec![
        ComponentHealth {
            name: "entity_store",
            status: if storage.pending_visibility_events < 10_000 { "ok" } else { "degraded" },
        },
        ComponentHealth {
            name: "corpus",
            status: "ok",
        },
    ];
    Ok(Json(HealthResponse { status: "ok", components }))
}

#[derive(Deserialize)]
struct CreateNoteRequest {
    title: String,
    initial_content: String,
    #[serde(default)]
    metadata: Metadata,
}

async fn create_note(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<Json<crate::model::Note>, AppError> {
    let note = state.store.create_note(req.title, req.initial_content, req.metadata).await?;
    Ok(Json(note))
}

#[derive(Deserialize)]
struct CreateCollectionRequest {
    name: String,
    description: Option<String>,
}

async fn create_collection(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateCollectionRequest>,
) -> Result<Json<crate::model::Collection>, AppError> {
    let collection = state.store.create_collection(req.name, req.description).await?;
    Ok(Json(collection))
}

#[derive(Serialize)]
struct CollectionsResponse {
    collections: Vec<crate::model::Collection>,
}

async fn list_collections(State(state): State<Arc<AppState>>) -> Result<Json<CollectionsResponse>, AppError> {
    let collections = state.store.list_collections().await?;
    Ok(Json(CollectionsResponse { collections }))
}

#[derive(Deserialize)]
struct UpdateCollectionRequest {
    description: Option<String>,
}

async fn update_collection(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
    Json(req): Json<UpdateCollectionRequest>,
) -> Result<Json<crate::model::Collection>, AppError> {
    let collection = state.store.update_collection(&id, req.description).await?;
    Ok(Json(collection))
}

#[derive(Deserialize)]
struct SaveDraftRequest {
    note_id: Id,
    body_md: String,
    #[serde(default)]
    metadata: Metadata,
}

#[derive(Serialize)]
struct SaveDraftResponse {
    note_id: Id,
    autosave_ts: u64,
    status: &'static str,
}

async fn save_draft(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SaveDraftRequest>,
) -> Result<Json<SaveDraftResponse>, AppError> {
    let draft = state.store.save_draft(&req.note_id, req.body_md, req.metadata).await?;
    Ok(Json(SaveDraftResponse {
        note_id: req.note_id,
        autosave_ts: draft.autosave_ts,
        status: "saved",
    }))
}

async fn get_draft(
    State(state): State<Arc<AppState>>,
    Path(note_id): Path<Id>,
) -> Result<Json<crate::model::Draft>, AppError> {
    let draft = state.store.get_draft(&note_id).await?;
    Ok(Json(draft))
}

async fn publish(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PublishRequest>,
) -> Result<Json<crate::publish::PublishResponse>, AppError> {
    let resp = crate::publish::publish(&state.store, req).await?;
    Ok(Json(resp))
}

async fn rollback(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RollbackRequest>,
) -> Result<Json<crate::publish::RollbackResponse>, AppError> {
    let resp = crate::publish::rollback(&state.store, req).await?;
    Ok(Json(resp))
}

#[derive(Serialize)]
struct VersionsResponse {
    versions: Vec<crate::model::Version>,
}

async fn list_versions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
) -> Result<Json<VersionsResponse>, AppError> {
    let versions = state.store.list_versions(&id).await?;
    Ok(Json(VersionsResponse { versions }))
}

async fn get_version(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Id>,
) -> Result<Json<crate::model::Version>, AppError> {
    let version = state.store.get_version(&id).await?;
    Ok(Json(version))
}

#[derive(Deserialize)]
struct SearchParams {
    q: String,
    collections: Option<String>,
    page: Option<usize>,
    page_size: Option<usize>,
}

async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<crate::query::SearchResponse>, AppError> {
    let collections = params.collections.map(|csv| {
        csv.split(',')
            .filter(|s| !s.is_empty())
            .map(Id::from_raw)
            .collect::<Vec<_>>()
    });
    let req = SearchRequest {
        query: params.q,
        collections,
        page: params.page.unwrap_or(0),
        page_size: params.page_size,
    };
    let resp = crate::query::search(&state.store, &state.corpus, &state.metrics, &state.config, req).await?;
    Ok(Json(resp))
}
