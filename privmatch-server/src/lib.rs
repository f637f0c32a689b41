//! HTTP service for PrivMatch.
//!
//! Routes:
//!
//! | Method | Path | Action |
//! |--------|------|--------|
//! | GET | `/health` | liveness and entity count |
//! | POST | `/entities` | create an entity |
//! | GET | `/entities/:id` | full entity for its owner, redacted view otherwise |
//! | DELETE | `/entities/:id` | delete an entity |
//! | PATCH | `/entities/:id/attributes` | set and remove attributes |
//! | PUT | `/entities/:id/embedding` | replace or clear the embedding |
//! | PUT | `/entities/:id/privacy` | replace privacy settings |
//! | PATCH | `/entities/:id/searchable` | toggle searchability |
//! | GET | `/users/:user_id/entities` | entities owned by a user |
//! | POST | `/search` | ranked, filtered, redacted search |

pub mod config;
pub mod error;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use privmatch_core::{
    AsyncEntityStore, Attributes, Embedding, Entity, EntityId, EntityStore, Error,
    FieldVisibilityMap, SearchRequest, SearchResultItem, Searcher,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

pub use config::Config;
pub use error::ApiError;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: AsyncEntityStore,
    pub searcher: Arc<Searcher>,
    pub default_limit: usize,
}

impl AppState {
    pub fn new(store: AsyncEntityStore, default_limit: usize) -> Self {
        Self {
            store,
            searcher: Arc::new(Searcher::new()),
            default_limit,
        }
    }

    /// Opens the store described by `config`.
    pub async fn from_config(config: &Config) -> privmatch_core::Result<Self> {
        let store = match &config.data_dir {
            Some(dir) => AsyncEntityStore::open_or_create(dir.clone(), config.store_config()).await?,
            None => {
                info!("no data dir configured, entities are kept in memory only");
                AsyncEntityStore::from_sync(EntityStore::in_memory(config.store_config()))
            }
        };
        Ok(Self::new(store, config.default_limit))
    }
}

/// Builds the router with CORS and request tracing.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/entities", post(create_entity))
        .route("/entities/:id", get(get_entity).delete(delete_entity))
        .route("/entities/:id/attributes", patch(update_attributes))
        .route("/entities/:id/embedding", put(set_embedding))
        .route("/entities/:id/privacy", put(set_privacy))
        .route("/entities/:id/searchable", patch(set_searchable))
        .route("/users/:user_id/entities", get(list_user_entities))
        .route("/search", post(search))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn privacy_from_json(value: Value) -> Result<FieldVisibilityMap, Error> {
    serde_json::from_value(value).map_err(|e| Error::InvalidVisibility(e.to_string()))
}

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidRequest(format!("{} must not be empty", field)));
    }
    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "entities": state.store.len() }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateEntityRequest {
    id: Option<EntityId>,
    entity_type: String,
    name: String,
    description: Option<String>,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    metadata: Attributes,
    owned_by_user_id: String,
    is_searchable: Option<bool>,
    privacy_settings: Option<Value>,
    embedding: Option<Vec<f32>>,
}

async fn create_entity(
    State(state): State<AppState>,
    Json(req): Json<CreateEntityRequest>,
) -> ApiResult<(StatusCode, Json<Entity>)> {
    require("entityType", &req.entity_type)?;
    require("name", &req.name)?;
    require("ownedByUserId", &req.owned_by_user_id)?;

    let mut entity = Entity::new(req.entity_type, req.name, req.owned_by_user_id)
        .with_attributes(req.attributes)
        .with_metadata(req.metadata)
        .with_searchable(req.is_searchable.unwrap_or(true));
    if let Some(id) = req.id {
        entity = entity.with_id(id);
    }
    if let Some(description) = req.description {
        entity = entity.with_description(description);
    }
    if let Some(settings) = req.privacy_settings {
        entity = entity.with_privacy_settings(privacy_from_json(settings)?);
    }
    if let Some(embedding) = req.embedding {
        entity = entity.with_embedding(embedding);
    }

    state.store.insert(entity.clone()).await?;
    Ok((StatusCode::CREATED, Json(entity)))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ViewParams {
    requesting_user_id: Option<String>,
}

async fn get_entity(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Query(params): Query<ViewParams>,
) -> ApiResult<Response> {
    let entity = state.store.get(id).await?.ok_or(Error::NotFound(id))?;
    let requester = params.requesting_user_id.as_deref();

    if requester.is_some_and(|r| entity.is_owned_by(r)) {
        return Ok(Json(entity).into_response());
    }
    Ok(Json(state.searcher.resolver().redact(&entity, requester)).into_response())
}

async fn delete_entity(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
) -> ApiResult<StatusCode> {
    if state.store.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound(id).into())
    }
}

#[derive(Debug, Default, Deserialize)]
struct AttributesPatch {
    #[serde(default)]
    set: Attributes,
    #[serde(default)]
    remove: Vec<String>,
}

async fn update_attributes(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(patch): Json<AttributesPatch>,
) -> ApiResult<Json<Entity>> {
    let entity = state
        .store
        .modify(id, move |entity| {
            for (key, value) in patch.set.into_inner() {
                entity.set_attribute(key, value);
            }
            for key in &patch.remove {
                entity.remove_attribute(key);
            }
            Ok(())
        })
        .await?;
    Ok(Json(entity))
}

#[derive(Debug, Deserialize)]
struct EmbeddingBody {
    embedding: Option<Vec<f32>>,
}

async fn set_embedding(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<EmbeddingBody>,
) -> ApiResult<Json<Entity>> {
    let entity = state
        .store
        .modify(id, move |entity| {
            entity.set_embedding(body.embedding.map(Embedding::from_vec));
            Ok(())
        })
        .await?;
    Ok(Json(entity))
}

async fn set_privacy(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Entity>> {
    let settings = privacy_from_json(body)?;
    let entity = state
        .store
        .modify(id, move |entity| {
            entity.set_privacy_settings(settings);
            Ok(())
        })
        .await?;
    Ok(Json(entity))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchableBody {
    is_searchable: bool,
}

async fn set_searchable(
    State(state): State<AppState>,
    Path(id): Path<EntityId>,
    Json(body): Json<SearchableBody>,
) -> ApiResult<Json<Entity>> {
    let entity = state
        .store
        .modify(id, move |entity| {
            entity.set_searchable(body.is_searchable);
            Ok(())
        })
        .await?;
    Ok(Json(entity))
}

async fn list_user_entities(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<Entity>>> {
    Ok(Json(state.store.list_by_owner(user_id).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
}

async fn search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let query = req.compile(state.default_limit)?;
    let results = state
        .store
        .search(Arc::clone(&state.searcher), query)
        .await?;

    debug!(results = results.len(), "search served");
    Ok(Json(SearchResponse { results }))
}
