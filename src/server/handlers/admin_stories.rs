//! Story and chapter editing. Every handler requires the upload password header.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::database::entities::{parts, stories};
use crate::server::app::{header_credential, AppState};
use crate::server::error::{ApiError, ApiResult};
use crate::services::pagination::page_or_first;
use crate::services::search_service::{AdminStoryList, SearchField};
use crate::services::story_service::{NewStory, PartInput, StoryOutline, StoryUpdate};

#[derive(Debug, Default, Deserialize)]
pub struct AdminListQuery {
    pub page: Option<u64>,
    #[serde(default)]
    pub q: String,
    /// `title` (default) or `content`
    #[serde(default, rename = "stype")]
    pub field: SearchField,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceRequest {
    pub search: String,
    #[serde(default)]
    pub replacement: String,
}

#[derive(Debug, Deserialize)]
pub struct PurgeRequest {
    pub confirm_password: String,
}

pub async fn list_stories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminListQuery>,
) -> ApiResult<Json<AdminStoryList>> {
    state.require_admin(&headers)?;
    let list = state
        .search
        .admin_list(page_or_first(query.page), &query.q, query.field)
        .await?;
    Ok(Json(list))
}

pub async fn create_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewStory>,
) -> ApiResult<(StatusCode, Json<stories::Model>)> {
    state.require_admin(&headers)?;
    let story = state.stories.create(payload).await?;
    Ok((StatusCode::CREATED, Json(story)))
}

pub async fn get_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> ApiResult<Json<StoryOutline>> {
    state.require_admin(&headers)?;
    Ok(Json(state.stories.outline(id).await?))
}

pub async fn update_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<StoryUpdate>,
) -> ApiResult<Json<stories::Model>> {
    state.require_admin(&headers)?;
    Ok(Json(state.stories.update(id, payload).await?))
}

pub async fn delete_story(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.require_admin(&headers)?;
    state.stories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn toggle_visibility(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> ApiResult<Json<stories::Model>> {
    state.require_admin(&headers)?;
    Ok(Json(state.stories.toggle_hidden(id).await?))
}

pub async fn add_part(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<PartInput>,
) -> ApiResult<(StatusCode, Json<parts::Model>)> {
    state.require_admin(&headers)?;
    let part = state.stories.add_part(id, payload).await?;
    Ok((StatusCode::CREATED, Json(part)))
}

pub async fn update_part(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, part_id)): Path<(i32, i32)>,
    Json(payload): Json<PartInput>,
) -> ApiResult<Json<parts::Model>> {
    state.require_admin(&headers)?;
    Ok(Json(state.stories.update_part(id, part_id, payload).await?))
}

pub async fn delete_last_part(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> ApiResult<Json<Value>> {
    state.require_admin(&headers)?;
    let removed = state.stories.delete_last_part(id).await?;
    Ok(Json(json!({
        "deleted": removed.map(|part| part.part_number),
    })))
}

pub async fn replace_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<ReplaceRequest>,
) -> ApiResult<Json<Value>> {
    state.require_admin(&headers)?;
    let changed = state
        .stories
        .replace_text(id, &payload.search, &payload.replacement)
        .await?;
    Ok(Json(json!({ "changed_parts": changed })))
}

/// Delete every story. The secret must be given twice: header and body.
pub async fn purge_stories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<PurgeRequest>,
) -> ApiResult<Json<Value>> {
    state.require_admin(&headers)?;
    if header_credential(&headers) != Some(payload.confirm_password.as_str()) {
        warn!("Purge rejected: confirmation password does not match");
        return Err(ApiError::Unauthorized);
    }

    let deleted = state.stories.delete_all().await?;
    Ok(Json(json!({ "deleted": deleted })))
}
