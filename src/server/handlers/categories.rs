use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;

use crate::database::entities::categories;
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::category_service::NewCategories;

#[derive(Debug, Deserialize)]
pub struct RenameCategory {
    pub name: String,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<categories::Model>>> {
    Ok(Json(state.categories.list().await?))
}

pub async fn create_categories(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<NewCategories>,
) -> ApiResult<(StatusCode, Json<Vec<categories::Model>>)> {
    state.require_admin(&headers)?;
    let created = state.categories.create(payload).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn rename_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<RenameCategory>,
) -> ApiResult<Json<categories::Model>> {
    state.require_admin(&headers)?;
    Ok(Json(state.categories.rename(id, &payload.name).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> ApiResult<StatusCode> {
    state.require_admin(&headers)?;
    state.categories.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
