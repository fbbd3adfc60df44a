//! Public endpoints. Listings skip hidden stories.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::database::entities::{comments, stories};
use crate::server::app::AppState;
use crate::server::error::ApiResult;
use crate::services::comment_service::NewComment;
use crate::services::listing_service::{CategoryListing, HomePage};
use crate::services::pagination::{page_or_first, Page};
use crate::services::story_service::StoryPage;

#[derive(Debug, Default, Deserialize)]
pub struct HomeQuery {
    pub short_page: Option<u64>,
    pub long_page: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PartQuery {
    pub part: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i32,
}

#[derive(Debug, Serialize)]
pub struct RatingResponse {
    pub rating_sum: i32,
    pub rating_count: i32,
    pub average_rating: Option<f64>,
}

impl From<stories::Model> for RatingResponse {
    fn from(story: stories::Model) -> Self {
        let average_rating = (story.rating_count > 0)
            .then(|| f64::from(story.rating_sum) / f64::from(story.rating_count));
        Self {
            rating_sum: story.rating_sum,
            rating_count: story.rating_count,
            average_rating,
        }
    }
}

pub async fn home(
    State(state): State<AppState>,
    Query(query): Query<HomeQuery>,
) -> ApiResult<Json<HomePage>> {
    let page = state
        .listings
        .home(page_or_first(query.short_page), page_or_first(query.long_page))
        .await?;
    Ok(Json(page))
}

pub async fn story_page(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<PartQuery>,
) -> ApiResult<Json<StoryPage>> {
    Ok(Json(state.stories.read(id, query.part).await?))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Vec<comments::Model>>> {
    Ok(Json(state.comments.list_for_story(id).await?))
}

pub async fn post_comment(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<NewComment>,
) -> ApiResult<(StatusCode, Json<comments::Model>)> {
    let comment = state.comments.post(id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn rate_story(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<RatingRequest>,
) -> ApiResult<Json<RatingResponse>> {
    let story = state.stories.rate(id, payload.rating).await?;
    Ok(Json(story.into()))
}

pub async fn category_stories(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<CategoryListing>> {
    Ok(Json(state.listings.by_category(id, page_or_first(query.page)).await?))
}

pub async fn author_stories(
    State(state): State<AppState>,
    Path(author): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<stories::Model>>> {
    Ok(Json(state.listings.by_author(&author, page_or_first(query.page)).await?))
}

pub async fn type_stories(
    State(state): State<AppState>,
    Path(story_type): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<stories::Model>>> {
    Ok(Json(state.listings.by_type(&story_type, page_or_first(query.page)).await?))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<stories::Model>>> {
    Ok(Json(state.search.search(&query.q).await?))
}
