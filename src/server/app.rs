use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderMap,
    response::Json,
    routing::{delete, get, post, put},
    Router,
};
use sea_orm::DatabaseConnection;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;
use anyhow::Result;
use utoipa::OpenApi;

use super::error::{ApiError, ApiResult};
use super::handlers::{admin_stories, categories, exchange, health, reader};
use crate::auth::{Authorizer, SharedSecretAuthorizer};
use crate::config::ServerConfig;
use crate::exchange::{
    conflict::DuplicatePreview,
    document::{CategoryRecord, CommentRecord, Document, PartRecord, StoryRecord, VideoRecord},
    CommitMode, ExchangeService, FileStagingArea, ImportOutcome, ImportReview, StagingArea,
};
use crate::services::{CategoryService, CommentService, ListingService, SearchService, StoryService};

pub const PASSWORD_HEADER: &str = "x-upload-password";

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub authorizer: Arc<dyn Authorizer>,
    pub exchange: ExchangeService,
    pub stories: StoryService,
    pub categories: CategoryService,
    pub comments: CommentService,
    pub listings: ListingService,
    pub search: SearchService,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        authorizer: Arc<dyn Authorizer>,
        staging: Arc<dyn StagingArea>,
        commit_mode: CommitMode,
    ) -> Self {
        Self {
            exchange: ExchangeService::new(db.clone(), staging, commit_mode),
            stories: StoryService::new(db.clone()),
            categories: CategoryService::new(db.clone()),
            comments: CommentService::new(db.clone()),
            listings: ListingService::new(db.clone()),
            search: SearchService::new(db.clone()),
            authorizer,
            db,
        }
    }

    pub fn is_authorized(&self, credential: Option<&str>) -> bool {
        let accepted = credential.is_some_and(|credential| self.authorizer.authorize(credential));
        if !accepted {
            warn!("Rejected admin request with a missing or invalid upload password");
        }
        accepted
    }

    /// Admin gate for JSON endpoints: the secret comes in the password header.
    pub fn require_admin(&self, headers: &HeaderMap) -> ApiResult<()> {
        if self.is_authorized(header_credential(headers)) {
            Ok(())
        } else {
            Err(ApiError::Unauthorized)
        }
    }
}

pub fn header_credential(headers: &HeaderMap) -> Option<&str> {
    headers.get(PASSWORD_HEADER).and_then(|value| value.to_str().ok())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        exchange::export_document,
        exchange::upload_import,
        exchange::confirm_import,
        exchange::discard_import,
    ),
    components(schemas(
        Document,
        CategoryRecord,
        StoryRecord,
        PartRecord,
        CommentRecord,
        VideoRecord,
        ImportOutcome,
        ImportReview,
        DuplicatePreview,
    ))
)]
pub struct ApiDoc;

pub async fn create_app(db: DatabaseConnection, config: &ServerConfig) -> Result<Router> {
    let state = AppState::new(
        db,
        Arc::new(SharedSecretAuthorizer::new(config.upload_password.clone())),
        Arc::new(FileStagingArea::new(config.staging_dir.clone())),
        config.commit_mode,
    );

    let cors = match config.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<axum::http::HeaderValue>()?)
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any),
    };

    let app = Router::new()
        // Health check endpoint
        .route("/health", get(health::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))

        // API v1 routes
        .nest("/api/v1", api_v1_routes(config.max_upload_bytes()))

        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state);

    Ok(app)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn api_v1_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // Exchange routes
        .route("/admin/export", post(exchange::export_document))
        .route(
            "/admin/import",
            post(exchange::upload_import).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/admin/import/confirm", post(exchange::confirm_import))
        .route("/admin/import/discard", post(exchange::discard_import))

        // Admin story routes
        .route("/admin/stories", get(admin_stories::list_stories))
        .route("/admin/stories", post(admin_stories::create_story))
        .route("/admin/stories/purge", post(admin_stories::purge_stories))
        .route("/admin/stories/:id", get(admin_stories::get_story))
        .route("/admin/stories/:id", put(admin_stories::update_story))
        .route("/admin/stories/:id", delete(admin_stories::delete_story))
        .route("/admin/stories/:id/visibility", post(admin_stories::toggle_visibility))
        .route("/admin/stories/:id/parts", post(admin_stories::add_part))
        .route("/admin/stories/:id/parts/last", delete(admin_stories::delete_last_part))
        .route("/admin/stories/:id/parts/:part_id", put(admin_stories::update_part))
        .route("/admin/stories/:id/replace", post(admin_stories::replace_text))

        // Admin category routes
        .route("/admin/categories", post(categories::create_categories))
        .route("/admin/categories/:id", put(categories::rename_category))
        .route("/admin/categories/:id", delete(categories::delete_category))

        // Reader routes
        .route("/home", get(reader::home))
        .route("/stories/:id", get(reader::story_page))
        .route("/stories/:id/comments", get(reader::list_comments))
        .route("/stories/:id/comments", post(reader::post_comment))
        .route("/stories/:id/rating", post(reader::rate_story))
        .route("/categories", get(categories::list_categories))
        .route("/categories/:id/stories", get(reader::category_stories))
        .route("/authors/:author/stories", get(reader::author_stories))
        .route("/types/:story_type/stories", get(reader::type_stories))
        .route("/search", get(reader::search))
}
