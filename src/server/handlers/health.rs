use axum::{http::StatusCode, response::Json};
use serde_json::{json, Value};

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up")
    )
)]
pub async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "storyshelf-server",
        "version": env!("CARGO_PKG_VERSION")
    })))
}
