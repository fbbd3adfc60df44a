use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::errors::{ContentError, ExchangeError};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid upload password")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Content(err) => match err {
                ContentError::NotFound { .. } => StatusCode::NOT_FOUND,
                ContentError::Validation(_) => StatusCode::BAD_REQUEST,
                ContentError::Conflict(_) => StatusCode::CONFLICT,
                ContentError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Exchange(err) if err.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Exchange(ExchangeError::Unauthorized) => StatusCode::UNAUTHORIZED,
            ApiError::Exchange(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Exchange(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "UNAUTHORIZED",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Content(err) => err.error_code(),
            ApiError::Exchange(err) => err.error_code(),
        }
    }

    fn public_message(&self) -> String {
        match self {
            ApiError::Content(ContentError::Database(_))
            | ApiError::Exchange(
                ExchangeError::Database(_) | ExchangeError::Io(_) | ExchangeError::Serialization(_),
            ) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = json!({
            "error": self.public_message(),
            "code": self.error_code(),
        });

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::ImportPhase;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::from(ExchangeError::StagingNotFound("x".into())).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ExchangeError::MissingFile).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ContentError::conflict("in use")).status(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn internal_details_are_not_exposed() {
        let err = ApiError::from(ExchangeError::Database(sea_orm::DbErr::Custom(
            "constraint failed on stories".into(),
        )));
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn partial_failure_keeps_counts_in_message() {
        let err = ApiError::from(ExchangeError::PartialApplyFailure {
            phase: ImportPhase::Videos,
            imported: 2,
            overwritten: 0,
            skipped: 1,
            reason: "boom".into(),
        });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.public_message().contains("2 imported"));
    }
}
