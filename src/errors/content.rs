//! Content store error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ContentError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        ContentError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ContentError::Validation(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ContentError::Conflict(message.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContentError::NotFound { .. })
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ContentError::NotFound { .. } => "NOT_FOUND",
            ContentError::Validation(_) => "VALIDATION_FAILED",
            ContentError::Conflict(_) => "CONFLICT",
            ContentError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_entity_and_id() {
        let err = ContentError::not_found("Story", 42);
        assert_eq!(err.to_string(), "Story 42 not found");
        assert!(err.is_not_found());
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
