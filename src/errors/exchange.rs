//! Export/import error types
//!
//! ```rust
//! use storyshelf::errors::ExchangeError;
//!
//! let err = ExchangeError::InvalidDocument("expected an object".to_string());
//! assert!(err.is_client_error());
//! assert_eq!(err.error_code(), "INVALID_DOCUMENT");
//! ```

use thiserror::Error;

use crate::exchange::ImportPhase;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// The uploaded bytes are not an export document
    #[error("Invalid import document: {0}")]
    InvalidDocument(String),

    /// The upload carried no file
    #[error("No import file was uploaded")]
    MissingFile,

    /// Confirm or discard against a missing, malformed or consumed staging token
    #[error("Staged import '{0}' not found")]
    StagingNotFound(String),

    /// Missing or wrong shared secret
    #[error("Invalid upload password")]
    Unauthorized,

    /// A phase failed after earlier phases were committed; nothing is rolled back
    #[error(
        "Import stopped during {phase} after committing {imported} imported, {overwritten} overwritten and {skipped} skipped stories: {reason}"
    )]
    PartialApplyFailure {
        phase: ImportPhase,
        imported: usize,
        overwritten: usize,
        skipped: usize,
        reason: String,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Staging directory IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl ExchangeError {
    /// Check if this is a client error (400-series)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExchangeError::InvalidDocument(_)
                | ExchangeError::MissingFile
                | ExchangeError::StagingNotFound(_)
                | ExchangeError::Unauthorized
        )
    }

    /// Check if this is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExchangeError::StagingNotFound(_))
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            ExchangeError::InvalidDocument(_) => "INVALID_DOCUMENT",
            ExchangeError::MissingFile => "MISSING_FILE",
            ExchangeError::StagingNotFound(_) => "STAGING_NOT_FOUND",
            ExchangeError::Unauthorized => "UNAUTHORIZED",
            ExchangeError::PartialApplyFailure { .. } => "PARTIAL_APPLY_FAILURE",
            ExchangeError::Serialization(_) => "SERIALIZATION_ERROR",
            ExchangeError::Io(_) => "IO_ERROR",
            ExchangeError::Database(_) => "DATABASE_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_reports_counts() {
        let err = ExchangeError::PartialApplyFailure {
            phase: ImportPhase::Comments,
            imported: 3,
            overwritten: 1,
            skipped: 2,
            reason: "disk full".to_string(),
        };

        let message = err.to_string();
        assert!(message.contains("comments"));
        assert!(message.contains("3 imported"));
        assert!(message.contains("disk full"));
        assert!(!err.is_client_error());
        assert_eq!(err.error_code(), "PARTIAL_APPLY_FAILURE");
    }

    #[test]
    fn staging_not_found_is_client_error() {
        let err = ExchangeError::StagingNotFound("deadbeef".to_string());
        assert!(err.is_client_error());
        assert!(err.is_not_found());
    }
}
