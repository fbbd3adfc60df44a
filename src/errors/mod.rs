//! Domain-specific error types
//!
//! - **ExchangeError**: export, staged import and reconciled apply
//! - **ContentError**: story, part, category and comment operations
//!
//! Both carry a stable `error_code()` used by the HTTP layer.

pub mod content;
pub mod exchange;

pub use content::ContentError;
pub use exchange::ExchangeError;

/// Result type alias for content operations
pub type ContentResult<T> = Result<T, ContentError>;

/// Result type alias for exchange operations
pub type ExchangeResult<T> = Result<T, ExchangeError>;
