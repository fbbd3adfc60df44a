//! Dataset exchange: export the whole store as one JSON document and import it back into
//! a possibly non-empty store with duplicate review and id remapping.

pub mod applier;
pub mod conflict;
pub mod document;
pub mod remapper;
pub mod serializer;
pub mod service;
pub mod staging;

pub use applier::{CommitMode, Decision, Decisions, ImportApplier, ImportOutcome, ImportPhase};
pub use conflict::{ConflictReport, DuplicatePreview, ExistingIndex};
pub use document::Document;
pub use remapper::IdentityRemapper;
pub use service::{ExchangeService, ImportReview, ImportStart};
pub use staging::{FileStagingArea, StagingArea};
