use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::applier::{CommitMode, Decision, Decisions, ImportApplier, ImportOutcome};
use super::conflict::{self, ConflictReport, DuplicatePreview, ExistingIndex};
use super::document::{self, Document};
use super::serializer;
use super::staging::StagingArea;
use crate::errors::{ExchangeError, ExchangeResult};

/// A staged import waiting for per-story decisions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ImportReview {
    pub token: String,
    pub clean_count: usize,
    pub duplicates: Vec<DuplicatePreview>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ImportStart {
    /// No collisions; the document went straight in
    Applied(ImportOutcome),
    Review(ImportReview),
}

/// Export, staged import and confirmed apply over one store and staging area.
#[derive(Clone)]
pub struct ExchangeService {
    db: DatabaseConnection,
    staging: Arc<dyn StagingArea>,
    mode: CommitMode,
}

impl ExchangeService {
    pub fn new(db: DatabaseConnection, staging: Arc<dyn StagingArea>, mode: CommitMode) -> Self {
        Self { db, staging, mode }
    }

    pub fn staging(&self) -> &Arc<dyn StagingArea> {
        &self.staging
    }

    fn applier(&self) -> ImportApplier {
        ImportApplier::new(self.db.clone(), self.mode)
    }

    pub async fn export(&self) -> ExchangeResult<Document> {
        Ok(serializer::export(&self.db).await?)
    }

    /// Parse and check an upload. Clean documents are applied at once, colliding ones are
    /// staged for review.
    pub async fn begin_import(&self, bytes: &[u8]) -> ExchangeResult<ImportStart> {
        let document = document::parse(bytes)?;
        let report = self.detect(&document).await?;

        if !report.has_conflicts() {
            let outcome = self.applier().apply(&document, &Decisions::new()).await?;
            return Ok(ImportStart::Applied(outcome));
        }

        let token = self.staging.stage(&document).await?;
        info!(
            "Import {} needs review: {} duplicates, {} clean",
            token,
            report.duplicates.len(),
            report.clean.len()
        );

        Ok(ImportStart::Review(ImportReview {
            token,
            clean_count: report.clean.len(),
            duplicates: report.duplicates,
        }))
    }

    /// Apply a staged document. The staged copy is kept if the apply fails.
    pub async fn confirm_import(
        &self,
        token: &str,
        decisions: &Decisions,
    ) -> ExchangeResult<ImportOutcome> {
        let document = self.staging.retrieve(token).await?;

        let outcome = match self.applier().apply(&document, decisions).await {
            Ok(outcome) => outcome,
            Err(err) => {
                if matches!(err, ExchangeError::PartialApplyFailure { .. }) {
                    warn!(
                        "Staged import {} kept after partial apply; confirming again re-imports committed phases",
                        token
                    );
                }
                return Err(err);
            }
        };

        if let Err(err) = self.staging.discard(token).await {
            warn!("Failed to remove staged import {}: {}", token, err);
        }

        Ok(outcome)
    }

    pub async fn discard_import(&self, token: &str) -> ExchangeResult<()> {
        self.staging.discard(token).await?;
        info!("Discarded staged import {}", token);
        Ok(())
    }

    /// Apply without staging, resolving every detected duplicate the same way.
    pub async fn import_with_policy(
        &self,
        bytes: &[u8],
        on_duplicate: Decision,
    ) -> ExchangeResult<(ImportOutcome, ConflictReport)> {
        let document = document::parse(bytes)?;
        let report = self.detect(&document).await?;

        let decisions = Decisions::uniform(report.duplicate_ids(), on_duplicate);
        let outcome = self.applier().apply(&document, &decisions).await?;

        Ok((outcome, report))
    }

    async fn detect(&self, document: &Document) -> ExchangeResult<ConflictReport> {
        let existing = ExistingIndex::load(&self.db).await?;
        Ok(conflict::detect(document, &existing))
    }
}
