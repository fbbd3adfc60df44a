//! Reconciled apply of a document onto the store.
//!
//! Phases run in dependency order (categories, stories, parts, comments, videos, sequence
//! resync). Each phase reads the id mappings recorded by the earlier ones, so a record
//! whose parent was skipped or missing has nothing to attach to and is dropped.

use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

use chrono::Utc;
use regex::Regex;
use sea_orm::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::conflict::normalize_title;
use super::document::{decode_timestamp_or, Document};
use super::remapper::IdentityRemapper;
use crate::database::cascade::delete_story_tree;
use crate::database::entities::{
    categories, comments, part_videos, parts, stories, stories::StoryType, story_categories,
};
use crate::errors::{ExchangeError, ExchangeResult};

/// Tables whose serial sequence is resynced on PostgreSQL.
const SEQUENCE_TABLES: [&str; 5] = ["categories", "stories", "parts", "comments", "part_videos"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportPhase {
    Categories,
    Stories,
    Parts,
    Comments,
    Videos,
    Sequences,
}

impl ImportPhase {
    pub const ORDER: [ImportPhase; 6] = [
        ImportPhase::Categories,
        ImportPhase::Stories,
        ImportPhase::Parts,
        ImportPhase::Comments,
        ImportPhase::Videos,
        ImportPhase::Sequences,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportPhase::Categories => "categories",
            ImportPhase::Stories => "stories",
            ImportPhase::Parts => "parts",
            ImportPhase::Comments => "comments",
            ImportPhase::Videos => "videos",
            ImportPhase::Sequences => "sequences",
        }
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do with one incoming story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[default]
    Import,
    Skip,
    Overwrite,
}

impl Decision {
    /// `skip` and `overwrite` are recognised; anything else means import.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "skip" => Decision::Skip,
            "overwrite" => Decision::Overwrite,
            _ => Decision::Import,
        }
    }
}

/// Per incoming story id; absent ids are imported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decisions {
    by_story: HashMap<i32, Decision>,
}

impl Decisions {
    pub const FIELD_PREFIX: &'static str = "decision_";

    pub fn new() -> Self {
        Self::default()
    }

    /// The same decision for every listed story.
    pub fn uniform(story_ids: impl IntoIterator<Item = i32>, decision: Decision) -> Self {
        let mut decisions = Self::new();
        for id in story_ids {
            decisions.set(id, decision);
        }
        decisions
    }

    /// Collect `decision_<id>` fields from a submitted form. Other fields are ignored.
    pub fn from_form_fields<'a, I>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut decisions = Self::new();
        for (key, value) in fields {
            let Some(raw_id) = key.strip_prefix(Self::FIELD_PREFIX) else {
                continue;
            };
            match raw_id.parse::<i32>() {
                Ok(id) => decisions.set(id, Decision::parse(value)),
                Err(_) => warn!("Ignoring decision field with non-numeric id: {}", key),
            }
        }
        decisions
    }

    pub fn set(&mut self, story_id: i32, decision: Decision) {
        self.by_story.insert(story_id, decision);
    }

    pub fn get(&self, story_id: i32) -> Decision {
        self.by_story.get(&story_id).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_story.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_story.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// One transaction for the whole apply
    #[default]
    Atomic,
    /// Commit after every phase, no rollback of earlier phases
    PerPhase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ImportOutcome {
    pub imported: usize,
    pub overwritten: usize,
    pub skipped: usize,
}

#[derive(Debug, Default)]
struct Dropped {
    parts: usize,
    comments: usize,
    videos: usize,
}

#[derive(Clone)]
pub struct ImportApplier {
    db: DatabaseConnection,
    mode: CommitMode,
}

impl ImportApplier {
    pub fn new(db: DatabaseConnection, mode: CommitMode) -> Self {
        Self { db, mode }
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    pub async fn apply(
        &self,
        document: &Document,
        decisions: &Decisions,
    ) -> ExchangeResult<ImportOutcome> {
        let mut run = ApplyRun::new(document, decisions);

        match self.mode {
            CommitMode::Atomic => {
                let txn = self.db.begin().await?;
                for phase in ImportPhase::ORDER {
                    run.phase(phase, &txn).await?;
                }
                txn.commit().await?;
            }
            CommitMode::PerPhase => {
                for (index, phase) in ImportPhase::ORDER.into_iter().enumerate() {
                    // Counts as of the last committed phase
                    let committed = run.outcome;
                    let result: Result<(), DbErr> = async {
                        let txn = self.db.begin().await?;
                        run.phase(phase, &txn).await?;
                        txn.commit().await
                    }
                    .await;

                    if let Err(err) = result {
                        if index == 0 {
                            return Err(err.into());
                        }
                        warn!(
                            "Import phase {} failed after earlier phases committed: {}",
                            phase, err
                        );
                        return Err(ExchangeError::PartialApplyFailure {
                            phase,
                            imported: committed.imported,
                            overwritten: committed.overwritten,
                            skipped: committed.skipped,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }

        if run.dropped.parts + run.dropped.comments + run.dropped.videos > 0 {
            warn!(
                "Import dropped {} parts, {} comments and {} videos without a parent",
                run.dropped.parts, run.dropped.comments, run.dropped.videos
            );
        }
        info!(
            "Import applied: {} imported, {} overwritten, {} skipped",
            run.outcome.imported, run.outcome.overwritten, run.outcome.skipped
        );

        Ok(run.outcome)
    }
}

struct ApplyRun<'a> {
    document: &'a Document,
    decisions: &'a Decisions,
    remapper: IdentityRemapper,
    outcome: ImportOutcome,
    dropped: Dropped,
}

impl<'a> ApplyRun<'a> {
    fn new(document: &'a Document, decisions: &'a Decisions) -> Self {
        Self {
            document,
            decisions,
            remapper: IdentityRemapper::new(),
            outcome: ImportOutcome::default(),
            dropped: Dropped::default(),
        }
    }

    async fn phase(&mut self, phase: ImportPhase, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        debug!("Import phase {}", phase);
        match phase {
            ImportPhase::Categories => self.categories(txn).await,
            ImportPhase::Stories => self.stories(txn).await,
            ImportPhase::Parts => self.parts(txn).await,
            ImportPhase::Comments => self.comments(txn).await,
            ImportPhase::Videos => self.videos(txn).await,
            ImportPhase::Sequences => resync_sequences(txn).await,
        }
    }

    async fn categories(&mut self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let mut by_name: HashMap<String, i32> = HashMap::new();
        for category in categories::Entity::find()
            .order_by_asc(categories::Column::Id)
            .all(txn)
            .await?
        {
            by_name.entry(category.name.to_lowercase()).or_insert(category.id);
        }

        for record in &self.document.categories {
            if record.name.is_empty() {
                continue;
            }

            let key = record.name.to_lowercase();
            let stored_id = match by_name.get(&key) {
                Some(id) => *id,
                None => {
                    let created = categories::ActiveModel {
                        name: Set(record.name.clone()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await?;
                    debug!("Created category '{}' as {}", created.name, created.id);
                    by_name.insert(key, created.id);
                    created.id
                }
            };

            self.remapper.record_category(record.id, stored_id);
        }

        Ok(())
    }

    async fn stories(&mut self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let mut existing: HashMap<String, i32> = HashMap::new();
        let stored: Vec<(i32, String)> = stories::Entity::find()
            .select_only()
            .column(stories::Column::Id)
            .column(stories::Column::Title)
            .order_by_asc(stories::Column::Id)
            .into_tuple()
            .all(txn)
            .await?;
        for (id, title) in stored {
            existing.entry(normalize_title(&title)).or_insert(id);
        }

        let now = Utc::now();
        for record in &self.document.stories {
            match self.decisions.get(record.id) {
                Decision::Skip => {
                    debug!("Skipping incoming story {} '{}'", record.id, record.title);
                    self.outcome.skipped += 1;
                    continue;
                }
                Decision::Overwrite => {
                    // Only stories that existed before this apply can be overwritten
                    if let Some(stored_id) = existing.remove(&normalize_title(&record.title)) {
                        delete_story_tree(txn, stored_id).await?;
                        debug!("Overwrote story {} with incoming {}", stored_id, record.id);
                        self.outcome.overwritten += 1;
                    }
                }
                Decision::Import => {}
            }

            let category_ids = self.remapper.categories_for(&record.categories);

            let story = stories::ActiveModel {
                title: Set(record.title.clone()),
                author: Set(record.author.clone()),
                story_type: Set(normalize_story_type(&record.story_type).as_str().to_string()),
                created_at: Set(decode_timestamp_or(record.created_at.as_deref(), now)),
                views: Set(record.views.max(0)),
                is_hidden: Set(record.is_hidden),
                is_completed: Set(record.is_completed),
                rating_sum: Set(record.rating_sum.max(0)),
                rating_count: Set(record.rating_count.max(0)),
                category_id: Set(category_ids.first().copied()),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            if !category_ids.is_empty() {
                story_categories::Entity::insert_many(category_ids.iter().map(|category_id| {
                    story_categories::ActiveModel {
                        story_id: Set(story.id),
                        category_id: Set(*category_id),
                    }
                }))
                .exec_without_returning(txn)
                .await?;
            }

            self.remapper.record_story(record.id, story.id);
            self.outcome.imported += 1;
        }

        Ok(())
    }

    async fn parts(&mut self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let now = Utc::now();
        for record in &self.document.parts {
            let Some(story_id) = self.remapper.story(record.story_id) else {
                self.dropped.parts += 1;
                continue;
            };

            let part = parts::ActiveModel {
                story_id: Set(story_id),
                part_number: Set(record.part_number),
                content: Set(record.content.clone()),
                created_at: Set(decode_timestamp_or(record.created_at.as_deref(), now)),
                ..Default::default()
            }
            .insert(txn)
            .await?;

            self.remapper.record_part(record.id, part.id);
        }

        Ok(())
    }

    async fn comments(&mut self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        let now = Utc::now();
        for record in &self.document.comments {
            let Some(story_id) = self.remapper.story(record.story_id) else {
                self.dropped.comments += 1;
                continue;
            };

            comments::ActiveModel {
                story_id: Set(story_id),
                url: Set(rewrite_story_path(&record.url, story_id)),
                name: Set(record.name.clone()),
                email: Set(record.email.clone()),
                content: Set(record.content.clone()),
                created_at: Set(decode_timestamp_or(record.created_at.as_deref(), now)),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }

        Ok(())
    }

    async fn videos(&mut self, txn: &DatabaseTransaction) -> Result<(), DbErr> {
        for record in &self.document.videos {
            let part_id = match self.remapper.part(record.part_id) {
                Some(part_id) if !record.url.is_empty() => part_id,
                _ => {
                    self.dropped.videos += 1;
                    continue;
                }
            };

            part_videos::ActiveModel {
                part_id: Set(part_id),
                url: Set(record.url.clone()),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }

        Ok(())
    }
}

/// Point every serial sequence past the highest id. No-op outside PostgreSQL.
async fn resync_sequences<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    if backend != DbBackend::Postgres {
        return Ok(());
    }

    for table in SEQUENCE_TABLES {
        let sql = format!(
            "SELECT setval(pg_get_serial_sequence('{table}', 'id'), COALESCE((SELECT MAX(id) FROM {table}), 1), true)"
        );
        conn.query_one(Statement::from_string(backend, sql)).await?;
    }
    debug!("Resynced {} sequences", SEQUENCE_TABLES.len());

    Ok(())
}

/// `short` or `long`, case-insensitively; anything else becomes `short`.
pub fn normalize_story_type(value: &str) -> StoryType {
    StoryType::parse(&value.trim().to_lowercase()).unwrap_or_else(|| {
        debug!("Unknown story type '{}', importing as short", value);
        StoryType::default()
    })
}

/// Replace every `/story/<digits>` fragment with the new story id.
pub fn rewrite_story_path(url: &str, story_id: i32) -> String {
    static STORY_PATH: OnceLock<Regex> = OnceLock::new();
    let pattern = STORY_PATH.get_or_init(|| Regex::new(r"/story/\d+").expect("story path pattern"));

    pattern
        .replace_all(url, format!("/story/{}", story_id).as_str())
        .into_owned()
}
