//! Title collision detection between an incoming document and the stored stories.

use std::collections::HashMap;

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use super::document::Document;
use crate::database::entities::{parts, stories};

/// Characters kept in a duplicate preview.
pub const PREVIEW_CHARS: usize = 400;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct DuplicatePreview {
    pub incoming_id: i32,
    pub existing_id: i32,
    pub title: String,
    pub existing_excerpt: String,
    pub incoming_excerpt: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConflictReport {
    pub duplicates: Vec<DuplicatePreview>,
    /// Incoming story ids without a stored counterpart.
    pub clean: Vec<i32>,
}

impl ConflictReport {
    pub fn has_conflicts(&self) -> bool {
        !self.duplicates.is_empty()
    }

    pub fn duplicate_ids(&self) -> Vec<i32> {
        self.duplicates.iter().map(|dup| dup.incoming_id).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExistingStory {
    pub id: i32,
    pub first_part: Option<String>,
}

/// Stored stories keyed by normalised title.
#[derive(Debug, Clone, Default)]
pub struct ExistingIndex {
    by_title: HashMap<String, ExistingStory>,
}

impl ExistingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a stored story. On a title clash the lowest id is kept.
    pub fn insert(&mut self, id: i32, title: &str, first_part: Option<String>) {
        let key = normalize_title(title);
        match self.by_title.get(&key) {
            Some(current) if current.id <= id => {}
            _ => {
                self.by_title.insert(key, ExistingStory { id, first_part });
            }
        }
    }

    pub fn lookup(&self, title: &str) -> Option<&ExistingStory> {
        self.by_title.get(&normalize_title(title))
    }

    pub fn len(&self) -> usize {
        self.by_title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_title.is_empty()
    }

    pub async fn load<C: ConnectionTrait>(conn: &C) -> Result<Self, DbErr> {
        let titles: Vec<(i32, String)> = stories::Entity::find()
            .select_only()
            .column(stories::Column::Id)
            .column(stories::Column::Title)
            .order_by_asc(stories::Column::Id)
            .into_tuple()
            .all(conn)
            .await?;

        let first_parts: HashMap<i32, String> = parts::Entity::find()
            .filter(parts::Column::PartNumber.eq(1))
            .order_by_asc(parts::Column::Id)
            .all(conn)
            .await?
            .into_iter()
            .rev()
            .map(|part| (part.story_id, part.content))
            .collect();

        let mut index = Self::new();
        for (id, title) in titles {
            index.insert(id, &title, first_parts.get(&id).cloned());
        }
        Ok(index)
    }
}

/// Trimmed, Unicode lower-cased title used for collision checks.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Newlines flattened, cut to the last space inside the first 400 characters.
pub fn preview_excerpt(text: &str) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= PREVIEW_CHARS {
        return flat;
    }

    let window: String = flat.chars().take(PREVIEW_CHARS).collect();
    let cut = match window.rfind(' ') {
        Some(index) => &window[..index],
        None => window.as_str(),
    };
    format!("{}...", cut)
}

pub fn detect(document: &Document, existing: &ExistingIndex) -> ConflictReport {
    let mut report = ConflictReport::default();

    for story in &document.stories {
        match existing.lookup(&story.title) {
            Some(stored) => report.duplicates.push(DuplicatePreview {
                incoming_id: story.id,
                existing_id: stored.id,
                title: story.title.clone(),
                existing_excerpt: preview_excerpt(stored.first_part.as_deref().unwrap_or("")),
                incoming_excerpt: preview_excerpt(
                    document.first_part_content(story.id).unwrap_or(""),
                ),
            }),
            None => report.clean.push(story.id),
        }
    }

    report
}
