use chrono::{DateTime, Utc};
use sea_orm::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::video_links::{self, normalize_video_urls, VideoLink};
use crate::database::cascade;
use crate::database::entities::{
    categories, comments, parts, stories,
    stories::StoryType,
    story_categories,
};
use crate::errors::{ContentError, ContentResult};

const HEADING_PREFIXES: [&str; 2] = ["### Phần ", "## Phần "];
const CHAPTER_PREFIX: &str = "Chương ";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewStory {
    pub title: String,
    pub author: Option<String>,
    pub story_type: Option<String>,
    pub is_completed: bool,
    pub category_ids: Vec<i32>,
    pub content: String,
    pub video_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoryUpdate {
    pub title: String,
    pub author: Option<String>,
    pub story_type: Option<String>,
    pub is_completed: bool,
    pub category_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PartInput {
    pub content: String,
    pub video_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartHeading {
    pub id: i32,
    pub part_number: i32,
    pub created_at: DateTime<Utc>,
}

/// Everything the reader sees on a story page.
#[derive(Debug, Clone, Serialize)]
pub struct StoryPage {
    pub story: stories::Model,
    pub average_rating: Option<f64>,
    pub categories: Vec<categories::Model>,
    pub parts: Vec<PartHeading>,
    pub total_parts: usize,
    pub current_index: i32,
    pub current_part: Option<parts::Model>,
    pub videos: Vec<VideoLink>,
    pub comments: Vec<comments::Model>,
}

/// Editor view: the story with every chapter in order.
#[derive(Debug, Clone, Serialize)]
pub struct StoryOutline {
    pub story: stories::Model,
    pub categories: Vec<categories::Model>,
    pub parts: Vec<parts::Model>,
}

#[derive(Clone)]
pub struct StoryService {
    db: DatabaseConnection,
}

impl StoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get(&self, story_id: i32) -> ContentResult<stories::Model> {
        find_story(&self.db, story_id).await
    }

    /// Create a story together with its first chapter.
    pub async fn create(&self, input: NewStory) -> ContentResult<stories::Model> {
        let title = input.title.trim().to_string();
        let content = input.content.trim().to_string();
        if title.is_empty() || content.is_empty() {
            return Err(ContentError::validation("Title and content are required"));
        }
        let story_type = parse_story_type(input.story_type.as_deref())?;
        let videos = normalize_video_urls(&input.video_urls);

        let txn = self.db.begin().await?;

        let category_ids = existing_category_ids(&txn, &input.category_ids).await?;
        let story = stories::ActiveModel {
            title: Set(title),
            author: Set(clean_author(input.author)),
            story_type: Set(story_type.as_str().to_string()),
            created_at: Set(Utc::now()),
            views: Set(0),
            is_hidden: Set(false),
            is_completed: Set(input.is_completed),
            rating_sum: Set(0),
            rating_count: Set(0),
            category_id: Set(category_ids.first().copied()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        link_categories(&txn, story.id, &category_ids).await?;

        let part = parts::ActiveModel {
            story_id: Set(story.id),
            part_number: Set(1),
            content: Set(content),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        video_links::attach_videos(&txn, part.id, &videos).await?;

        txn.commit().await?;

        info!("Created story {} '{}'", story.id, story.title);
        Ok(story)
    }

    pub async fn update(&self, story_id: i32, input: StoryUpdate) -> ContentResult<stories::Model> {
        let title = input.title.trim().to_string();
        if title.is_empty() {
            return Err(ContentError::validation("Title is required"));
        }
        let story_type = parse_story_type(input.story_type.as_deref())?;

        let txn = self.db.begin().await?;
        let story = find_story(&txn, story_id).await?;
        let category_ids = existing_category_ids(&txn, &input.category_ids).await?;

        let mut active: stories::ActiveModel = story.into();
        active.title = Set(title);
        active.author = Set(clean_author(input.author));
        active.story_type = Set(story_type.as_str().to_string());
        active.is_completed = Set(input.is_completed);
        active.category_id = Set(category_ids.first().copied());
        let story = active.update(&txn).await?;

        story_categories::Entity::delete_many()
            .filter(story_categories::Column::StoryId.eq(story.id))
            .exec(&txn)
            .await?;
        link_categories(&txn, story.id, &category_ids).await?;

        txn.commit().await?;

        debug!("Updated story {}", story.id);
        Ok(story)
    }

    pub async fn delete(&self, story_id: i32) -> ContentResult<()> {
        let txn = self.db.begin().await?;
        if !cascade::delete_story_tree(&txn, story_id).await? {
            return Err(ContentError::not_found("Story", story_id));
        }
        txn.commit().await?;

        info!("Deleted story {}", story_id);
        Ok(())
    }

    /// Remove every story with its chapters, videos and comments. Categories stay.
    pub async fn delete_all(&self) -> ContentResult<u64> {
        let txn = self.db.begin().await?;
        let removed = cascade::delete_all_stories(&txn).await?;
        txn.commit().await?;

        info!("Deleted all {} stories", removed);
        Ok(removed)
    }

    pub async fn toggle_hidden(&self, story_id: i32) -> ContentResult<stories::Model> {
        let story = find_story(&self.db, story_id).await?;
        let hidden = !story.is_hidden;

        let mut active: stories::ActiveModel = story.into();
        active.is_hidden = Set(hidden);
        Ok(active.update(&self.db).await?)
    }

    /// Append a chapter at the next free number.
    pub async fn add_part(&self, story_id: i32, input: PartInput) -> ContentResult<parts::Model> {
        let content = input.content.trim_end();
        if content.is_empty() {
            return Err(ContentError::validation("Chapter content must not be empty"));
        }
        let content = normalize_chapter_heading(content);
        let videos = normalize_video_urls(&input.video_urls);

        let txn = self.db.begin().await?;
        find_story(&txn, story_id).await?;

        let next_number = last_part(&txn, story_id)
            .await?
            .map(|part| part.part_number + 1)
            .unwrap_or(1);

        let part = parts::ActiveModel {
            story_id: Set(story_id),
            part_number: Set(next_number),
            content: Set(content),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        video_links::attach_videos(&txn, part.id, &videos).await?;

        txn.commit().await?;

        debug!("Added part {} to story {}", part.part_number, story_id);
        Ok(part)
    }

    /// Replace a chapter's content and its video links.
    pub async fn update_part(
        &self,
        story_id: i32,
        part_id: i32,
        input: PartInput,
    ) -> ContentResult<parts::Model> {
        let content = input.content.trim().to_string();
        if content.is_empty() {
            return Err(ContentError::validation("Chapter content must not be empty"));
        }
        let videos = normalize_video_urls(&input.video_urls);

        let txn = self.db.begin().await?;
        let part = parts::Entity::find_by_id(part_id)
            .one(&txn)
            .await?
            .filter(|part| part.story_id == story_id)
            .ok_or_else(|| ContentError::not_found("Part", part_id))?;

        let mut active: parts::ActiveModel = part.into();
        active.content = Set(content);
        let part = active.update(&txn).await?;
        video_links::replace_videos(&txn, part.id, &videos).await?;

        txn.commit().await?;
        Ok(part)
    }

    /// Remove the highest-numbered chapter. `None` when the story has no chapters.
    pub async fn delete_last_part(&self, story_id: i32) -> ContentResult<Option<parts::Model>> {
        let txn = self.db.begin().await?;
        find_story(&txn, story_id).await?;

        let Some(part) = last_part(&txn, story_id).await? else {
            return Ok(None);
        };
        cascade::delete_part_tree(&txn, part.id).await?;
        txn.commit().await?;

        debug!("Deleted part {} of story {}", part.part_number, story_id);
        Ok(Some(part))
    }

    /// Literal replacement in every chapter. Returns how many chapters changed.
    pub async fn replace_text(
        &self,
        story_id: i32,
        search: &str,
        replacement: &str,
    ) -> ContentResult<usize> {
        let search = search.trim();
        if search.is_empty() {
            return Err(ContentError::validation("Search text must not be empty"));
        }

        let txn = self.db.begin().await?;
        find_story(&txn, story_id).await?;

        let chapters = parts::Entity::find()
            .filter(parts::Column::StoryId.eq(story_id))
            .all(&txn)
            .await?;

        let mut changed = 0;
        for part in chapters {
            if !part.content.contains(search) {
                continue;
            }
            let content = part.content.replace(search, replacement);
            let mut active: parts::ActiveModel = part.into();
            active.content = Set(content);
            active.update(&txn).await?;
            changed += 1;
        }

        txn.commit().await?;

        info!("Replaced text in {} chapters of story {}", changed, story_id);
        Ok(changed)
    }

    /// Record a 1-5 rating. Other values leave the story unchanged.
    pub async fn rate(&self, story_id: i32, rating: i32) -> ContentResult<stories::Model> {
        let story = find_story(&self.db, story_id).await?;
        if !(1..=5).contains(&rating) {
            debug!("Ignoring rating {} for story {}", rating, story_id);
            return Ok(story);
        }

        let (sum, count) = (
            story.rating_sum.saturating_add(rating),
            story.rating_count.saturating_add(1),
        );
        let mut active: stories::ActiveModel = story.into();
        active.rating_sum = Set(sum);
        active.rating_count = Set(count);
        Ok(active.update(&self.db).await?)
    }

    /// Load the reader page and count the view.
    pub async fn read(&self, story_id: i32, part: Option<i32>) -> ContentResult<StoryPage> {
        let story = find_story(&self.db, story_id).await?;
        let views = story.views.saturating_add(1);
        let mut active: stories::ActiveModel = story.into();
        active.views = Set(views);
        let story = active.update(&self.db).await?;

        let chapters = chapters_of(&self.db, story.id).await?;
        let total_parts = chapters.len();
        let current_index = match part {
            Some(n) if n >= 1 && (n as usize) <= total_parts => n,
            _ => 1,
        };
        let current_part = chapters
            .iter()
            .find(|chapter| chapter.part_number == current_index)
            .cloned();
        let videos = match &current_part {
            Some(chapter) => video_links::videos_for_part(&self.db, chapter.id).await?,
            None => Vec::new(),
        };

        let comments = comments::Entity::find()
            .filter(comments::Column::StoryId.eq(story.id))
            .order_by_desc(comments::Column::CreatedAt)
            .order_by_desc(comments::Column::Id)
            .all(&self.db)
            .await?;

        Ok(StoryPage {
            average_rating: story.average_rating(),
            categories: categories_of(&self.db, &story).await?,
            parts: chapters
                .iter()
                .map(|chapter| PartHeading {
                    id: chapter.id,
                    part_number: chapter.part_number,
                    created_at: chapter.created_at,
                })
                .collect(),
            total_parts,
            current_index,
            current_part,
            videos,
            comments,
            story,
        })
    }

    pub async fn outline(&self, story_id: i32) -> ContentResult<StoryOutline> {
        let story = find_story(&self.db, story_id).await?;
        Ok(StoryOutline {
            categories: categories_of(&self.db, &story).await?,
            parts: chapters_of(&self.db, story.id).await?,
            story,
        })
    }
}

/// Rewrite a leading `### Phần ` or `## Phần ` on the first line to `Chương `.
pub fn normalize_chapter_heading(content: &str) -> String {
    let (first, rest) = match content.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (content, None),
    };

    let first = HEADING_PREFIXES
        .iter()
        .find_map(|prefix| first.strip_prefix(prefix))
        .map(|title| format!("{}{}", CHAPTER_PREFIX, title))
        .unwrap_or_else(|| first.to_string());

    match rest {
        Some(rest) => format!("{}\n{}", first, rest),
        None => first,
    }
}

fn parse_story_type(value: Option<&str>) -> ContentResult<StoryType> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        None => Ok(StoryType::default()),
        Some(raw) => StoryType::parse(raw)
            .ok_or_else(|| ContentError::validation(format!("Unknown story type '{}'", raw))),
    }
}

fn clean_author(author: Option<String>) -> Option<String> {
    author
        .map(|author| author.trim().to_string())
        .filter(|author| !author.is_empty())
}

async fn find_story<C: ConnectionTrait>(conn: &C, story_id: i32) -> ContentResult<stories::Model> {
    stories::Entity::find_by_id(story_id)
        .one(conn)
        .await?
        .ok_or_else(|| ContentError::not_found("Story", story_id))
}

async fn last_part<C: ConnectionTrait>(conn: &C, story_id: i32) -> Result<Option<parts::Model>, DbErr> {
    parts::Entity::find()
        .filter(parts::Column::StoryId.eq(story_id))
        .order_by_desc(parts::Column::PartNumber)
        .one(conn)
        .await
}

async fn chapters_of<C: ConnectionTrait>(conn: &C, story_id: i32) -> Result<Vec<parts::Model>, DbErr> {
    parts::Entity::find()
        .filter(parts::Column::StoryId.eq(story_id))
        .order_by_asc(parts::Column::PartNumber)
        .all(conn)
        .await
}

async fn categories_of<C: ConnectionTrait>(
    conn: &C,
    story: &stories::Model,
) -> Result<Vec<categories::Model>, DbErr> {
    story
        .find_related(categories::Entity)
        .order_by_asc(categories::Column::Name)
        .all(conn)
        .await
}

/// Requested ids that exist, in request order, without repeats.
async fn existing_category_ids<C: ConnectionTrait>(conn: &C, requested: &[i32]) -> Result<Vec<i32>, DbErr> {
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let known: Vec<i32> = categories::Entity::find()
        .select_only()
        .column(categories::Column::Id)
        .filter(categories::Column::Id.is_in(requested.to_vec()))
        .into_tuple()
        .all(conn)
        .await?;

    let mut ids = Vec::new();
    for id in requested {
        if known.contains(id) && !ids.contains(id) {
            ids.push(*id);
        }
    }
    Ok(ids)
}

async fn link_categories<C: ConnectionTrait>(conn: &C, story_id: i32, category_ids: &[i32]) -> Result<(), DbErr> {
    if category_ids.is_empty() {
        return Ok(());
    }

    story_categories::Entity::insert_many(category_ids.iter().map(|category_id| {
        story_categories::ActiveModel {
            story_id: Set(story_id),
            category_id: Set(*category_id),
        }
    }))
    .exec_without_returning(conn)
    .await?;

    Ok(())
}
