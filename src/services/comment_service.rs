use chrono::Utc;
use sea_orm::*;
use serde::Deserialize;
use tracing::debug;

use crate::database::entities::{comments, stories};
use crate::errors::{ContentError, ContentResult};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewComment {
    pub name: Option<String>,
    pub content: String,
    /// Page the comment was posted from
    pub url: Option<String>,
}

#[derive(Clone)]
pub struct CommentService {
    db: DatabaseConnection,
}

impl CommentService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn post(&self, story_id: i32, input: NewComment) -> ContentResult<comments::Model> {
        let story = stories::Entity::find_by_id(story_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ContentError::not_found("Story", story_id))?;

        let content = input.content.trim();
        if content.is_empty() {
            return Err(ContentError::validation("Comment content must not be empty"));
        }
        let name = input
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string);
        let url = input
            .url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| format!("/story/{}", story.id));

        let comment = comments::ActiveModel {
            story_id: Set(story.id),
            url: Set(url),
            name: Set(name),
            // not collected from readers
            email: Set(None),
            content: Set(content.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        debug!("Comment {} posted on story {}", comment.id, story.id);
        Ok(comment)
    }

    /// Newest first.
    pub async fn list_for_story(&self, story_id: i32) -> ContentResult<Vec<comments::Model>> {
        Ok(comments::Entity::find()
            .filter(comments::Column::StoryId.eq(story_id))
            .order_by_desc(comments::Column::CreatedAt)
            .order_by_desc(comments::Column::Id)
            .all(&self.db)
            .await?)
    }
}
