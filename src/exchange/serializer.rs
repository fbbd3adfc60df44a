use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, QueryOrder};
use tracing::info;

use super::document::{
    encode_timestamp, CategoryRecord, CommentRecord, Document, PartRecord, StoryRecord,
    VideoRecord,
};
use crate::database::entities::{categories, comments, part_videos, parts, stories, story_categories};
use crate::errors::ExchangeResult;

/// Snapshot the whole content store, every collection ordered by id.
pub async fn export<C: ConnectionTrait>(conn: &C) -> Result<Document, DbErr> {
    let categories = categories::Entity::find()
        .order_by_asc(categories::Column::Id)
        .all(conn)
        .await?;
    let stories = stories::Entity::find()
        .order_by_asc(stories::Column::Id)
        .all(conn)
        .await?;
    let links = story_categories::Entity::find()
        .order_by_asc(story_categories::Column::StoryId)
        .order_by_asc(story_categories::Column::CategoryId)
        .all(conn)
        .await?;
    let parts = parts::Entity::find()
        .order_by_asc(parts::Column::Id)
        .all(conn)
        .await?;
    let comments = comments::Entity::find()
        .order_by_asc(comments::Column::Id)
        .all(conn)
        .await?;
    let videos = part_videos::Entity::find()
        .order_by_asc(part_videos::Column::Id)
        .all(conn)
        .await?;

    let mut linked: HashMap<i32, Vec<i32>> = HashMap::new();
    for link in links {
        linked.entry(link.story_id).or_default().push(link.category_id);
    }

    let document = Document {
        categories: categories
            .into_iter()
            .map(|category| CategoryRecord {
                id: category.id,
                name: category.name,
            })
            .collect(),
        stories: stories
            .into_iter()
            .map(|story| {
                let categories = story_category_ids(
                    story.category_id,
                    linked.remove(&story.id).unwrap_or_default(),
                );
                StoryRecord {
                    id: story.id,
                    title: story.title,
                    author: story.author,
                    story_type: story.story_type,
                    created_at: Some(encode_timestamp(&story.created_at)),
                    views: story.views,
                    is_hidden: story.is_hidden,
                    is_completed: story.is_completed,
                    rating_sum: story.rating_sum,
                    rating_count: story.rating_count,
                    category_id: story.category_id,
                    categories,
                }
            })
            .collect(),
        parts: parts
            .into_iter()
            .map(|part| PartRecord {
                id: part.id,
                story_id: part.story_id,
                part_number: part.part_number,
                content: part.content,
                created_at: Some(encode_timestamp(&part.created_at)),
            })
            .collect(),
        comments: comments
            .into_iter()
            .map(|comment| CommentRecord {
                id: comment.id,
                story_id: comment.story_id,
                url: comment.url,
                name: comment.name,
                email: comment.email,
                content: comment.content,
                created_at: Some(encode_timestamp(&comment.created_at)),
            })
            .collect(),
        videos: videos
            .into_iter()
            .map(|video| VideoRecord {
                id: video.id,
                part_id: video.part_id,
                url: video.url,
            })
            .collect(),
    };

    info!(
        "Exported {} categories, {} stories, {} parts, {} comments, {} videos",
        document.categories.len(),
        document.stories.len(),
        document.parts.len(),
        document.comments.len(),
        document.videos.len()
    );

    Ok(document)
}

/// Pretty-printed UTF-8 JSON; non-ASCII text is written as-is.
pub fn to_json_bytes(document: &Document) -> ExchangeResult<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(document)?)
}

pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("films_export_{}.json", now.format("%Y%m%d_%H%M%S"))
}

// Primary category first; import takes the first resolved id as primary.
fn story_category_ids(primary: Option<i32>, mut linked: Vec<i32>) -> Vec<i32> {
    if let Some(primary) = primary {
        if let Some(index) = linked.iter().position(|id| *id == primary) {
            linked.remove(index);
            linked.insert(0, primary);
        }
    }
    linked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::setup_test_db;
    use chrono::TimeZone;
    use sea_orm::{ActiveModelTrait, Set};

    #[test]
    fn filename_uses_utc_timestamp() {
        let now = Utc.with_ymd_and_hms(2024, 1, 31, 8, 5, 9).unwrap();
        assert_eq!(export_filename(now), "films_export_20240131_080509.json");
    }

    #[test]
    fn primary_category_moves_to_front() {
        assert_eq!(story_category_ids(Some(5), vec![2, 5, 9]), vec![5, 2, 9]);
        assert_eq!(story_category_ids(Some(4), vec![2, 9]), vec![2, 9]);
        assert_eq!(story_category_ids(None, vec![3, 1]), vec![3, 1]);
    }

    #[test]
    fn json_keeps_non_ascii_text() {
        let document = Document {
            categories: vec![CategoryRecord {
                id: 1,
                name: "Tiên hiệp".to_string(),
            }],
            ..Default::default()
        };

        let text = String::from_utf8(to_json_bytes(&document).unwrap()).unwrap();
        assert!(text.contains("Tiên hiệp"));
        assert!(text.contains("\"videos\": []"));
    }

    #[tokio::test]
    async fn export_carries_links_and_ordering() {
        let db = setup_test_db().await;

        let fantasy = categories::ActiveModel {
            name: Set("Fantasy".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let romance = categories::ActiveModel {
            name: Set("Romance".to_string()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let story = stories::ActiveModel {
            title: Set("Alpha".to_string()),
            author: Set(Some("An".to_string())),
            story_type: Set("long".to_string()),
            created_at: Set(Utc.with_ymd_and_hms(2023, 5, 6, 7, 8, 9).unwrap()),
            views: Set(12),
            is_hidden: Set(false),
            is_completed: Set(true),
            rating_sum: Set(9),
            rating_count: Set(2),
            category_id: Set(Some(romance.id)),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        for category_id in [fantasy.id, romance.id] {
            story_categories::ActiveModel {
                story_id: Set(story.id),
                category_id: Set(category_id),
            }
            .insert(&db)
            .await
            .unwrap();
        }

        let document = export(&db).await.unwrap();

        assert_eq!(document.categories.len(), 2);
        assert_eq!(document.categories[0].name, "Fantasy");
        let exported = &document.stories[0];
        assert_eq!(exported.categories, vec![romance.id, fantasy.id]);
        assert_eq!(exported.category_id, Some(romance.id));
        assert_eq!(exported.created_at.as_deref(), Some("2023-05-06T07:08:09.000000"));
        assert_eq!(exported.rating_sum, 9);
        assert!(exported.is_completed);
    }
}
