//! Cascading deletes for the story tree.
//!
//! Children are removed explicitly, in dependency order: videos, parts, comments,
//! category links, then the story row. Every function takes any `ConnectionTrait` so it
//! can run inside the import transaction.

use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QuerySelect};

use super::entities::{comments, part_videos, parts, stories, story_categories};

/// Delete one story with everything that hangs off it. Returns false if it did not exist.
pub async fn delete_story_tree<C: ConnectionTrait>(conn: &C, story_id: i32) -> Result<bool, DbErr> {
    let part_ids: Vec<i32> = parts::Entity::find()
        .select_only()
        .column(parts::Column::Id)
        .filter(parts::Column::StoryId.eq(story_id))
        .into_tuple()
        .all(conn)
        .await?;

    if !part_ids.is_empty() {
        part_videos::Entity::delete_many()
            .filter(part_videos::Column::PartId.is_in(part_ids))
            .exec(conn)
            .await?;
    }

    parts::Entity::delete_many()
        .filter(parts::Column::StoryId.eq(story_id))
        .exec(conn)
        .await?;

    comments::Entity::delete_many()
        .filter(comments::Column::StoryId.eq(story_id))
        .exec(conn)
        .await?;

    story_categories::Entity::delete_many()
        .filter(story_categories::Column::StoryId.eq(story_id))
        .exec(conn)
        .await?;

    let result = stories::Entity::delete_by_id(story_id).exec(conn).await?;

    Ok(result.rows_affected > 0)
}

/// Delete every story and its children. Categories are kept.
pub async fn delete_all_stories<C: ConnectionTrait>(conn: &C) -> Result<u64, DbErr> {
    story_categories::Entity::delete_many().exec(conn).await?;
    comments::Entity::delete_many().exec(conn).await?;
    part_videos::Entity::delete_many().exec(conn).await?;
    parts::Entity::delete_many().exec(conn).await?;
    let result = stories::Entity::delete_many().exec(conn).await?;

    Ok(result.rows_affected)
}

/// Remove one part and its video links.
pub async fn delete_part_tree<C: ConnectionTrait>(conn: &C, part_id: i32) -> Result<(), DbErr> {
    part_videos::Entity::delete_many()
        .filter(part_videos::Column::PartId.eq(part_id))
        .exec(conn)
        .await?;
    parts::Entity::delete_by_id(part_id).exec(conn).await?;

    Ok(())
}
