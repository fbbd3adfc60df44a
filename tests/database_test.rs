//! Database functionality tests
//!
//! Schema creation and cascading deletes of the story tree

use anyhow::Result;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};
use storyshelf::database::cascade::{delete_all_stories, delete_story_tree};
use storyshelf::database::entities::*;
use storyshelf::database::setup_database;
use tempfile::NamedTempFile;

/// Create a test database connection with migrations
async fn setup_test_db() -> Result<(DatabaseConnection, NamedTempFile)> {
    let temp_file = NamedTempFile::new()?;
    let db_url = format!("sqlite://{}?mode=rwc", temp_file.path().display());

    let db = Database::connect(&db_url).await?;
    setup_database(&db).await?;

    Ok((db, temp_file))
}

async fn seed_story(db: &DatabaseConnection, title: &str) -> Result<(stories::Model, parts::Model)> {
    let category = categories::ActiveModel {
        name: Set(format!("{} category", title)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    let story = stories::ActiveModel {
        title: Set(title.to_string()),
        author: Set(None),
        story_type: Set("short".to_string()),
        created_at: Set(Utc::now()),
        views: Set(0),
        is_hidden: Set(false),
        is_completed: Set(false),
        rating_sum: Set(0),
        rating_count: Set(0),
        category_id: Set(Some(category.id)),
        ..Default::default()
    }
    .insert(db)
    .await?;

    story_categories::Entity::insert(story_categories::ActiveModel {
        story_id: Set(story.id),
        category_id: Set(category.id),
    })
    .exec_without_returning(db)
    .await?;

    let part = parts::ActiveModel {
        story_id: Set(story.id),
        part_number: Set(1),
        content: Set("Once upon a time".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    part_videos::ActiveModel {
        part_id: Set(part.id),
        url: Set("https://drive.google.com/file/d/abc/view".to_string()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    comments::ActiveModel {
        story_id: Set(story.id),
        url: Set(format!("/story/{}", story.id)),
        name: Set(Some("Reader".to_string())),
        email: Set(None),
        content: Set("Lovely".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await?;

    Ok((story, part))
}

#[tokio::test]
async fn test_database_migrations() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;

    // Verify all tables exist by attempting to query them
    assert!(categories::Entity::find().all(&db).await?.is_empty());
    assert!(stories::Entity::find().all(&db).await?.is_empty());
    assert!(parts::Entity::find().all(&db).await?.is_empty());
    assert!(comments::Entity::find().all(&db).await?.is_empty());
    assert!(part_videos::Entity::find().all(&db).await?.is_empty());
    assert!(story_categories::Entity::find().all(&db).await?.is_empty());

    // Running migrations again is a no-op
    setup_database(&db).await?;

    Ok(())
}

#[tokio::test]
async fn test_delete_story_tree_removes_children() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    let (doomed, doomed_part) = seed_story(&db, "Doomed").await?;
    let (kept, _) = seed_story(&db, "Kept").await?;

    assert!(delete_story_tree(&db, doomed.id).await?);
    assert!(!delete_story_tree(&db, doomed.id).await?);

    assert!(stories::Entity::find_by_id(doomed.id).one(&db).await?.is_none());
    assert_eq!(
        parts::Entity::find()
            .filter(parts::Column::StoryId.eq(doomed.id))
            .count(&db)
            .await?,
        0
    );
    assert_eq!(
        part_videos::Entity::find()
            .filter(part_videos::Column::PartId.eq(doomed_part.id))
            .count(&db)
            .await?,
        0
    );
    assert_eq!(
        comments::Entity::find()
            .filter(comments::Column::StoryId.eq(doomed.id))
            .count(&db)
            .await?,
        0
    );

    // The other story and every category survive
    assert!(stories::Entity::find_by_id(kept.id).one(&db).await?.is_some());
    assert_eq!(categories::Entity::find().count(&db).await?, 2);
    assert_eq!(story_categories::Entity::find().count(&db).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_delete_all_stories_keeps_categories() -> Result<()> {
    let (db, _temp_file) = setup_test_db().await?;
    seed_story(&db, "One").await?;
    seed_story(&db, "Two").await?;

    assert_eq!(delete_all_stories(&db).await?, 2);

    assert_eq!(stories::Entity::find().count(&db).await?, 0);
    assert_eq!(parts::Entity::find().count(&db).await?, 0);
    assert_eq!(part_videos::Entity::find().count(&db).await?, 0);
    assert_eq!(comments::Entity::find().count(&db).await?, 0);
    assert_eq!(categories::Entity::find().count(&db).await?, 2);

    Ok(())
}
