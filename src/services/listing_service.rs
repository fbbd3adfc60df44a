//! Reader-facing story lists. Hidden stories never appear here.

use sea_orm::sea_query::Expr;
use sea_orm::*;
use serde::Serialize;

use super::pagination::{fetch_page, Page};
use crate::database::entities::{categories, parts, stories, stories::StoryType, story_categories};
use crate::errors::{ContentError, ContentResult};

pub const PER_PAGE: u64 = 10;
pub const TRENDING_LIMIT: u64 = 20;
pub const BEST_LIMIT: u64 = 10;
pub const RECENT_LIMIT: u64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct HomePage {
    /// Highest average rating, rated stories only
    pub best: Vec<stories::Model>,
    /// Most viewed
    pub trending: Vec<stories::Model>,
    /// Latest chapter first
    pub recent: Vec<stories::Model>,
    pub short: Page<stories::Model>,
    pub long: Page<stories::Model>,
    pub categories: Vec<categories::Model>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryListing {
    pub category: categories::Model,
    pub stories: Page<stories::Model>,
}

#[derive(Clone)]
pub struct ListingService {
    db: DatabaseConnection,
}

impl ListingService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn home(&self, short_page: u64, long_page: u64) -> ContentResult<HomePage> {
        let best = visible()
            .filter(stories::Column::RatingCount.gt(0))
            .order_by_desc(Expr::cust("CAST(rating_sum AS REAL) / rating_count"))
            .order_by_desc(stories::Column::RatingCount)
            .order_by_asc(stories::Column::Id)
            .limit(BEST_LIMIT)
            .all(&self.db)
            .await?;

        let trending = visible()
            .order_by_desc(stories::Column::Views)
            .order_by_asc(stories::Column::Id)
            .limit(TRENDING_LIMIT)
            .all(&self.db)
            .await?;

        let short = self.by_kind(StoryType::Short, short_page).await?;
        let long = self.by_kind(StoryType::Long, long_page).await?;

        let categories = categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await?;

        Ok(HomePage {
            best,
            trending,
            recent: self.recently_updated().await?,
            short,
            long,
            categories,
        })
    }

    /// Stories ordered by the creation time of their newest chapter.
    pub async fn recently_updated(&self) -> ContentResult<Vec<stories::Model>> {
        let ids: Vec<i32> = parts::Entity::find()
            .select_only()
            .column(parts::Column::StoryId)
            .inner_join(stories::Entity)
            .filter(stories::Column::IsHidden.eq(false))
            .group_by(parts::Column::StoryId)
            .order_by_desc(parts::Column::CreatedAt.max())
            .limit(RECENT_LIMIT)
            .into_tuple()
            .all(&self.db)
            .await?;

        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut found = stories::Entity::find()
            .filter(stories::Column::Id.is_in(ids.clone()))
            .all(&self.db)
            .await?;
        found.sort_by_key(|story| ids.iter().position(|id| *id == story.id));

        Ok(found)
    }

    pub async fn by_category(&self, category_id: i32, page: u64) -> ContentResult<CategoryListing> {
        let category = categories::Entity::find_by_id(category_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ContentError::not_found("Category", category_id))?;

        let select = visible()
            .inner_join(story_categories::Entity)
            .filter(story_categories::Column::CategoryId.eq(category.id))
            .order_by_desc(stories::Column::CreatedAt)
            .order_by_desc(stories::Column::Id);

        Ok(CategoryListing {
            category,
            stories: fetch_page(&self.db, select, page, PER_PAGE).await?,
        })
    }

    pub async fn by_author(&self, author: &str, page: u64) -> ContentResult<Page<stories::Model>> {
        let select = visible()
            .filter(stories::Column::Author.eq(author))
            .order_by_desc(stories::Column::CreatedAt)
            .order_by_desc(stories::Column::Id);

        Ok(fetch_page(&self.db, select, page, PER_PAGE).await?)
    }

    /// `short` or `long`; any other type is reported as not found.
    pub async fn by_type(&self, story_type: &str, page: u64) -> ContentResult<Page<stories::Model>> {
        let kind = StoryType::parse(story_type)
            .ok_or_else(|| ContentError::not_found("Story type", story_type))?;
        self.by_kind(kind, page).await
    }

    async fn by_kind(&self, kind: StoryType, page: u64) -> ContentResult<Page<stories::Model>> {
        let select = visible()
            .filter(stories::Column::StoryType.eq(kind.as_str()))
            .order_by_desc(stories::Column::CreatedAt)
            .order_by_desc(stories::Column::Id);

        Ok(fetch_page(&self.db, select, page, PER_PAGE).await?)
    }
}

fn visible() -> Select<stories::Entity> {
    stories::Entity::find().filter(stories::Column::IsHidden.eq(false))
}
