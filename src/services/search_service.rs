use std::collections::HashMap;

use sea_orm::sea_query::{Expr, Func, IntoColumnRef, SimpleExpr};
use sea_orm::*;
use serde::{Deserialize, Serialize};

use super::pagination::{fetch_page, Page};
use crate::database::entities::{parts, stories};
use crate::errors::ContentResult;
use crate::highlight::highlighted_excerpt;

pub const ADMIN_PER_PAGE: u64 = 25;

/// What the admin list query matches against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    /// Title or author
    #[default]
    Title,
    /// Chapter content, with a highlighted snippet per story
    Content,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStoryList {
    pub stories: Page<stories::Model>,
    pub query: String,
    pub field: SearchField,
    /// Story id to highlighted excerpt of its first matching chapter
    pub snippets: HashMap<i32, String>,
}

#[derive(Clone)]
pub struct SearchService {
    db: DatabaseConnection,
}

impl SearchService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Visible stories whose title, author or any chapter contains the query.
    pub async fn search(&self, query: &str) -> ContentResult<Vec<stories::Model>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        Ok(stories::Entity::find()
            .join(JoinType::LeftJoin, stories::Relation::Parts.def())
            .filter(
                Condition::any()
                    .add(contains_ci((stories::Entity, stories::Column::Title), query))
                    .add(contains_ci((stories::Entity, stories::Column::Author), query))
                    .add(contains_ci((parts::Entity, parts::Column::Content), query)),
            )
            .filter(stories::Column::IsHidden.eq(false))
            .distinct()
            .order_by_desc(stories::Column::CreatedAt)
            .order_by_desc(stories::Column::Id)
            .all(&self.db)
            .await?)
    }

    /// Every story, hidden ones included, newest first, optionally filtered.
    pub async fn admin_list(
        &self,
        page: u64,
        query: &str,
        field: SearchField,
    ) -> ContentResult<AdminStoryList> {
        let query = query.trim().to_string();

        let filtered = if query.is_empty() {
            stories::Entity::find()
        } else {
            match field {
                SearchField::Content => stories::Entity::find()
                    .join(JoinType::InnerJoin, stories::Relation::Parts.def())
                    .filter(contains_ci((parts::Entity, parts::Column::Content), &query))
                    .distinct(),
                SearchField::Title => stories::Entity::find().filter(
                    Condition::any()
                        .add(contains_ci((stories::Entity, stories::Column::Title), &query))
                        .add(contains_ci((stories::Entity, stories::Column::Author), &query)),
                ),
            }
        };
        let select = filtered
            .order_by_desc(stories::Column::CreatedAt)
            .order_by_desc(stories::Column::Id);

        let stories = fetch_page(&self.db, select, page, ADMIN_PER_PAGE).await?;

        let mut snippets = HashMap::new();
        if !query.is_empty() && field == SearchField::Content {
            for story in &stories.items {
                let first_match = parts::Entity::find()
                    .filter(parts::Column::StoryId.eq(story.id))
                    .filter(contains_ci((parts::Entity, parts::Column::Content), &query))
                    .order_by_asc(parts::Column::PartNumber)
                    .one(&self.db)
                    .await?;
                if let Some(part) = first_match {
                    snippets.insert(story.id, highlighted_excerpt(&part.content, &query));
                }
            }
        }

        Ok(AdminStoryList {
            stories,
            query,
            field,
            snippets,
        })
    }
}

/// Case-insensitive substring match that behaves the same on SQLite and PostgreSQL.
fn contains_ci(column: impl IntoColumnRef, query: &str) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(column))).like(format!("%{}%", query.to_lowercase()))
}
