use sea_orm::*;
use serde::Deserialize;
use tracing::info;

use crate::database::entities::{categories, stories, story_categories};
use crate::errors::{ContentError, ContentResult};

/// Either a batch of names or a single one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewCategories {
    pub names: Vec<String>,
    pub name: Option<String>,
}

impl NewCategories {
    /// Trimmed, non-empty names. A non-empty batch wins over the single name.
    pub fn requested(&self) -> Vec<String> {
        let batch: Vec<String> = self
            .names
            .iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        if !batch.is_empty() {
            return batch;
        }

        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| vec![name.to_string()])
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct CategoryService {
    db: DatabaseConnection,
}

impl CategoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> ContentResult<Vec<categories::Model>> {
        Ok(categories::Entity::find()
            .order_by_asc(categories::Column::Name)
            .all(&self.db)
            .await?)
    }

    pub async fn get(&self, category_id: i32) -> ContentResult<categories::Model> {
        categories::Entity::find_by_id(category_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ContentError::not_found("Category", category_id))
    }

    /// Case-insensitive lookup by name.
    pub async fn find_by_name(&self, name: &str) -> ContentResult<Option<categories::Model>> {
        let wanted = name.trim().to_lowercase();
        Ok(self
            .list_by_id()
            .await?
            .into_iter()
            .find(|category| category.name.to_lowercase() == wanted))
    }

    /// Create the requested categories that do not exist yet.
    pub async fn create(&self, request: NewCategories) -> ContentResult<Vec<categories::Model>> {
        let requested = request.requested();
        if requested.is_empty() {
            return Err(ContentError::validation("Category name is required"));
        }

        let mut known: Vec<String> = self
            .list_by_id()
            .await?
            .into_iter()
            .map(|category| category.name.to_lowercase())
            .collect();

        let txn = self.db.begin().await?;
        let mut created = Vec::new();
        for name in requested {
            let key = name.to_lowercase();
            if known.contains(&key) {
                continue;
            }

            let category = categories::ActiveModel {
                name: Set(name),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            known.push(key);
            created.push(category);
        }

        if created.is_empty() {
            return Err(ContentError::conflict("All of these categories already exist"));
        }
        txn.commit().await?;

        info!("Created {} categories", created.len());
        Ok(created)
    }

    pub async fn rename(&self, category_id: i32, name: &str) -> ContentResult<categories::Model> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ContentError::validation("Category name is required"));
        }

        let category = self.get(category_id).await?;
        if let Some(other) = self.find_by_name(name).await? {
            if other.id != category.id {
                return Err(ContentError::conflict(format!(
                    "Category '{}' already exists",
                    other.name
                )));
            }
        }

        let mut active: categories::ActiveModel = category.into();
        active.name = Set(name.to_string());
        Ok(active.update(&self.db).await?)
    }

    /// Delete a category nothing refers to.
    pub async fn delete(&self, category_id: i32) -> ContentResult<()> {
        let category = self.get(category_id).await?;

        let as_primary = stories::Entity::find()
            .filter(stories::Column::CategoryId.eq(category.id))
            .count(&self.db)
            .await?;
        let as_link = story_categories::Entity::find()
            .filter(story_categories::Column::CategoryId.eq(category.id))
            .count(&self.db)
            .await?;
        if as_primary + as_link > 0 {
            return Err(ContentError::conflict(format!(
                "Category '{}' is in use",
                category.name
            )));
        }

        categories::Entity::delete_by_id(category.id)
            .exec(&self.db)
            .await?;

        info!("Deleted category {} '{}'", category.id, category.name);
        Ok(())
    }

    async fn list_by_id(&self) -> Result<Vec<categories::Model>, DbErr> {
        categories::Entity::find()
            .order_by_asc(categories::Column::Id)
            .all(&self.db)
            .await
    }
}
