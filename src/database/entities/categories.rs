use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::story_categories::Entity")]
    StoryCategories,
}

impl Related<super::story_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoryCategories.def()
    }
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        super::story_categories::Relation::Stories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::story_categories::Relation::Categories.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}
