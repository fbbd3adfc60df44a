use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "comments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub story_id: i32,
    pub url: String, // page the comment was posted from
    pub name: Option<String>,
    pub email: Option<String>,
    #[sea_orm(column_type = "Text")]
    pub content: String,
    pub created_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stories::Entity",
        from = "Column::StoryId",
        to = "super::stories::Column::Id"
    )]
    Stories,
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stories.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
