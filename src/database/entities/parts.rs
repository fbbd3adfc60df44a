use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "parts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub story_id: i32,
    pub part_number: i32, // 1-based, contiguous per story
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
    #[sea_orm(has_many = "super::part_videos::Entity")]
    PartVideos,
}

impl Related<super::stories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Stories.def()
    }
}

impl Related<super::part_videos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PartVideos.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
