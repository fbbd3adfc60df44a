use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub title: String,
    pub author: Option<String>,
    pub story_type: String, // "short" or "long"
    pub created_at: ChronoDateTimeUtc,
    pub views: i32,
    pub is_hidden: bool,
    pub is_completed: bool,
    pub rating_sum: i32,
    pub rating_count: i32,
    pub category_id: Option<i32>, // primary category, first of the linked ones
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::parts::Entity")]
    Parts,
    #[sea_orm(has_many = "super::comments::Entity")]
    Comments,
    #[sea_orm(has_many = "super::story_categories::Entity")]
    StoryCategories,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id"
    )]
    PrimaryCategory,
}

impl Related<super::parts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Parts.def()
    }
}

impl Related<super::comments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::story_categories::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StoryCategories.def()
    }
}

impl Related<super::categories::Entity> for Entity {
    fn to() -> RelationDef {
        super::story_categories::Relation::Categories.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::story_categories::Relation::Stories.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Mean of all ratings, `None` until the story has been rated once.
    pub fn average_rating(&self) -> Option<f64> {
        if self.rating_count > 0 {
            Some(f64::from(self.rating_sum) / f64::from(self.rating_count))
        } else {
            None
        }
    }

    pub fn kind(&self) -> Option<StoryType> {
        StoryType::parse(&self.story_type)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoryType {
    #[default]
    Short,
    Long,
}

impl StoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoryType::Short => "short",
            StoryType::Long => "long",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "short" => Some(StoryType::Short),
            "long" => Some(StoryType::Long),
            _ => None,
        }
    }
}
