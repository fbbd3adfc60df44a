//! The portable export document.
//!
//! A document is a JSON object with five collections. Every record keeps the numeric id it
//! had in the exporting database; ids are only references inside the document and are
//! never reused on import.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{ExchangeError, ExchangeResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Document {
    #[serde(default, deserialize_with = "null_default")]
    pub categories: Vec<CategoryRecord>,
    #[serde(default, deserialize_with = "null_default")]
    pub stories: Vec<StoryRecord>,
    #[serde(default, deserialize_with = "null_default")]
    pub parts: Vec<PartRecord>,
    #[serde(default, deserialize_with = "null_default")]
    pub comments: Vec<CommentRecord>,
    #[serde(default, deserialize_with = "null_default")]
    pub videos: Vec<VideoRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct CategoryRecord {
    #[serde(default, deserialize_with = "null_default")]
    pub id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct StoryRecord {
    #[serde(default, deserialize_with = "null_default")]
    pub id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default = "default_story_type", deserialize_with = "story_type_or_short")]
    pub story_type: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub views: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub is_hidden: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub is_completed: bool,
    #[serde(default, deserialize_with = "null_default")]
    pub rating_sum: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub rating_count: i32,
    #[serde(default)]
    pub category_id: Option<i32>,
    #[serde(default, deserialize_with = "null_default")]
    pub categories: Vec<i32>,
}

impl Default for StoryRecord {
    fn default() -> Self {
        Self {
            id: 0,
            title: String::new(),
            author: None,
            story_type: default_story_type(),
            created_at: None,
            views: 0,
            is_hidden: false,
            is_completed: false,
            rating_sum: 0,
            rating_count: 0,
            category_id: None,
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct PartRecord {
    #[serde(default, deserialize_with = "null_default")]
    pub id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub story_id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub part_number: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct CommentRecord {
    #[serde(default, deserialize_with = "null_default")]
    pub id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub story_id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub content: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct VideoRecord {
    #[serde(default, deserialize_with = "null_default")]
    pub id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub part_id: i32,
    #[serde(default, deserialize_with = "null_default")]
    pub url: String,
}

impl Document {
    /// Content of the incoming part 1 of a story, if the document carries one.
    pub fn first_part_content(&self, story_id: i32) -> Option<&str> {
        self.parts
            .iter()
            .find(|part| part.story_id == story_id && part.part_number == 1)
            .map(|part| part.content.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
            && self.stories.is_empty()
            && self.parts.is_empty()
            && self.comments.is_empty()
            && self.videos.is_empty()
    }
}

/// Decode uploaded bytes into a document without touching any store.
pub fn parse(bytes: &[u8]) -> ExchangeResult<Document> {
    serde_json::from_slice(bytes).map_err(|e| ExchangeError::InvalidDocument(e.to_string()))
}

pub fn encode_timestamp(value: &DateTime<Utc>) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

/// Decode an exported timestamp, falling back to the current time.
pub fn decode_timestamp(value: Option<&str>) -> DateTime<Utc> {
    decode_timestamp_or(value, Utc::now())
}

pub fn decode_timestamp_or(value: Option<&str>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return fallback;
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return naive.and_utc();
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
    {
        return midnight.and_utc();
    }

    tracing::debug!(
        "Unparseable timestamp '{}', using {}",
        raw,
        fallback.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    fallback
}

fn default_story_type() -> String {
    "short".to_string()
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn story_type_or_short<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_story_type))
}
