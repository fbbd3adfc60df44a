use std::sync::OnceLock;

use regex::Regex;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;

use crate::database::entities::part_videos;

/// Upper bound on the entries considered per create or update.
pub const MAX_VIDEO_LINKS: usize = 9;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoLink {
    pub id: i32,
    pub url: String,
    /// Google Drive preview URL when the link points at a Drive file
    pub embed_url: Option<String>,
}

impl From<part_videos::Model> for VideoLink {
    fn from(video: part_videos::Model) -> Self {
        let embed_url = drive_embed_url(&video.url);
        Self {
            id: video.id,
            url: video.url,
            embed_url,
        }
    }
}

/// The first nine entries, trimmed, blanks removed.
pub fn normalize_video_urls<S: AsRef<str>>(urls: &[S]) -> Vec<String> {
    urls.iter()
        .take(MAX_VIDEO_LINKS)
        .map(|url| url.as_ref().trim())
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn drive_embed_url(url: &str) -> Option<String> {
    static FILE_PATH: OnceLock<Regex> = OnceLock::new();
    static ID_PARAM: OnceLock<Regex> = OnceLock::new();

    let file_path =
        FILE_PATH.get_or_init(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").expect("drive path pattern"));
    let id_param =
        ID_PARAM.get_or_init(|| Regex::new(r"[?&]id=([A-Za-z0-9_-]+)").expect("drive id pattern"));

    file_path
        .captures(url)
        .or_else(|| id_param.captures(url))
        .map(|caps| format!("https://drive.google.com/file/d/{}/preview", &caps[1]))
}

pub async fn videos_for_part<C: ConnectionTrait>(conn: &C, part_id: i32) -> Result<Vec<VideoLink>, DbErr> {
    Ok(part_videos::Entity::find()
        .filter(part_videos::Column::PartId.eq(part_id))
        .order_by_asc(part_videos::Column::Id)
        .all(conn)
        .await?
        .into_iter()
        .map(VideoLink::from)
        .collect())
}

/// Attach already-normalised URLs to a part.
pub async fn attach_videos<C: ConnectionTrait>(conn: &C, part_id: i32, urls: &[String]) -> Result<(), DbErr> {
    if urls.is_empty() {
        return Ok(());
    }

    part_videos::Entity::insert_many(urls.iter().map(|url| part_videos::ActiveModel {
        part_id: Set(part_id),
        url: Set(url.clone()),
        ..Default::default()
    }))
    .exec_without_returning(conn)
    .await?;

    Ok(())
}

pub async fn replace_videos<C: ConnectionTrait>(conn: &C, part_id: i32, urls: &[String]) -> Result<(), DbErr> {
    part_videos::Entity::delete_many()
        .filter(part_videos::Column::PartId.eq(part_id))
        .exec(conn)
        .await?;
    attach_videos(conn, part_id, urls).await
}
