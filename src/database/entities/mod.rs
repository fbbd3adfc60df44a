pub mod categories;
pub mod comments;
pub mod part_videos;
pub mod parts;
pub mod stories;
pub mod story_categories;
