pub mod admin_stories;
pub mod categories;
pub mod exchange;
pub mod health;
pub mod reader;
