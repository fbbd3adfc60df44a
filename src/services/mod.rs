pub mod category_service;
pub mod comment_service;
pub mod listing_service;
pub mod pagination;
pub mod search_service;
pub mod story_service;
pub mod video_links;

pub use category_service::CategoryService;
pub use comment_service::CommentService;
pub use listing_service::ListingService;
pub use pagination::{Page, Pagination};
pub use search_service::SearchService;
pub use story_service::StoryService;
