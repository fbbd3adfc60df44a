use sea_orm::{DatabaseConnection, DbErr, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_num: Option<u64>,
    pub next_num: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, per_page: u64, total: u64) -> Self {
        let page = page.max(1);
        let pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        let has_prev = page > 1;
        let has_next = page < pages;

        Self {
            page,
            per_page,
            total,
            pages,
            has_prev,
            has_next,
            prev_num: has_prev.then(|| page - 1),
            next_num: has_next.then(|| page + 1),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(flatten)]
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Query parameter page number, 1-based; missing or zero means the first page.
pub fn page_or_first(page: Option<u64>) -> u64 {
    page.unwrap_or(1).max(1)
}

/// Fetch one 1-based page of a select. Pages past the end are empty.
pub async fn fetch_page<E>(
    db: &DatabaseConnection,
    select: Select<E>,
    page: u64,
    per_page: u64,
) -> Result<Page<E::Model>, DbErr>
where
    E: EntityTrait,
    E::Model: Send + Sync,
{
    let paginator = select.paginate(db, per_page);
    let total = paginator.num_items().await?;
    let pagination = Pagination::new(page, per_page, total);

    // Past the end there is nothing to fetch, and the offset could overflow
    let items = if pagination.page > pagination.pages {
        Vec::new()
    } else {
        paginator.fetch_page(pagination.page - 1).await?
    };

    Ok(Page { items, pagination })
}
