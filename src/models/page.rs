use serde::Deserialize;

use crate::schema::catalog::MAX_PER_PAGE;

pub const DEFAULT_PER_PAGE: u64 = 20;

/// `?page=&perPage=` query, already range-checked by the `Pagination` schema.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u64>,
    #[serde(rename = "perPage")]
    pub per_page: Option<u64>,
}

impl Pagination {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }
}

/// One slice of a larger list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

impl<T: Clone> Page<T> {
    pub fn slice(items: &[T], pagination: Pagination) -> Self {
        let page = pagination.page();
        let per_page = pagination.per_page();
        let start = (page - 1).saturating_mul(per_page);

        Self {
            items: items
                .iter()
                .skip(usize::try_from(start).unwrap_or(usize::MAX))
                .take(per_page as usize)
                .cloned()
                .collect(),
            page,
            per_page,
            total: items.len() as u64,
        }
    }
}
