use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Page served when none is requested.
pub const DEFAULT_PAGE_NUMBER: u64 = 1;
/// Page size used when none is requested.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

pub(crate) fn default_page_number() -> u64 {
    DEFAULT_PAGE_NUMBER
}

pub(crate) fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

/// Ordering applied to the selected sort key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first.
    Asc,
    /// Largest first.
    #[default]
    Desc,
}

impl SortDirection {
    /// Apply the direction to an ascending comparison.
    pub fn apply(self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// One page of a listing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    /// Number of pages at the current page size.
    pub pages_count: u64,
    /// 1-based page number.
    pub page: u64,
    /// Items per page.
    pub page_size: u64,
    /// Items across all pages.
    pub total_count: u64,
    /// Items of this page.
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    /// Cut page `page` (1-based) of `page_size` items out of an already sorted listing.
    pub fn from_sorted(all: Vec<T>, page: u64, page_size: u64) -> Self {
        let page = page.max(1);
        let page_size = page_size.max(1);
        let total_count = all.len() as u64;
        let skip = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
        let take = usize::try_from(page_size).unwrap_or(usize::MAX);
        let items = all.into_iter().skip(skip).take(take).collect();

        Self {
            pages_count: total_count.div_ceil(page_size),
            page,
            page_size,
            total_count,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_cut_from_sorted_items() {
        let page = Paginated::from_sorted((1..=7).collect::<Vec<_>>(), 2, 3);
        assert_eq!(page.items, vec![4, 5, 6]);
        assert_eq!(page.pages_count, 3);
        assert_eq!(page.total_count, 7);

        let last = Paginated::from_sorted((1..=7).collect::<Vec<_>>(), 3, 3);
        assert_eq!(last.items, vec![7]);

        let beyond = Paginated::from_sorted((1..=7).collect::<Vec<_>>(), 9, 3);
        assert!(beyond.items.is_empty());
    }

    #[test]
    fn huge_page_number_yields_empty_page() {
        let page = Paginated::from_sorted(vec![1, 2, 3], u64::MAX, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.page, u64::MAX);
        assert_eq!(page.total_count, 3);

        let wide = Paginated::from_sorted(vec![1, 2, 3], 2, u64::MAX);
        assert!(wide.items.is_empty());
        assert_eq!(wide.pages_count, 1);
    }

    #[test]
    fn empty_listing_has_no_pages() {
        let page = Paginated::<u8>::from_sorted(Vec::new(), 1, 10);
        assert_eq!(page.pages_count, 0);
        assert_eq!(page.total_count, 0);
    }
}
