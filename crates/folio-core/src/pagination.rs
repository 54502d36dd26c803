//! Stateless page slicing plus the per-namespace page memory
//!
//! The slicing math is pure; the chosen page index for a namespace key
//! is persisted into `UserContext.pagination` so returning to that
//! listing resumes at the last-viewed page.

use crate::store::ContextStore;

/// A clamped window into a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSlice {
    pub start: usize,
    pub end: usize,
    /// Clamped page index actually shown
    pub index: usize,
    /// Always at least 1
    pub total_pages: usize,
}

/// Prev/indicator/next descriptors, only present when there is more
/// than one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNav {
    pub has_prev: bool,
    pub has_next: bool,
    /// e.g. `2/3`
    pub indicator: String,
}

/// Slice `len` items into pages of `page_size`, clamping `page_index`
/// into the valid range
pub fn page(len: usize, page_index: usize, page_size: usize) -> PageSlice {
    let size = page_size.max(1);
    let total_pages = len.div_ceil(size).max(1);
    let index = page_index.min(total_pages - 1);
    let start = index * size;
    let end = (start + size).min(len);
    PageSlice {
        start,
        end,
        index,
        total_pages,
    }
}

/// Slice a concrete item list, returning the visible window
pub fn page_items<T>(items: &[T], page_index: usize, page_size: usize) -> (&[T], PageSlice) {
    let slice = page(items.len(), page_index, page_size);
    (&items[slice.start..slice.end], slice)
}

/// Navigation descriptors for a slice, or `None` for single-page lists
pub fn nav(slice: &PageSlice) -> Option<PageNav> {
    if slice.total_pages <= 1 {
        return None;
    }
    Some(PageNav {
        has_prev: slice.index > 0,
        has_next: slice.index + 1 < slice.total_pages,
        indicator: format!("{}/{}", slice.index + 1, slice.total_pages),
    })
}

/// Persist the clamped page index for a namespace key
pub fn remember_page(store: &ContextStore, user_id: &str, namespace: &str, slice: &PageSlice) {
    let index = slice.index;
    store.with(user_id, |ctx| {
        ctx.pagination.insert(namespace.to_string(), index);
    });
}

/// Last-viewed page index for a namespace key, defaulting to the first
pub fn recall_page(store: &ContextStore, user_id: &str, namespace: &str) -> usize {
    store.with(user_id, |ctx| {
        ctx.pagination.get(namespace).copied().unwrap_or(0)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_45_items_in_pages_of_20() {
        let slice = page(45, 0, 20);
        assert_eq!(slice.total_pages, 3);
        assert_eq!((slice.start, slice.end), (0, 20));

        let last = page(45, 2, 20);
        assert_eq!((last.start, last.end), (40, 45));
    }

    #[test]
    fn test_out_of_range_index_clamps() {
        let slice = page(45, 5, 20);
        assert_eq!(slice.index, 2);
        assert_eq!((slice.start, slice.end), (40, 45));
    }

    #[test]
    fn test_empty_list_has_one_page() {
        let slice = page(0, 3, 20);
        assert_eq!(slice.total_pages, 1);
        assert_eq!(slice.index, 0);
        assert_eq!((slice.start, slice.end), (0, 0));
    }

    #[test]
    fn test_nav_only_for_multiple_pages() {
        assert!(nav(&page(10, 0, 20)).is_none());

        let mid = nav(&page(45, 1, 20)).expect("nav for 3 pages");
        assert!(mid.has_prev);
        assert!(mid.has_next);
        assert_eq!(mid.indicator, "2/3");

        let last = nav(&page(45, 2, 20)).expect("nav for 3 pages");
        assert!(last.has_prev);
        assert!(!last.has_next);
    }

    #[test]
    fn test_page_memory_roundtrip() {
        let store = ContextStore::new();
        assert_eq!(recall_page(&store, "u1", "portfolios"), 0);

        let slice = page(45, 1, 20);
        remember_page(&store, "u1", "portfolios", &slice);
        assert_eq!(recall_page(&store, "u1", "portfolios"), 1);

        // independent namespaces
        assert_eq!(recall_page(&store, "u1", "assets"), 0);
    }
}
