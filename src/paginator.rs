//! Fixed-size pagination arithmetic over the card list.
//!
//! Pure computation only. Whether the prefetch trigger actually kicks off
//! enrichment for the next page is an explicit opt-in in the pipeline
//! (`Config::prefetch_enabled`, off by default).

/// Cards per page as composed by the feed's server-side pagination.
pub const PAGE_SIZE: usize = 18;

/// How many positions ahead of a page boundary the prefetch trigger sits.
pub const PREFETCH_LEAD: usize = 6;

/// Page containing the given card index.
pub fn page_of(index: usize) -> usize {
    index / PAGE_SIZE
}

/// Half-open index window `[page*P, (page+1)*P)` for a page.
///
/// Windows are non-overlapping by construction.
pub fn page_bounds(page: usize) -> std::ops::Range<usize> {
    page * PAGE_SIZE..(page + 1) * PAGE_SIZE
}

/// Prefetch trigger point.
///
/// Returns the next page exactly when the first visible index sits
/// `PREFETCH_LEAD` positions short of the current page's end.
pub fn prefetch_page(first_visible: usize) -> Option<usize> {
    let page = page_of(first_visible);
    if first_visible + PREFETCH_LEAD == (page + 1) * PAGE_SIZE {
        Some(page + 1)
    } else {
        None
    }
}
