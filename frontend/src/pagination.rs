//! Page-link strip for the listing templates.

use serde::Serialize;

const LEFT_EDGE: u32 = 1;
const AROUND_CURRENT: u32 = 2;
const RIGHT_EDGE: u32 = 1;

/// One entry of the strip. `None` marks a gap between ranges.
pub type PageLink = Option<u32>;

/// Builds the 1-based page links shown under a listing: the first and last
/// pages plus a window around `current`, with gaps collapsed to `None`.
pub fn page_links(total_pages: u32, current: u32) -> Vec<PageLink> {
    if total_pages == 0 {
        return vec![];
    }
    let current = current.clamp(1, total_pages);

    let left_end = (1 + LEFT_EDGE).min(total_pages + 1);
    let mut links: Vec<PageLink> = (1..left_end).map(Some).collect();

    let mid_start = left_end.max(current.saturating_sub(AROUND_CURRENT));
    let mid_end = (current + AROUND_CURRENT + 1).min(total_pages + 1);
    if mid_start > left_end {
        links.push(None);
    }
    links.extend((mid_start..mid_end).map(Some));

    let right_start = mid_end.max(total_pages.saturating_sub(RIGHT_EDGE) + 1);
    if right_start > mid_end {
        links.push(None);
    }
    links.extend((right_start..=total_pages).map(Some));

    links
}

#[derive(Debug, Clone, Serialize)]
pub struct PageNav {
    pub links: Vec<PageLink>,
    pub current: u32,
    pub total_pages: u32,
}

impl PageNav {
    pub fn new(total_pages: u32, current: u32) -> Self {
        Self {
            links: page_links(total_pages, current),
            current,
            total_pages,
        }
    }
}
