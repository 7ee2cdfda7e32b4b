//! Offset pagination for listing views: page arithmetic, navigation, and the
//! bounded page-number window rendered under the card grid.

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_MAX_VISIBLE_PAGES: usize = 5;
pub const DEFAULT_BREAKPOINT_PX: u32 = 768;
pub const DEFAULT_NARROW_PAGE_SIZE: usize = 8;
pub const DEFAULT_WIDE_PAGE_SIZE: usize = 20;

/// Layout class reported by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewport {
    Narrow,
    Wide,
}

impl Viewport {
    pub fn from_width(width_px: u32, breakpoint_px: u32) -> Self {
        if width_px >= breakpoint_px {
            Viewport::Wide
        } else {
            Viewport::Narrow
        }
    }
}

/// Page sizes per layout class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizes {
    pub narrow: usize,
    pub wide: usize,
}

impl PageSizes {
    pub fn for_viewport(&self, viewport: Viewport) -> usize {
        match viewport {
            Viewport::Narrow => self.narrow,
            Viewport::Wide => self.wide,
        }
    }
}

impl Default for PageSizes {
    fn default() -> Self {
        Self {
            narrow: DEFAULT_NARROW_PAGE_SIZE,
            wide: DEFAULT_WIDE_PAGE_SIZE,
        }
    }
}

/// Side effect requested by a navigation that moved the current page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavigationEvent {
    ScrollToTop { page: usize },
}

/// One slot of the rendered page-number widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "page", rename_all = "snake_case")]
pub enum WindowItem {
    Page(usize),
    Ellipsis,
}

/// `max(1, ceil(item_count / page_size))`. A zero page size is treated as one.
pub fn total_pages(item_count: usize, page_size: usize) -> usize {
    let page_size = page_size.max(1);
    item_count.div_ceil(page_size).max(1)
}

/// Slice of `items` shown on `page` (1-indexed), clipped to the slice bounds.
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let page_size = page_size.max(1);
    let start = page.saturating_sub(1).saturating_mul(page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size).min(items.len());
    &items[start..end]
}

/// Page numbers (and ellipsis markers) to render for `current` out of `total`.
pub fn page_window(
    current: usize,
    total: usize,
    max_visible: usize,
    viewport: Viewport,
) -> Vec<WindowItem> {
    let total = total.max(1);
    let current = current.clamp(1, total);

    if viewport == Viewport::Narrow {
        return narrow_window(current, total);
    }

    if total <= max_visible {
        return (1..=total).map(WindowItem::Page).collect();
    }

    let mut pages = vec![1, total, current.saturating_sub(1), current, current + 1];
    pages.retain(|page| (1..=total).contains(page));
    pages.sort_unstable();
    pages.dedup();

    let mut window = Vec::with_capacity(pages.len() + 2);
    let mut previous: Option<usize> = None;
    for page in pages {
        if previous.is_some_and(|prev| page > prev + 1) {
            window.push(WindowItem::Ellipsis);
        }
        window.push(WindowItem::Page(page));
        previous = Some(page);
    }
    window
}

fn narrow_window(current: usize, total: usize) -> Vec<WindowItem> {
    if total == 1 {
        return vec![WindowItem::Page(1)];
    }

    let (first, second) = if current == 1 {
        (1, 2)
    } else if current == total {
        (total - 1, total)
    } else {
        (current - 1, current)
    };
    vec![WindowItem::Page(first), WindowItem::Page(second)]
}

/// Clamped page cursor over a list of known length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    page: usize,
    page_size: usize,
    total_items: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: sanitize_page_size(page_size),
            total_items: 0,
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_items(&self) -> usize {
        self.total_items
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.total_items, self.page_size)
    }

    pub fn is_first(&self) -> bool {
        self.page == 1
    }

    pub fn is_last(&self) -> bool {
        self.page == self.total_pages()
    }

    /// Update the item count and re-clamp the current page.
    pub fn set_total_items(&mut self, total_items: usize) {
        self.total_items = total_items;
        self.clamp();
    }

    /// Update the page size and re-clamp the current page.
    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = sanitize_page_size(page_size);
        self.clamp();
    }

    /// Return to page 1 without emitting a navigation event.
    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn next(&mut self) -> Option<NavigationEvent> {
        let target = (self.page + 1).min(self.total_pages());
        self.move_to(target)
    }

    pub fn previous(&mut self) -> Option<NavigationEvent> {
        let target = self.page.saturating_sub(1).max(1);
        self.move_to(target)
    }

    pub fn first(&mut self) -> Option<NavigationEvent> {
        self.move_to(1)
    }

    pub fn last(&mut self) -> Option<NavigationEvent> {
        self.move_to(self.total_pages())
    }

    /// Jump to `page`, clamping out-of-range (including negative) requests.
    pub fn jump_to(&mut self, page: i64) -> Option<NavigationEvent> {
        let total = self.total_pages();
        let target = if page < 1 {
            1
        } else {
            usize::try_from(page).unwrap_or(usize::MAX).min(total)
        };
        self.move_to(target)
    }

    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        page_slice(items, self.page, self.page_size)
    }

    pub fn window(&self, max_visible: usize, viewport: Viewport) -> Vec<WindowItem> {
        page_window(self.page, self.total_pages(), max_visible, viewport)
    }

    fn move_to(&mut self, target: usize) -> Option<NavigationEvent> {
        if target == self.page {
            return None;
        }
        self.page = target;
        Some(NavigationEvent::ScrollToTop { page: target })
    }

    fn clamp(&mut self) {
        self.page = self.page.clamp(1, self.total_pages());
    }
}

fn sanitize_page_size(page_size: usize) -> usize {
    if page_size == 0 {
        warn!(
            target = "sithai::pagination",
            "page size of zero requested; using 1"
        );
        1
    } else {
        page_size
    }
}
