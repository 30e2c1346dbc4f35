use std::ops::Range;

pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];

/// Pages shown around the current one in the pager.
const WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(usize),
    Ellipsis,
}

/// One-based page cursor over a filtered row count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    page: usize,
    page_size: usize,
}

impl Pagination {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn total_pages(&self, rows: usize) -> usize {
        rows.div_ceil(self.page_size).max(1)
    }

    pub fn clamp(&mut self, rows: usize) {
        self.page = self.page.clamp(1, self.total_pages(rows));
    }

    pub fn first(&mut self) {
        self.page = 1;
    }

    /// Moves by `delta` pages, staying in range. Returns whether the page changed.
    pub fn step(&mut self, delta: isize, rows: usize) -> bool {
        let target = self
            .page
            .saturating_add_signed(delta)
            .clamp(1, self.total_pages(rows));
        let changed = target != self.page;
        self.page = target;
        changed
    }

    /// Switches to the next size in [`PAGE_SIZES`] and returns to page 1.
    pub fn cycle_page_size(&mut self) -> usize {
        let next = PAGE_SIZES
            .iter()
            .copied()
            .find(|size| *size > self.page_size)
            .unwrap_or(PAGE_SIZES[0]);
        self.page_size = next;
        self.page = 1;
        next
    }

    /// Row indices of the current page within a list of `rows` entries.
    pub fn range(&self, rows: usize) -> Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(rows);
        let end = (start + self.page_size).min(rows);
        start..end
    }

    /// Up to five consecutive pages around the current one, plus the first and last
    /// pages with ellipses when the window does not reach them.
    pub fn window(&self, rows: usize) -> Vec<PageItem> {
        let total = self.total_pages(rows);
        let mut start = self.page.saturating_sub(2).max(1);
        let end = (start + WINDOW - 1).min(total);
        if end == total {
            start = end.saturating_sub(WINDOW - 1).max(1);
        }

        let mut items = Vec::new();
        if start > 1 {
            items.push(PageItem::Page(1));
            if start > 2 {
                items.push(PageItem::Ellipsis);
            }
        }
        items.extend((start..=end).map(PageItem::Page));
        if end < total {
            if end < total - 1 {
                items.push(PageItem::Ellipsis);
            }
            items.push(PageItem::Page(total));
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use PageItem::{Ellipsis, Page};

    fn at(page: usize, page_size: usize) -> Pagination {
        let mut pagination = Pagination::new(page_size);
        pagination.page = page;
        pagination
    }

    #[test]
    fn empty_list_still_has_one_page() {
        let pagination = Pagination::new(25);
        assert_eq!(pagination.total_pages(0), 1);
        assert_eq!(pagination.range(0), 0..0);
        assert_eq!(pagination.window(0), vec![Page(1)]);
    }

    #[test]
    fn last_page_is_partial() {
        let pagination = at(3, 10);
        assert_eq!(pagination.total_pages(23), 3);
        assert_eq!(pagination.range(23), 20..23);
    }

    #[test]
    fn window_in_the_middle_shows_both_ends() {
        assert_eq!(
            at(10, 10).window(200),
            vec![Page(1), Ellipsis, Page(8), Page(9), Page(10), Page(11), Page(12), Ellipsis, Page(20)]
        );
    }

    #[test]
    fn window_near_the_end_slides_back() {
        assert_eq!(
            at(20, 10).window(200),
            vec![Page(1), Ellipsis, Page(16), Page(17), Page(18), Page(19), Page(20)]
        );
        assert_eq!(
            at(1, 10).window(200),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Ellipsis, Page(20)]
        );
    }

    #[test]
    fn adjacent_end_pages_skip_the_ellipsis() {
        assert_eq!(
            at(4, 10).window(70),
            vec![Page(1), Page(2), Page(3), Page(4), Page(5), Page(6), Page(7)]
        );
    }

    #[test]
    fn clamping_after_the_list_shrinks() {
        let mut pagination = at(5, 10);
        pagination.clamp(12);
        assert_eq!(pagination.page(), 2);
        assert!(!pagination.step(1, 12));
        assert!(pagination.step(-1, 12));
        assert_eq!(pagination.page(), 1);
    }

    #[test]
    fn page_size_cycles_and_resets_page() {
        let mut pagination = at(3, 25);
        assert_eq!(pagination.cycle_page_size(), 50);
        assert_eq!(pagination.page(), 1);
        pagination.cycle_page_size();
        assert_eq!(pagination.cycle_page_size(), 10);
    }
}
