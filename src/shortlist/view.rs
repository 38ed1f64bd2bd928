use crate::card::{Card, Color};
use crate::filters::{filter_cards, CardFilter, ManaValueBucket, SortOrder};

/// One page of a list
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    /// Index actually shown, after clamping
    pub page_index: usize,
    pub total_pages: usize,
}

impl<T> Page<'_, T> {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Clamp `page_index` into `[0, total_pages - 1]`, or 0 when there are no pages
pub fn clamp_page_index(page_index: usize, total_pages: usize) -> usize {
    page_index.min(total_pages.saturating_sub(1))
}

/// Slice out page `page_index` of `list`.
///
/// An index past the last page is clamped to the last page.
pub fn paginate<T>(list: &[T], page_index: usize, page_size: usize) -> Page<'_, T> {
    let total_pages = total_pages(list.len(), page_size);
    let page_index = clamp_page_index(page_index, total_pages);
    let start = (page_index * page_size).min(list.len());
    let end = (start + page_size).min(list.len());

    Page {
        items: &list[start..end],
        page_index,
        total_pages,
    }
}

/// Browsing state for the shortlist screen
#[derive(Debug, Clone, PartialEq)]
pub struct ShortlistView {
    filter: CardFilter,
    sort: SortOrder,
    page_index: usize,
    page_size: usize,
}

impl ShortlistView {
    pub const DEFAULT_PAGE_SIZE: usize = 8;

    pub fn new(page_size: usize) -> Self {
        Self {
            filter: CardFilter::default(),
            sort: SortOrder::default(),
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn filter(&self) -> &CardFilter {
        &self.filter
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_filter(&mut self, filter: CardFilter) {
        self.filter = filter;
        self.page_index = 0;
    }

    pub fn toggle_color(&mut self, color: Color) {
        self.filter.toggle_color(color);
        self.page_index = 0;
    }

    pub fn set_mana_value(&mut self, bucket: Option<ManaValueBucket>) {
        self.filter.set_mana_value(bucket);
        self.page_index = 0;
    }

    pub fn clear_filter(&mut self) {
        self.filter.clear();
        self.page_index = 0;
    }

    pub fn set_sort(&mut self, sort: SortOrder) {
        self.sort = sort;
        self.page_index = 0;
    }

    pub fn set_page(&mut self, page_index: usize) {
        self.page_index = page_index;
    }

    pub fn next_page(&mut self) {
        self.page_index += 1;
    }

    pub fn previous_page(&mut self) {
        self.page_index = self.page_index.saturating_sub(1);
    }

    /// Filter, sort and paginate `cards`.
    ///
    /// If the filtered list no longer reaches the current page (a card was
    /// removed, say), the stored index is clamped before slicing.
    pub fn page<'a>(&mut self, cards: &'a [Card]) -> (Vec<&'a Card>, usize) {
        let filtered = filter_cards(cards, &self.filter, self.sort);
        let total_pages = total_pages(filtered.len(), self.page_size);
        self.page_index = clamp_page_index(self.page_index, total_pages);

        let page = paginate(&filtered, self.page_index, self.page_size);
        (page.items.to_vec(), page.total_pages)
    }
}

impl Default for ShortlistView {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PAGE_SIZE)
    }
}
