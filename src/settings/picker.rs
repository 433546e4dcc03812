//! Horizontally paged persona picker

/// Each persona card takes this fraction of the viewport width
const CARD_WIDTH_RATIO: f64 = 0.75;

/// Selection and page position of the persona carousel.
///
/// Selecting a card scrolls to it; free scrolling only moves the page
/// indicator, never the selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaPicker {
    page_count: usize,
    selected: usize,
    current_page: usize,
}

impl PersonaPicker {
    pub fn new(page_count: usize, selected: usize) -> Self {
        let selected = selected.min(page_count.saturating_sub(1));
        Self {
            page_count,
            selected,
            current_page: selected,
        }
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Select the card at `index` and scroll to its page.
    ///
    /// Returns `false` and leaves the picker untouched when out of range.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.page_count {
            return false;
        }
        self.selected = index;
        self.current_page = index;
        true
    }

    /// Update the page indicator from a scroll position
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to [0, last page]
    pub fn scrolled_to(&mut self, offset: f64, viewport_width: f64) -> usize {
        let card_width = viewport_width * CARD_WIDTH_RATIO;
        if card_width <= 0.0 || self.page_count == 0 {
            return self.current_page;
        }
        let last = self.page_count - 1;
        let page = (offset / card_width).round().max(0.0) as usize;
        self.current_page = page.min(last);
        self.current_page
    }
}
