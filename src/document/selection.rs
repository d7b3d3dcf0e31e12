//! Selection state: an anchor and an active end in document order.

use crate::document::offset::TextOffset;

/// A contiguous selected range of the document.
///
/// `start` is the anchor (where a drag or shift-extension began) and `stop`
/// the active end; either may precede the other in document order. Queries
/// go through [`ordered`](Self::ordered), so callers never see an inverted
/// range.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextSelection {
    pub(crate) start: TextOffset,
    pub(crate) stop: TextOffset,
    pub(crate) selected: bool,
}

impl TextSelection {
    /// Set the selection. An empty range deselects.
    pub fn select(&mut self, start: TextOffset, stop: TextOffset) {
        self.start = start;
        self.stop = stop;
        self.selected = start != stop;
    }

    /// Clear the selection.
    pub fn select_nothing(&mut self) {
        self.selected = false;
        self.start = TextOffset::default();
        self.stop = TextOffset::default();
    }

    /// Check whether a non-empty range is selected.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// The selection endpoints in document order.
    #[must_use]
    pub fn ordered(&self) -> (TextOffset, TextOffset) {
        if self.start <= self.stop {
            (self.start, self.stop)
        } else {
            (self.stop, self.start)
        }
    }

    /// Check whether a position falls inside the selection (half-open).
    #[must_use]
    pub fn contains(&self, pos: TextOffset) -> bool {
        if !self.selected {
            return false;
        }
        let (start, stop) = self.ordered();
        start <= pos && pos < stop
    }

    /// Check whether any byte of the given block is selected.
    #[must_use]
    pub fn is_block_selected(&self, block: usize, block_len: usize) -> bool {
        self.range_in_block(block, block_len).is_some()
    }

    /// Check whether a fragment's byte span in the given block overlaps the
    /// selection.
    #[must_use]
    pub fn is_fragment_selected(
        &self,
        block: usize,
        block_len: usize,
        ofs: usize,
        end: usize,
    ) -> bool {
        self.range_in_block(block, block_len)
            .is_some_and(|(s, e)| s < end && e > ofs)
    }

    /// The selected byte range within one block, if any.
    pub(crate) fn range_in_block(&self, block: usize, block_len: usize) -> Option<(usize, usize)> {
        if !self.selected {
            return None;
        }
        let (start, stop) = self.ordered();
        if block < start.block || block > stop.block {
            return None;
        }
        let s = if block == start.block { start.ofs } else { 0 };
        let e = if block == stop.block {
            stop.ofs
        } else {
            block_len
        };
        (s < e).then_some((s, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_range_is_not_selected() {
        let mut sel = TextSelection::default();
        sel.select(TextOffset::new(1, 3), TextOffset::new(1, 3));
        assert!(!sel.is_selected());
    }

    #[test]
    fn test_inverted_range_is_ordered() {
        let mut sel = TextSelection::default();
        sel.select(TextOffset::new(2, 1), TextOffset::new(0, 4));
        let (start, stop) = sel.ordered();
        assert_eq!(start, TextOffset::new(0, 4));
        assert_eq!(stop, TextOffset::new(2, 1));
        assert!(sel.contains(TextOffset::new(1, 0)));
    }

    #[test]
    fn test_contains_is_half_open() {
        let mut sel = TextSelection::default();
        sel.select(TextOffset::new(0, 2), TextOffset::new(0, 5));
        assert!(sel.contains(TextOffset::new(0, 2)));
        assert!(sel.contains(TextOffset::new(0, 4)));
        assert!(!sel.contains(TextOffset::new(0, 5)));
    }

    #[test]
    fn test_range_in_block() {
        let mut sel = TextSelection::default();
        sel.select(TextOffset::new(0, 2), TextOffset::new(2, 3));
        assert_eq!(sel.range_in_block(0, 6), Some((2, 6)));
        assert_eq!(sel.range_in_block(1, 4), Some((0, 4)));
        assert_eq!(sel.range_in_block(2, 9), Some((0, 3)));
        assert_eq!(sel.range_in_block(3, 5), None);
        // Empty slice of the edge block.
        sel.select(TextOffset::new(0, 2), TextOffset::new(1, 0));
        assert_eq!(sel.range_in_block(1, 4), None);
    }

    #[test]
    fn test_block_and_fragment_predicates() {
        let mut sel = TextSelection::default();
        sel.select(TextOffset::new(0, 2), TextOffset::new(2, 3));
        assert!(sel.is_block_selected(1, 4));
        assert!(!sel.is_block_selected(3, 5));
        assert!(sel.is_fragment_selected(0, 6, 0, 3));
        assert!(!sel.is_fragment_selected(0, 6, 0, 2));
        assert!(sel.is_fragment_selected(2, 9, 2, 5));
        assert!(!sel.is_fragment_selected(2, 9, 3, 5));
    }
}
