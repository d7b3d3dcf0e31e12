//! Document positions: a block index plus a byte offset within the block.

use crate::document::block::TextBlock;

/// A position in a document, addressed as (block index, byte offset).
///
/// Ordering follows document order: block index first, then byte offset.
/// The document's block list owns all structure; a `TextOffset` is only
/// meaningful against the document it was derived from, and is re-derived
/// (via global offsets) around structural splices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct TextOffset {
    /// Index of the block in the document's block list.
    pub block: usize,
    /// Byte offset within that block's text.
    pub ofs: usize,
}

impl TextOffset {
    /// Create a new offset.
    #[must_use]
    pub fn new(block: usize, ofs: usize) -> Self {
        Self { block, ofs }
    }

    /// Convert to a global byte offset from the document start.
    ///
    /// O(blocks); used for undo and selection bookkeeping, never during
    /// layout.
    #[must_use]
    pub(crate) fn to_global(self, blocks: &[TextBlock]) -> usize {
        debug_assert!(self.block < blocks.len(), "offset references missing block");
        let mut gofs = 0;
        for block in blocks.iter().take(self.block) {
            gofs += block.len();
        }
        let ofs = blocks
            .get(self.block)
            .map_or(0, |b| self.ofs.min(b.len()));
        gofs + ofs
    }

    /// Resolve a global byte offset to a block-relative position.
    ///
    /// A position exactly at a block boundary resolves to the start of the
    /// following block. Requesting an offset beyond the document length is
    /// a contract violation: debug builds assert, release builds clamp to
    /// the document end.
    #[must_use]
    pub(crate) fn from_global(blocks: &[TextBlock], gofs: usize) -> Self {
        let mut remaining = gofs;
        for (i, block) in blocks.iter().enumerate() {
            if remaining < block.len() || i + 1 == blocks.len() {
                debug_assert!(
                    remaining <= block.len(),
                    "global offset {gofs} beyond document length"
                );
                return Self::new(i, remaining.min(block.len()));
            }
            remaining -= block.len();
        }
        Self::default()
    }
}
