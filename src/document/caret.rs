//! Caret state and word-boundary movement.

use crate::document::fragment::is_word_break_char;
use crate::document::offset::TextOffset;
use crate::geometry::Rect;
use crate::utf8;
use unicode_segmentation::UnicodeSegmentation;

/// Default caret thickness in pixels.
const CARET_WIDTH: i32 = 2;

/// The insertion point.
///
/// Geometry fields are a cache derived from the document layout; they are
/// refreshed after every edit, reflow, and caret move. `wanted_x` remembers
/// the horizontal position vertical navigation aims for, so moving through
/// a short line does not lose the column.
#[derive(Clone, Copy, Debug)]
pub struct Caret {
    pub(crate) pos: TextOffset,
    /// At a wrap boundary, stick to the end of the earlier visual line
    /// instead of the start of the later one.
    pub(crate) prefer_first: bool,
    pub(crate) wanted_x: i32,
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: i32,
    pub(crate) height: i32,
    /// Blink phase; the caret paints only while on.
    pub(crate) on: bool,
}

impl Default for Caret {
    fn default() -> Self {
        Self {
            pos: TextOffset::default(),
            prefer_first: false,
            wanted_x: 0,
            x: 0,
            y: 0,
            width: CARET_WIDTH,
            height: 0,
            on: false,
        }
    }
}

impl Caret {
    /// Current position.
    #[must_use]
    pub fn pos(&self) -> TextOffset {
        self.pos
    }

    /// Caret rectangle in document coordinates.
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    /// Whether the caret is in the visible blink phase.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.on
    }
}

/// Nearest word boundary from `ofs` in the given direction.
///
/// Valid UTF-8 uses Unicode word segmentation; text with malformed bytes
/// falls back to a character-class scan so movement still terminates.
pub(crate) fn word_boundary(text: &[u8], ofs: usize, forward: bool) -> usize {
    if let Ok(s) = std::str::from_utf8(text) {
        if forward {
            for (i, _) in s.split_word_bound_indices() {
                if i > ofs {
                    return i;
                }
            }
            return text.len();
        }
        let mut prev = 0;
        for (i, _) in s.split_word_bound_indices() {
            if i >= ofs {
                break;
            }
            prev = i;
        }
        return prev;
    }
    byte_class_boundary(text, ofs, forward)
}

fn byte_class(text: &[u8], ofs: usize) -> bool {
    let mut i = ofs;
    is_word_break_char(utf8::decode(text, &mut i))
}

fn byte_class_boundary(text: &[u8], ofs: usize, forward: bool) -> usize {
    if forward {
        if ofs >= text.len() {
            return text.len();
        }
        let class = byte_class(text, ofs);
        let mut i = ofs;
        utf8::move_inc(text, &mut i);
        while i < text.len() && byte_class(text, i) == class {
            utf8::move_inc(text, &mut i);
        }
        i
    } else {
        if ofs == 0 {
            return 0;
        }
        let mut i = ofs;
        utf8::move_dec(text, &mut i);
        let class = byte_class(text, i);
        while i > 0 {
            let mut prev = i;
            utf8::move_dec(text, &mut prev);
            if byte_class(text, prev) != class {
                break;
            }
            i = prev;
        }
        i
    }
}
