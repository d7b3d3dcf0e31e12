//! The editable document: block storage, caret, selection, history, and
//! every editing operation that ties them together.
//!
//! A [`TextDocument`] always holds at least one block. Blocks tile the
//! document's byte string; every block except the last ends with a line
//! break, and the break belongs to the block it terminates. Edits splice
//! bytes, re-establish the block structure (split on inserted breaks, merge
//! when a trailing break is removed), then reflow only the touched blocks
//! and restack the rest.

mod block;
mod caret;
mod fragment;
mod offset;
mod selection;
mod undo;

pub use block::TextBlock;
pub use caret::Caret;
pub use fragment::TextFragment;
pub use offset::TextOffset;
pub use selection::TextSelection;
pub use undo::{UndoEvent, UndoStack};

use self::caret::word_boundary;
use self::fragment::PASSWORD_GLYPH;
use crate::color::Rgba;
use crate::content::{ContentFactory, FragmentContent, NoContent, StyledContentFactory};
use crate::geometry::{Point, Rect};
use crate::host::{Clipboard, DocumentHost, MemClipboard, NullHost};
use crate::input::{Key, Modifiers, MouseButton};
use crate::metrics::{FontDescription, FontMetrics};
use crate::utf8;

/// Horizontal alignment of laid-out lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    /// Align to the left edge.
    #[default]
    Left,
    /// Center within the layout width.
    Center,
    /// Align to the right edge.
    Right,
}

/// Byte sequence written for inserted line breaks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BreakStyle {
    /// `\r\n`.
    #[default]
    CrLf,
    /// `\n`.
    Lf,
}

impl BreakStyle {
    /// The break bytes.
    #[must_use]
    pub fn bytes(self) -> &'static [u8] {
        match self {
            Self::CrLf => b"\r\n",
            Self::Lf => b"\n",
        }
    }
}

/// Everything block layout needs from the document, borrowed field-wise so
/// individual blocks can be laid out mutably at the same time.
pub(crate) struct LayoutEnv<'a> {
    pub metrics: &'a dyn FontMetrics,
    pub factory: &'a dyn ContentFactory,
    pub width: i32,
    pub wrapping: bool,
    pub password: bool,
    pub align: TextAlign,
}

#[derive(Clone, Copy)]
struct PaintStyle {
    color: Rgba,
    underline: bool,
}

/// A retained-mode editable text document.
///
/// The document owns its text, layout, caret, selection, and edit history.
/// Measurement, painting, and notifications go through the collaborator
/// interfaces ([`FontMetrics`], [`DocumentHost`], [`Clipboard`],
/// [`ContentFactory`]); the document itself never touches a font file or a
/// screen.
pub struct TextDocument {
    blocks: Vec<TextBlock>,
    caret: Caret,
    selection: TextSelection,
    history: UndoStack,
    metrics: Box<dyn FontMetrics>,
    factory: Box<dyn ContentFactory>,
    host: Box<dyn DocumentHost>,
    clipboard: Box<dyn Clipboard>,
    font: FontDescription,
    text_color: Rgba,
    align: TextAlign,
    break_style: BreakStyle,
    multiline: bool,
    read_only: bool,
    password: bool,
    wrapping: bool,
    has_focus: bool,
    selecting: bool,
    layout_width: i32,
    layout_height: i32,
    scroll_x: i32,
    scroll_y: i32,
    content_height: i32,
    content_width: i32,
    content_width_block: usize,
    content_width_dirty: bool,
}

impl TextDocument {
    /// Create an empty single-line document measured with `metrics`.
    #[must_use]
    pub fn new(metrics: Box<dyn FontMetrics>) -> Self {
        let mut doc = Self {
            blocks: vec![TextBlock::new(Vec::new())],
            caret: Caret::default(),
            selection: TextSelection::default(),
            history: UndoStack::default(),
            metrics,
            factory: Box::new(NoContent),
            host: Box::new(NullHost),
            clipboard: Box::new(MemClipboard::default()),
            font: FontDescription::default(),
            text_color: Rgba::BLACK,
            align: TextAlign::Left,
            break_style: BreakStyle::default(),
            multiline: false,
            read_only: false,
            password: false,
            wrapping: true,
            has_focus: false,
            selecting: false,
            layout_width: 0,
            layout_height: 0,
            scroll_x: 0,
            scroll_y: 0,
            content_height: 0,
            content_width: 0,
            content_width_block: 0,
            content_width_dirty: false,
        };
        doc.relayout(0, 0);
        doc
    }

    fn env(&self) -> LayoutEnv<'_> {
        LayoutEnv {
            metrics: self.metrics.as_ref(),
            factory: self.factory.as_ref(),
            width: self.layout_width,
            wrapping: self.wrapping && self.multiline,
            password: self.password,
            align: self.align,
        }
    }

    // ----- configuration ---------------------------------------------------

    /// Set the host receiving paint calls and change notifications.
    pub fn set_host(&mut self, host: Box<dyn DocumentHost>) {
        self.host = host;
    }

    /// Set the clipboard used by cut/copy/paste.
    pub fn set_clipboard(&mut self, clipboard: Box<dyn Clipboard>) {
        self.clipboard = clipboard;
    }

    /// Replace the font metrics and reflow.
    pub fn set_metrics(&mut self, metrics: Box<dyn FontMetrics>) {
        self.metrics = metrics;
        self.reformat(false);
    }

    /// Set the font description handed back to the host when drawing.
    pub fn set_font(&mut self, font: FontDescription) {
        self.font = font;
    }

    /// The font description used for drawing.
    #[must_use]
    pub fn font(&self) -> &FontDescription {
        &self.font
    }

    /// Set the base text color.
    pub fn set_text_color(&mut self, color: Rgba) {
        self.text_color = color;
    }

    /// Allow or disallow line breaks in the document.
    pub fn set_multiline(&mut self, multiline: bool) {
        if self.multiline != multiline {
            self.multiline = multiline;
            self.reformat(false);
        }
    }

    /// Check whether the document accepts line breaks.
    #[must_use]
    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    /// Block editing operations while keeping navigation and selection.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// Check whether editing is blocked.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Mask the text with placeholder glyphs and refuse copying.
    pub fn set_password(&mut self, password: bool) {
        if self.password != password {
            self.password = password;
            self.reformat(false);
        }
    }

    /// Enable or disable line wrapping (multiline documents only).
    pub fn set_wrapping(&mut self, wrapping: bool) {
        if self.wrapping != wrapping {
            self.wrapping = wrapping;
            self.reformat(false);
        }
    }

    /// Set the document-wide alignment.
    pub fn set_align(&mut self, align: TextAlign) {
        if self.align != align {
            self.align = align;
            self.reformat(false);
        }
    }

    /// Override the alignment of one block, or clear the override.
    pub fn set_block_align(&mut self, index: usize, align: Option<TextAlign>) {
        if index < self.blocks.len() && self.blocks[index].align != align {
            self.blocks[index].align = align;
            self.relayout(index, index);
            self.invalidate_view();
        }
    }

    /// Set the byte sequence written for inserted breaks.
    pub fn set_break_style(&mut self, style: BreakStyle) {
        self.break_style = style;
    }

    /// The break style for inserted breaks.
    #[must_use]
    pub fn break_style(&self) -> BreakStyle {
        self.break_style
    }

    /// Turn inline style tags on or off with the default factory.
    pub fn set_styled(&mut self, styled: bool) {
        self.factory = if styled {
            Box::new(StyledContentFactory)
        } else {
            Box::new(NoContent)
        };
        self.reformat(true);
    }

    /// Install a custom content factory and rescan all text.
    pub fn set_content_factory(&mut self, factory: Box<dyn ContentFactory>) {
        self.factory = factory;
        self.reformat(true);
    }

    /// Set the viewport size. A width change reflows the document.
    pub fn set_layout_size(&mut self, width: i32, height: i32) {
        if width == self.layout_width && height == self.layout_height {
            return;
        }
        let reflow = width != self.layout_width;
        self.layout_width = width;
        self.layout_height = height;
        if reflow {
            self.reformat(false);
        }
    }

    // ----- text access -----------------------------------------------------

    /// Replace the whole document. Clears selection, history, and scroll;
    /// the caret moves to the start.
    pub fn set_text_bytes(&mut self, bytes: &[u8]) {
        self.blocks.clear();
        self.blocks.push(TextBlock::new(Vec::new()));
        self.selection.select_nothing();
        self.history.clear();
        self.content_width = 0;
        self.content_width_block = 0;
        self.content_width_dirty = false;
        self.scroll_x = 0;
        self.scroll_y = 0;
        if bytes.is_empty() {
            self.relayout(0, 0);
        } else {
            self.insert_at(TextOffset::default(), bytes, false);
        }
        self.place_caret(TextOffset::default(), false);
        self.caret.wanted_x = 0;
        self.invalidate_view();
    }

    /// Replace the whole document with a string.
    pub fn set_text(&mut self, text: &str) {
        self.set_text_bytes(text.as_bytes());
    }

    /// The document's bytes, exactly as stored.
    #[must_use]
    pub fn text_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len());
        for block in &self.blocks {
            out.extend_from_slice(block.bytes());
        }
        out
    }

    /// The document text. Malformed bytes are replaced, not dropped.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.text_bytes()).into_owned()
    }

    /// Total byte length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.iter().map(TextBlock::len).sum()
    }

    /// Check whether the document holds no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.len() == 1 && self.blocks[0].is_empty()
    }

    /// Number of blocks. Always at least one.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// The blocks, in document order.
    #[must_use]
    pub fn blocks(&self) -> &[TextBlock] {
        &self.blocks
    }

    /// The caret state.
    #[must_use]
    pub fn caret(&self) -> &Caret {
        &self.caret
    }

    /// The selection state.
    #[must_use]
    pub fn selection(&self) -> &TextSelection {
        &self.selection
    }

    /// The edit history.
    #[must_use]
    pub fn history(&self) -> &UndoStack {
        &self.history
    }

    /// Total laid-out height in pixels.
    #[must_use]
    pub fn content_height(&self) -> i32 {
        self.content_height
    }

    /// Widest laid-out line in pixels. Rescans lazily after the widest
    /// block shrank.
    pub fn content_width(&mut self) -> i32 {
        if self.content_width_dirty {
            self.content_width = 0;
            self.content_width_block = 0;
            for (i, block) in self.blocks.iter().enumerate() {
                if block.line_width_max > self.content_width {
                    self.content_width = block.line_width_max;
                    self.content_width_block = i;
                }
            }
            self.content_width_dirty = false;
        }
        self.content_width
    }

    /// Caret position as a global byte offset.
    #[must_use]
    pub fn caret_global_ofs(&self) -> usize {
        self.caret.pos.to_global(&self.blocks)
    }

    /// Move the caret to a global byte offset.
    pub fn set_caret_global_ofs(&mut self, gofs: usize) {
        self.place_caret_global(gofs, false);
        self.caret.wanted_x = self.caret.x;
    }

    // ----- editing ---------------------------------------------------------

    /// Insert bytes at the caret, replacing any selection.
    pub fn insert_bytes(&mut self, bytes: &[u8]) {
        if self.read_only || bytes.is_empty() {
            return;
        }
        if self.selection.is_selected() {
            self.remove_selection();
        }
        let end = self.insert_at(self.caret.pos, bytes, true);
        self.place_caret(end, false);
        self.caret.wanted_x = self.caret.x;
        self.reset_blink();
        self.scroll_to_caret();
        self.invalidate_view();
    }

    /// Insert a string at the caret, replacing any selection.
    pub fn insert_text(&mut self, text: &str) {
        self.insert_bytes(text.as_bytes());
    }

    /// Insert a line break at the caret.
    ///
    /// At the very end of a document whose final block has no trailing
    /// break, the break is doubled so an empty last line exists to receive
    /// further typing; the caret lands between the two breaks.
    ///
    /// Returns `false` when the document is single-line or read-only.
    pub fn insert_break(&mut self) -> bool {
        if !self.multiline || self.read_only {
            return false;
        }
        if self.host.on_enter() {
            return true;
        }
        if self.selection.is_selected() {
            self.remove_selection();
        }
        let brk = self.break_style.bytes();
        let pos = self.caret.pos;
        let last = &self.blocks[pos.block];
        let at_end = pos.block + 1 == self.blocks.len() && pos.ofs == last.len();
        let doubled = at_end && !last.ends_with_break();
        let gofs = pos.to_global(&self.blocks);
        let mut bytes = brk.to_vec();
        if doubled {
            bytes.extend_from_slice(brk);
        }
        self.insert_at(pos, &bytes, true);
        self.place_caret_global(gofs + brk.len(), false);
        self.caret.wanted_x = self.caret.x;
        self.reset_blink();
        self.host.on_break();
        self.scroll_to_caret();
        self.invalidate_view();
        true
    }

    /// Delete the selection, or the character before the caret.
    pub fn delete_backward(&mut self) {
        if self.read_only {
            return;
        }
        if self.selection.is_selected() {
            self.remove_selection();
            return;
        }
        let pos = self.caret.pos;
        let start = if pos.ofs > 0 {
            let text = self.blocks[pos.block].bytes();
            let mut ofs = pos.ofs;
            utf8::move_dec(text, &mut ofs);
            if ofs > 0 && text[ofs] == b'\n' && text[ofs - 1] == b'\r' {
                ofs -= 1;
            }
            TextOffset::new(pos.block, ofs)
        } else if pos.block > 0 {
            let text = self.blocks[pos.block - 1].bytes();
            let brk = if text.ends_with(b"\r\n") { 2 } else { 1 };
            TextOffset::new(pos.block - 1, text.len() - brk)
        } else {
            return;
        };
        let gofs = start.to_global(&self.blocks);
        self.remove_range(start, pos, true);
        self.finish_edit(gofs);
    }

    /// Delete the selection, or the character after the caret.
    pub fn delete_forward(&mut self) {
        if self.read_only {
            return;
        }
        if self.selection.is_selected() {
            self.remove_selection();
            return;
        }
        let pos = self.caret.pos;
        if pos.ofs >= self.blocks[pos.block].len() {
            return;
        }
        let stop = {
            let text = self.blocks[pos.block].bytes();
            let mut ofs = pos.ofs;
            if text[ofs] == b'\r' && text.get(ofs + 1) == Some(&b'\n') {
                ofs += 2;
            } else {
                utf8::move_inc(text, &mut ofs);
            }
            TextOffset::new(pos.block, ofs)
        };
        let gofs = pos.to_global(&self.blocks);
        self.remove_range(pos, stop, true);
        self.finish_edit(gofs);
    }

    /// Delete the selected range. Returns `false` with no selection.
    pub fn remove_selection(&mut self) -> bool {
        if !self.selection.is_selected() || self.read_only {
            return false;
        }
        let (start, stop) = self.selection.ordered();
        let gofs = start.to_global(&self.blocks);
        self.selection.select_nothing();
        self.remove_range(start, stop, true);
        self.finish_edit(gofs);
        true
    }

    fn finish_edit(&mut self, caret_gofs: usize) {
        self.place_caret_global(caret_gofs, false);
        self.caret.wanted_x = self.caret.x;
        self.reset_blink();
        self.scroll_to_caret();
        self.invalidate_view();
    }

    /// Splice bytes in at `pos`, split out any new blocks, and reflow.
    /// Returns the position just past the inserted bytes.
    fn insert_at(&mut self, pos: TextOffset, bytes: &[u8], record: bool) -> TextOffset {
        if bytes.is_empty() {
            return pos;
        }
        let gofs = pos.to_global(&self.blocks);
        if record {
            self.history.commit(gofs, bytes.to_vec(), true);
        }
        self.blocks[pos.block].insert_bytes(pos.ofs, bytes);
        let mut last = pos.block;
        while let Some(cut) = self.blocks[last].needs_split() {
            let len = self.blocks[last].len();
            let rest = self.blocks[last].remove_bytes(cut, len);
            self.blocks.insert(last + 1, TextBlock::new(rest));
            last += 1;
        }
        self.relayout(pos.block, last);
        self.host.on_change();
        TextOffset::from_global(&self.blocks, gofs + bytes.len())
    }

    /// Remove `[start, stop)`, re-merge the seam, and reflow. Returns the
    /// removed bytes in document order.
    fn remove_range(&mut self, start: TextOffset, stop: TextOffset, record: bool) -> Vec<u8> {
        debug_assert!(start <= stop, "inverted removal range");
        if start == stop {
            return Vec::new();
        }
        let gofs = start.to_global(&self.blocks);
        let first = start.block;
        let mut removed;
        if first == stop.block {
            removed = self.blocks[first].remove_bytes(start.ofs, stop.ofs);
        } else {
            let first_len = self.blocks[first].len();
            removed = self.blocks[first].remove_bytes(start.ofs, first_len);
            let tail = self.blocks[stop.block].remove_bytes(0, stop.ofs);
            for block in self.blocks.drain(first + 1..stop.block) {
                removed.extend_from_slice(&block.text);
            }
            removed.extend_from_slice(&tail);
            self.content_width_dirty = true;
        }
        // The seam block lost its break; absorb the block after it.
        if !self.blocks[first].ends_with_break() && first + 1 < self.blocks.len() {
            let next = self.blocks.remove(first + 1);
            self.blocks[first].text.extend_from_slice(&next.text);
            self.content_width_dirty = true;
        }
        if record {
            self.history.commit(gofs, removed.clone(), false);
        }
        self.relayout(first, first);
        self.host.on_change();
        removed
    }

    // ----- layout ----------------------------------------------------------

    /// Reflow blocks `first..=last` with fresh fragments, then restack every
    /// following block.
    fn relayout(&mut self, first: usize, last: usize) {
        let env = LayoutEnv {
            metrics: self.metrics.as_ref(),
            factory: self.factory.as_ref(),
            width: self.layout_width,
            wrapping: self.wrapping && self.multiline,
            password: self.password,
            align: self.align,
        };
        let last = last.min(self.blocks.len() - 1);
        for block in &mut self.blocks[first..=last] {
            block.layout(&env, true);
        }
        self.restack(first);
        self.update_content_width(first, last);
        self.host.update_scrollbars();
    }

    /// Reflow the whole document. `update_fragments` rescans the text (after
    /// a content factory change); plain geometry changes skip the rescan.
    pub fn reformat(&mut self, update_fragments: bool) {
        let env = LayoutEnv {
            metrics: self.metrics.as_ref(),
            factory: self.factory.as_ref(),
            width: self.layout_width,
            wrapping: self.wrapping && self.multiline,
            password: self.password,
            align: self.align,
        };
        for block in &mut self.blocks {
            block.layout(&env, update_fragments);
        }
        self.restack(0);
        self.content_width_dirty = true;
        self.update_caret_geometry();
        self.host.update_scrollbars();
        self.invalidate_view();
    }

    fn restack(&mut self, from: usize) {
        let mut y = if from == 0 {
            0
        } else {
            let prev = &self.blocks[from - 1];
            prev.ypos + prev.height
        };
        for block in &mut self.blocks[from..] {
            block.ypos = y;
            y += block.height;
        }
        self.content_height = self.blocks.last().map_or(0, |b| b.ypos + b.height);
    }

    /// Fold the new widths of changed blocks into the content-width cache.
    /// Growth updates in place; shrinking the widest block schedules a full
    /// rescan.
    fn update_content_width(&mut self, first: usize, last: usize) {
        let last = last.min(self.blocks.len() - 1);
        for i in first..=last {
            let w = self.blocks[i].line_width_max;
            if w >= self.content_width {
                self.content_width = w;
                self.content_width_block = i;
                self.content_width_dirty = false;
            } else if i == self.content_width_block {
                self.content_width_dirty = true;
            }
        }
    }

    // ----- caret -----------------------------------------------------------

    fn clamp_offset(&self, pos: TextOffset) -> TextOffset {
        let block = pos.block.min(self.blocks.len() - 1);
        TextOffset::new(block, pos.ofs.min(self.blocks[block].len()))
    }

    /// Keep the caret off positions inside a `\r\n` pair and off the far
    /// side of a non-final trailing break.
    fn snap_off_break(&self, pos: TextOffset) -> TextOffset {
        let block = &self.blocks[pos.block];
        let text = block.bytes();
        let mut ofs = pos.ofs;
        if ofs > 0 && ofs < text.len() && text[ofs] == b'\n' && text[ofs - 1] == b'\r' {
            ofs -= 1;
        }
        if ofs >= text.len() && block.ends_with_break() && pos.block + 1 < self.blocks.len() {
            return TextOffset::new(pos.block + 1, 0);
        }
        TextOffset::new(pos.block, ofs)
    }

    fn place_caret(&mut self, pos: TextOffset, prefer_first: bool) {
        let pos = self.snap_off_break(self.clamp_offset(pos));
        self.caret.pos = pos;
        self.caret.prefer_first = prefer_first;
        self.update_caret_geometry();
    }

    fn place_caret_global(&mut self, gofs: usize, prefer_first: bool) {
        let pos = TextOffset::from_global(&self.blocks, gofs.min(self.len()));
        self.place_caret(pos, prefer_first);
    }

    fn update_caret_geometry(&mut self) {
        let pos = self.caret.pos;
        let prefer_first = self.caret.prefer_first;
        let (x, y, h) = {
            let env = self.env();
            let block = &self.blocks[pos.block];
            if pos.ofs >= block.len() && block.ends_with_break() {
                // After the final break: the caret sits on the virtual empty
                // line below the block.
                (0, block.ypos + block.height, env.metrics.height())
            } else {
                let (x, line_y, line_h) = block.caret_geometry(&env, pos.ofs, prefer_first);
                (x, block.ypos + line_y, line_h)
            }
        };
        self.caret.x = x;
        self.caret.y = y;
        self.caret.height = h;
    }

    fn reset_blink(&mut self) {
        if self.has_focus {
            self.caret.on = true;
            self.host.caret_blink_start();
        }
    }

    /// Resolve a point in view coordinates to a document position.
    #[must_use]
    pub fn offset_at(&self, p: Point) -> TextOffset {
        self.offset_at_doc_point(Point::new(p.x + self.scroll_x, p.y + self.scroll_y))
            .0
    }

    /// Hit-test a document-space point. The flag reports whether the
    /// position is the end of a wrapped line (caret sticks to that line).
    fn offset_at_doc_point(&self, p: Point) -> (TextOffset, bool) {
        let y = p.y.clamp(0, (self.content_height - 1).max(0));
        let mut bi = self.blocks.len() - 1;
        for (i, block) in self.blocks.iter().enumerate() {
            if y < block.ypos + block.height {
                bi = i;
                break;
            }
        }
        let env = self.env();
        let block = &self.blocks[bi];
        let local_y = y - block.ypos;
        let ofs = block.hit_test(&env, p.x, local_y);
        let prefer_first = {
            let a = block.fragment_index_at_ofs(ofs, true);
            let b = block.fragment_index_at_ofs(ofs, false);
            a != b && {
                let fa = &block.fragments()[a];
                let fb = &block.fragments()[b];
                fa.line_ypos != fb.line_ypos && local_y < fb.line_ypos
            }
        };
        (TextOffset::new(bi, ofs), prefer_first)
    }

    // ----- navigation ------------------------------------------------------

    fn begin_move(&self, shift: bool) -> TextOffset {
        if shift && self.selection.is_selected() {
            self.selection.start
        } else {
            self.caret.pos
        }
    }

    fn finish_move(&mut self, shift: bool, anchor: TextOffset) {
        if shift {
            self.selection.select(anchor, self.caret.pos);
        } else {
            self.selection.select_nothing();
        }
        self.reset_blink();
        self.scroll_to_caret();
        self.invalidate_view();
    }

    fn next_offset(&self, pos: TextOffset, word: bool) -> TextOffset {
        let text = self.blocks[pos.block].bytes();
        if pos.ofs >= text.len() {
            return pos;
        }
        if word {
            return TextOffset::new(pos.block, word_boundary(text, pos.ofs, true));
        }
        if matches!(text[pos.ofs], b'\r' | b'\n') {
            // Stepping onto the trailing break crosses it entirely.
            return TextOffset::new(pos.block, text.len());
        }
        let mut ofs = pos.ofs;
        utf8::move_inc(text, &mut ofs);
        TextOffset::new(pos.block, ofs)
    }

    fn prev_offset(&self, pos: TextOffset, word: bool) -> TextOffset {
        if pos.ofs == 0 {
            if pos.block == 0 {
                return pos;
            }
            let text = self.blocks[pos.block - 1].bytes();
            let brk = if text.ends_with(b"\r\n") { 2 } else { 1 };
            return TextOffset::new(pos.block - 1, text.len() - brk);
        }
        let text = self.blocks[pos.block].bytes();
        if word {
            return TextOffset::new(pos.block, word_boundary(text, pos.ofs, false));
        }
        let mut ofs = pos.ofs;
        utf8::move_dec(text, &mut ofs);
        if ofs > 0 && text[ofs] == b'\n' && text[ofs - 1] == b'\r' {
            ofs -= 1;
        }
        TextOffset::new(pos.block, ofs)
    }

    fn move_caret_horizontal(&mut self, forward: bool, word: bool, shift: bool) {
        let anchor = self.begin_move(shift);
        if !shift && self.selection.is_selected() {
            // Plain arrow with a selection collapses to its edge.
            let (start, stop) = self.selection.ordered();
            self.place_caret(if forward { stop } else { start }, false);
        } else {
            let pos = self.caret.pos;
            let target = if forward {
                self.next_offset(pos, word)
            } else {
                self.prev_offset(pos, word)
            };
            self.place_caret(target, false);
        }
        self.caret.wanted_x = self.caret.x;
        self.finish_move(shift, anchor);
    }

    fn move_caret_vertical(&mut self, down: bool, shift: bool) {
        let anchor = self.begin_move(shift);
        let x = self.caret.wanted_x;
        let target_y = if down {
            self.caret.y + self.caret.height
        } else {
            self.caret.y - 1
        };
        if target_y < 0 {
            self.place_caret(TextOffset::default(), false);
        } else if target_y >= self.content_height {
            let last = self.blocks.len() - 1;
            self.place_caret(TextOffset::new(last, self.blocks[last].len()), false);
        } else {
            let (pos, prefer) = self.offset_at_doc_point(Point::new(x, target_y));
            self.place_caret(pos, prefer);
        }
        self.finish_move(shift, anchor);
    }

    fn move_caret_line_edge(&mut self, home: bool, document: bool, shift: bool) {
        let anchor = self.begin_move(shift);
        if document {
            if home {
                self.place_caret(TextOffset::default(), false);
            } else {
                let last = self.blocks.len() - 1;
                self.place_caret(TextOffset::new(last, self.blocks[last].len()), false);
            }
        } else {
            let pos = self.caret.pos;
            let (target, prefer) = {
                let block = &self.blocks[pos.block];
                let (start, end) = block.line_range_at_ofs(pos.ofs, self.caret.prefer_first);
                if home {
                    (TextOffset::new(pos.block, start), false)
                } else {
                    // The end of a wrapped line shares its offset with the
                    // next line's start; stick to the earlier line.
                    let wrap_end =
                        end < block.len() && !matches!(block.bytes()[end], b'\r' | b'\n');
                    (TextOffset::new(pos.block, end), wrap_end)
                }
            };
            self.place_caret(target, prefer);
        }
        self.caret.wanted_x = self.caret.x;
        self.finish_move(shift, anchor);
    }

    fn move_caret_page(&mut self, down: bool, shift: bool) {
        let anchor = self.begin_move(shift);
        let page = self.layout_height.max(self.caret.height);
        let x = self.caret.wanted_x;
        let target_y = self.caret.y + if down { page } else { -page };
        let (pos, prefer) = self.offset_at_doc_point(Point::new(x, target_y));
        self.place_caret(pos, prefer);
        self.finish_move(shift, anchor);
    }

    // ----- selection -------------------------------------------------------

    /// Select the whole document.
    pub fn select_all(&mut self) {
        let last = self.blocks.len() - 1;
        let stop = TextOffset::new(last, self.blocks[last].len());
        self.selection.select(TextOffset::default(), stop);
        self.invalidate_view();
    }

    /// Select a range. Endpoints may arrive in either order.
    pub fn select(&mut self, start: TextOffset, stop: TextOffset) {
        let start = self.clamp_offset(start);
        let stop = self.clamp_offset(stop);
        self.selection.select(start, stop);
        self.invalidate_view();
    }

    /// Select a range given as global byte offsets.
    pub fn select_global(&mut self, start: usize, stop: usize) {
        let start = TextOffset::from_global(&self.blocks, start.min(self.len()));
        let stop = TextOffset::from_global(&self.blocks, stop.min(self.len()));
        self.selection.select(start, stop);
        self.invalidate_view();
    }

    /// Clear the selection.
    pub fn select_nothing(&mut self) {
        self.selection.select_nothing();
        self.invalidate_view();
    }

    /// The selected bytes, exactly as stored.
    #[must_use]
    pub fn selection_text_bytes(&self) -> Vec<u8> {
        if !self.selection.is_selected() {
            return Vec::new();
        }
        let (start, stop) = self.selection.ordered();
        if start.block == stop.block {
            return self.blocks[start.block].bytes()[start.ofs..stop.ofs].to_vec();
        }
        let mut out = self.blocks[start.block].bytes()[start.ofs..].to_vec();
        for block in &self.blocks[start.block + 1..stop.block] {
            out.extend_from_slice(block.bytes());
        }
        out.extend_from_slice(&self.blocks[stop.block].bytes()[..stop.ofs]);
        out
    }

    /// The selected text, with malformed bytes replaced.
    #[must_use]
    pub fn selection_text(&self) -> String {
        String::from_utf8_lossy(&self.selection_text_bytes()).into_owned()
    }

    // ----- clipboard -------------------------------------------------------

    /// Copy the selection to the clipboard. Password documents refuse.
    pub fn copy(&mut self) -> bool {
        if self.password || !self.selection.is_selected() {
            return false;
        }
        let text = self.selection_text();
        self.clipboard.set_text(&text);
        true
    }

    /// Copy the selection, then delete it.
    pub fn cut(&mut self) -> bool {
        if self.read_only {
            return false;
        }
        self.copy() && self.remove_selection()
    }

    /// Insert the clipboard text at the caret.
    pub fn paste(&mut self) -> bool {
        if self.read_only {
            return false;
        }
        let Some(text) = self.clipboard.get_text() else {
            return false;
        };
        if text.is_empty() {
            return false;
        }
        self.insert_text(&text);
        true
    }

    // ----- history ---------------------------------------------------------

    /// Undo the newest edit.
    pub fn undo(&mut self) {
        if self.read_only {
            return;
        }
        if let Some(event) = self.history.pop_undo() {
            self.apply_event(&event, true);
        }
    }

    /// Replay the newest undone edit.
    pub fn redo(&mut self) {
        if self.read_only {
            return;
        }
        if let Some(event) = self.history.pop_redo() {
            self.apply_event(&event, false);
        }
    }

    fn apply_event(&mut self, event: &UndoEvent, reverse: bool) {
        self.history.set_applying(true);
        self.selection.select_nothing();
        if event.insert != reverse {
            let pos = TextOffset::from_global(&self.blocks, event.gofs);
            self.insert_at(pos, &event.bytes, false);
            self.place_caret_global(event.gofs + event.bytes.len(), false);
            // Show what an undone delete put back.
            if reverse && utf8::count_chars(&event.bytes, 0, event.bytes.len()) > 1 {
                self.select_global(event.gofs, event.gofs + event.bytes.len());
            }
        } else {
            let start = TextOffset::from_global(&self.blocks, event.gofs);
            let stop = TextOffset::from_global(&self.blocks, event.gofs + event.bytes.len());
            self.remove_range(start, stop, false);
            self.place_caret_global(event.gofs, false);
        }
        self.history.set_applying(false);
        self.caret.wanted_x = self.caret.x;
        self.reset_blink();
        self.scroll_to_caret();
        self.invalidate_view();
    }

    // ----- input -----------------------------------------------------------

    /// Handle a key press. Returns whether the key was consumed.
    pub fn key_down(&mut self, key: Key, mods: Modifiers) -> bool {
        let shift = mods.contains(Modifiers::SHIFT);
        let ctrl = mods.contains(Modifiers::CTRL);
        match key {
            Key::Left => {
                self.move_caret_horizontal(false, ctrl, shift);
                true
            }
            Key::Right => {
                self.move_caret_horizontal(true, ctrl, shift);
                true
            }
            Key::Up => {
                self.move_caret_vertical(false, shift);
                true
            }
            Key::Down => {
                self.move_caret_vertical(true, shift);
                true
            }
            Key::Home => {
                self.move_caret_line_edge(true, ctrl, shift);
                true
            }
            Key::End => {
                self.move_caret_line_edge(false, ctrl, shift);
                true
            }
            Key::PageUp => {
                self.move_caret_page(false, shift);
                true
            }
            Key::PageDown => {
                self.move_caret_page(true, shift);
                true
            }
            Key::Backspace => {
                self.delete_backward();
                true
            }
            Key::Delete => {
                self.delete_forward();
                true
            }
            Key::Enter => {
                if ctrl {
                    return false;
                }
                self.insert_break()
            }
            Key::Tab => {
                if !self.multiline || self.read_only {
                    return false;
                }
                self.insert_text("\t");
                true
            }
            Key::Char(c) => {
                if ctrl {
                    match c.to_ascii_lowercase() {
                        'a' => {
                            self.select_all();
                            true
                        }
                        'c' => self.copy(),
                        'x' => self.cut(),
                        'v' => self.paste(),
                        'z' => {
                            if shift {
                                self.redo();
                            } else {
                                self.undo();
                            }
                            true
                        }
                        'y' => {
                            self.redo();
                            true
                        }
                        _ => false,
                    }
                } else if mods.contains(Modifiers::ALT) || self.read_only {
                    false
                } else {
                    let mut buf = [0_u8; 4];
                    self.insert_text(c.encode_utf8(&mut buf));
                    true
                }
            }
        }
    }

    /// Handle a pointer press in view coordinates. A second click selects
    /// the word under the pointer.
    pub fn mouse_down(&mut self, p: Point, button: MouseButton, clicks: u8, mods: Modifiers) -> bool {
        if button != MouseButton::Left {
            return false;
        }
        let shift = mods.contains(Modifiers::SHIFT);
        let anchor = self.begin_move(shift);
        let doc = Point::new(p.x + self.scroll_x, p.y + self.scroll_y);
        let (pos, prefer) = self.offset_at_doc_point(doc);
        self.place_caret(pos, prefer);
        self.caret.wanted_x = self.caret.x;
        if clicks > 1 {
            self.select_word_at(pos);
        } else if shift {
            self.selection.select(anchor, self.caret.pos);
        } else {
            // Anchor the empty selection here for the coming drag.
            self.selection.select(self.caret.pos, self.caret.pos);
        }
        self.selecting = true;
        self.reset_blink();
        self.invalidate_view();
        true
    }

    /// Select the word (or whitespace run) containing `pos`, staying on the
    /// text side of the block's trailing break.
    fn select_word_at(&mut self, pos: TextOffset) {
        let block = &self.blocks[pos.block];
        let (_, text_end) = block.line_range_at_ofs(block.len(), false);
        let text = &block.bytes()[..text_end];
        if text.is_empty() {
            return;
        }
        let ofs = pos.ofs.min(text_end.saturating_sub(1));
        let end = word_boundary(text, ofs, true);
        let start = word_boundary(text, end, false);
        self.selection.select(
            TextOffset::new(pos.block, start),
            TextOffset::new(pos.block, end),
        );
        self.place_caret(TextOffset::new(pos.block, end), false);
        self.caret.wanted_x = self.caret.x;
    }

    /// Handle pointer movement during a drag.
    pub fn mouse_move(&mut self, p: Point) -> bool {
        if !self.selecting {
            return false;
        }
        let doc = Point::new(p.x + self.scroll_x, p.y + self.scroll_y);
        let (pos, prefer) = self.offset_at_doc_point(doc);
        self.place_caret(pos, prefer);
        self.caret.wanted_x = self.caret.x;
        let anchor = self.selection.start;
        self.selection.select(anchor, self.caret.pos);
        self.scroll_to_caret();
        self.invalidate_view();
        true
    }

    /// Handle a pointer release.
    pub fn mouse_up(&mut self, button: MouseButton) -> bool {
        if button != MouseButton::Left || !self.selecting {
            return false;
        }
        self.selecting = false;
        true
    }

    /// Focus gained or lost. Controls caret visibility and blinking.
    pub fn focus(&mut self, focused: bool) {
        self.has_focus = focused;
        self.caret.on = focused;
        if focused {
            self.host.caret_blink_start();
        } else {
            self.host.caret_blink_stop();
        }
        let rect = self.caret.rect().offset(-self.scroll_x, -self.scroll_y);
        self.host.invalidate(rect);
    }

    /// Toggle the caret blink phase. Driven by the host's timer.
    pub fn caret_blink(&mut self) {
        self.caret.on = !self.caret.on;
        let rect = self.caret.rect().offset(-self.scroll_x, -self.scroll_y);
        self.host.invalidate(rect);
    }

    // ----- scrolling -------------------------------------------------------

    /// Current horizontal scroll offset.
    #[must_use]
    pub fn scroll_x(&self) -> i32 {
        self.scroll_x
    }

    /// Current vertical scroll offset.
    #[must_use]
    pub fn scroll_y(&self) -> i32 {
        self.scroll_y
    }

    /// Scroll to an absolute offset, clamped to the content.
    pub fn scroll_to(&mut self, x: i32, y: i32) {
        let max_x = (self.content_width() - self.layout_width).max(0);
        let max_y = (self.content_height - self.layout_height).max(0);
        let nx = x.clamp(0, max_x);
        let ny = y.clamp(0, max_y);
        if nx == self.scroll_x && ny == self.scroll_y {
            return;
        }
        let dx = nx - self.scroll_x;
        let dy = ny - self.scroll_y;
        self.scroll_x = nx;
        self.scroll_y = ny;
        self.host.scroll(dx, dy);
        self.invalidate_view();
    }

    /// Scroll the minimum distance that brings the caret into view.
    pub fn scroll_to_caret(&mut self) {
        if self.layout_height <= 0 {
            return;
        }
        let c = self.caret.rect();
        let mut sx = self.scroll_x;
        let mut sy = self.scroll_y;
        if c.x < sx {
            sx = c.x;
        } else if c.x + c.w > sx + self.layout_width {
            sx = c.x + c.w - self.layout_width;
        }
        if c.y < sy {
            sy = c.y;
        } else if c.y + c.h > sy + self.layout_height {
            sy = c.y + c.h - self.layout_height;
        }
        self.scroll_to(sx, sy);
    }

    fn invalidate_view(&mut self) {
        let w = self.layout_width.max(self.content_width).max(1);
        let h = self.layout_height.max(self.content_height).max(1);
        self.host.invalidate(Rect::new(0, 0, w, h));
    }

    // ----- painting --------------------------------------------------------

    /// Paint the visible document through the host.
    ///
    /// Style markers push and pop a color/underline stack as fragments are
    /// walked in document order, so a tag opened in one block styles the
    /// blocks after it until popped.
    pub fn paint(&mut self) {
        let env = LayoutEnv {
            metrics: self.metrics.as_ref(),
            factory: self.factory.as_ref(),
            width: self.layout_width,
            wrapping: self.wrapping && self.multiline,
            password: self.password,
            align: self.align,
        };
        let sel = self.selection;
        let scroll_x = self.scroll_x;
        let scroll_y = self.scroll_y;
        let view_h = self.layout_height;
        let base = PaintStyle {
            color: self.text_color,
            underline: false,
        };
        let mut styles: Vec<PaintStyle> = Vec::new();

        for (bi, block) in self.blocks.iter().enumerate() {
            let by = block.ypos - scroll_y;
            if view_h > 0 && by >= view_h {
                break;
            }
            if by + block.height <= 0 {
                // Off-screen above, but its markers still shape the stack.
                for frag in block.fragments() {
                    match frag.content() {
                        Some(FragmentContent::Color(c)) => {
                            let mut st = styles.last().copied().unwrap_or(base);
                            st.color = *c;
                            styles.push(st);
                        }
                        Some(FragmentContent::Underline) => {
                            let mut st = styles.last().copied().unwrap_or(base);
                            st.underline = true;
                            styles.push(st);
                        }
                        Some(FragmentContent::StylePop) => {
                            styles.pop();
                        }
                        _ => {}
                    }
                }
                continue;
            }
            let text = block.bytes();
            let sel_range = sel.range_in_block(bi, block.len());
            for frag in block.fragments() {
                let style = styles.last().copied().unwrap_or(base);
                let fx = frag.xpos - scroll_x;
                let fy = by + frag.ypos;
                let frag_selected =
                    sel_range.is_some_and(|(s, e)| s < frag.end() && e > frag.ofs());
                let is_embed = matches!(frag.content(), Some(FragmentContent::Embed(_)));

                // Embeds draw their own selection look.
                if let Some((s, e)) = sel_range.filter(|_| frag_selected && !is_embed) {
                    let s2 = s.max(frag.ofs());
                    let e2 = e.min(frag.end());
                    let x0 = frag.char_x(text, &env, s2);
                    let x1 = if frag.is_break(text) {
                        env.metrics.string_width(b" ")
                    } else {
                        frag.char_x(text, &env, e2)
                    };
                    if x1 > x0 {
                        self.host.draw_selection_bg(Rect::new(
                            fx + x0,
                            by + frag.line_ypos,
                            x1 - x0,
                            frag.line_height,
                        ));
                    }
                }

                match frag.content() {
                    Some(FragmentContent::Color(c)) => {
                        let mut st = style;
                        st.color = *c;
                        styles.push(st);
                    }
                    Some(FragmentContent::Underline) => {
                        let mut st = style;
                        st.underline = true;
                        styles.push(st);
                    }
                    Some(FragmentContent::StylePop) => {
                        styles.pop();
                    }
                    Some(FragmentContent::HorizontalRule { .. }) => {
                        let w = frag.width(text, &env);
                        let h = frag.height(&env);
                        self.host.draw_rect_fill(Rect::new(fx, fy, w, h), style.color);
                    }
                    Some(FragmentContent::Embed(embed)) => {
                        let w = frag.width(text, &env);
                        let h = frag.height(&env);
                        embed.paint(
                            self.host.as_mut(),
                            Rect::new(fx, fy, w, h),
                            style.color,
                            frag_selected,
                        );
                    }
                    None => {
                        if !frag.is_break(text) && !frag.is_tab(text) {
                            if env.password {
                                let n = utf8::count_chars(text, frag.ofs(), frag.end());
                                let masked = PASSWORD_GLYPH.repeat(n);
                                self.host.draw_string(fx, fy, &self.font, style.color, &masked);
                            } else {
                                self.host
                                    .draw_string(fx, fy, &self.font, style.color, frag.bytes(text));
                            }
                            if style.underline {
                                let w = frag.width(text, &env);
                                let uy = fy + env.metrics.ascent() + 1;
                                self.host
                                    .draw_rect_fill(Rect::new(fx, uy, w, 1), style.color);
                            }
                        }
                    }
                }
            }
        }

        if self.has_focus && self.caret.on {
            let rect = self.caret.rect().offset(-scroll_x, -scroll_y);
            self.host.draw_caret(rect);
        }
    }
}
