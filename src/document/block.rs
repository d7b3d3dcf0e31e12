//! Blocks: one paragraph of source text and its wrapped layout.
//!
//! A block owns the bytes of one paragraph (up to and including its
//! terminating line break) and the fragments produced by splitting those
//! bytes at word/tab/break/embed boundaries. `layout` is the reflow
//! algorithm: it rebuilds fragments when the text changed, then walks them
//! into visual lines with greedy wrapping, baseline alignment, and hanging
//! indentation.

use crate::document::fragment::{TextFragment, is_word_break_char};
use crate::document::{LayoutEnv, TextAlign};
use crate::utf8;

/// One paragraph-level unit of the document.
#[derive(Debug)]
pub struct TextBlock {
    pub(crate) text: Vec<u8>,
    /// Vertical offset relative to the document top.
    pub(crate) ypos: i32,
    /// Total height across all wrapped visual lines.
    pub(crate) height: i32,
    /// Per-block alignment override; `None` uses the document's alignment.
    pub(crate) align: Option<TextAlign>,
    pub(crate) fragments: Vec<TextFragment>,
    /// Widest laid-out visual line, for document content-width tracking.
    pub(crate) line_width_max: i32,
}

/// Find the first line-break sequence in `text`, as `(offset, length)`.
///
/// `\r\n` counts as one 2-byte unit. Scanning is byte-exact: only raw
/// `0x0A`/`0x0D` match, so bytes inside (even malformed) multi-byte
/// sequences can never read as breaks.
pub(crate) fn find_break(text: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'\n' => return Some((i, 1)),
            b'\r' => {
                let len = if text.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                return Some((i, len));
            }
            _ => i += 1,
        }
    }
    None
}

impl TextBlock {
    pub(crate) fn new(text: Vec<u8>) -> Self {
        Self {
            text,
            ypos: 0,
            height: 0,
            align: None,
            fragments: Vec::new(),
            line_width_max: 0,
        }
    }

    /// Byte length of the block's text, including any trailing break.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Check if the block holds no text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The block's raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.text
    }

    /// Vertical offset of the block relative to the document top.
    #[must_use]
    pub fn ypos(&self) -> i32 {
        self.ypos
    }

    /// Total height of the block across its wrapped lines.
    #[must_use]
    pub fn height(&self) -> i32 {
        self.height
    }

    /// The block's fragments, in offset order.
    #[must_use]
    pub fn fragments(&self) -> &[TextFragment] {
        &self.fragments
    }

    /// Check if the block's text ends with a line-break character.
    #[must_use]
    pub fn ends_with_break(&self) -> bool {
        matches!(self.text.last(), Some(b'\n' | b'\r'))
    }

    /// If the block contains a break strictly before its final run, return
    /// the offset where the remainder should be cut into a new block.
    pub(crate) fn needs_split(&self) -> Option<usize> {
        let (ofs, len) = find_break(&self.text)?;
        let after = ofs + len;
        // A lone trailing break belongs to this block.
        (after < self.text.len()).then_some(after)
    }

    pub(crate) fn insert_bytes(&mut self, ofs: usize, bytes: &[u8]) {
        debug_assert!(ofs <= self.text.len(), "insert offset beyond block");
        let ofs = ofs.min(self.text.len());
        self.text.splice(ofs..ofs, bytes.iter().copied());
    }

    pub(crate) fn remove_bytes(&mut self, start: usize, end: usize) -> Vec<u8> {
        debug_assert!(start <= end && end <= self.text.len(), "bad remove range");
        let end = end.min(self.text.len());
        let start = start.min(end);
        self.text.drain(start..end).collect()
    }

    /// Rebuild fragments by scanning the text once with the "next fragment"
    /// classifier: embed match, tab, break, or maximal word run (a lone
    /// word-break character becomes its own fragment).
    fn build_fragments(&mut self, env: &LayoutEnv<'_>) {
        self.fragments.clear();
        let text = &self.text;
        let mut ofs = 0;
        while ofs < text.len() {
            let rest = &text[ofs..];
            let matched = env.factory.match_content(rest);
            if matched > 0 {
                let content = env.factory.create_content(&rest[..matched]);
                self.fragments
                    .push(TextFragment::new(ofs, matched, content));
                ofs += matched;
                continue;
            }
            let len = match rest[0] {
                b'\t' | b'\n' => 1,
                b'\r' => {
                    if rest.get(1) == Some(&b'\n') {
                        2
                    } else {
                        1
                    }
                }
                _ => {
                    let mut i = 0;
                    while i < rest.len() {
                        let mut next = i;
                        let cp = utf8::decode(rest, &mut next);
                        if is_word_break_char(cp) {
                            break;
                        }
                        i = next;
                    }
                    if i == 0 {
                        // An immediate word-break character stands alone.
                        let mut next = 0;
                        utf8::move_inc(rest, &mut next);
                        i = next;
                    }
                    i
                }
            };
            self.fragments.push(TextFragment::new(ofs, len, None));
            ofs += len;
        }
    }

    /// Reflow the block, returning its new height.
    ///
    /// Fragments are rebuilt when `update_fragments` is set (the text
    /// changed) or none exist yet. With `env.width <= 0` positioning is
    /// deferred until the host assigns a real size. The caller owns `ypos`
    /// propagation to following blocks.
    pub(crate) fn layout(&mut self, env: &LayoutEnv<'_>, update_fragments: bool) -> i32 {
        if update_fragments || (self.fragments.is_empty() && !self.text.is_empty()) {
            self.build_fragments(env);
        }
        if env.width <= 0 {
            if self.height == 0 {
                self.height = env.metrics.height();
            }
            return self.height;
        }
        if self.fragments.is_empty() {
            self.height = env.metrics.height();
            self.line_width_max = 0;
            return self.height;
        }

        let align = self.align.unwrap_or(env.align);
        let nfrag = self.fragments.len();
        let mut line_ypos = 0;
        let mut width_max = 0;
        let mut wrap_indent = 0;
        let mut first_line = true;
        let mut i = 0;

        while i < nfrag {
            let line_start = i;
            let indent = if first_line { 0 } else { wrap_indent };
            let avail = env.width - indent;

            // Find where this visual line ends: at a break fragment, at the
            // last allowed break point before overflow, or at the block end.
            // A fragment is never divided; with no allowed break point the
            // line overflows instead.
            let mut w = 0_i32;
            let mut last_break: Option<usize> = None;
            let mut j = i;
            let line_end = loop {
                if j >= nfrag {
                    break nfrag;
                }
                let fw = self.fragments[j].width(&self.text, env);
                if env.wrapping && j > line_start && w + fw > avail {
                    if let Some(b) = last_break {
                        break b + 1;
                    }
                }
                w += fw;
                if self.fragments[j].is_break(&self.text) {
                    break j + 1;
                }
                if j + 1 < nfrag
                    && self.fragments[j].allow_break_after(&self.text)
                    && self.fragments[j + 1].allow_break_before(&self.text)
                {
                    last_break = Some(j);
                }
                j += 1;
            };

            // Line height is the tallest fragment; every fragment is shifted
            // down to share the deepest baseline.
            let mut line_h = 0;
            let mut line_base = 0;
            for f in &self.fragments[line_start..line_end] {
                line_h = line_h.max(f.height(env));
                line_base = line_base.max(f.baseline(env));
            }

            let text = &self.text;
            let mut x = indent;
            for f in &mut self.fragments[line_start..line_end] {
                let fw = f.width(text, env);
                f.xpos = x;
                f.line_ypos = line_ypos;
                f.line_height = line_h;
                f.ypos = line_ypos + (line_base - f.baseline(env));
                x += fw;
            }
            let line_w = x - indent;
            let xofs = match align {
                TextAlign::Left => 0,
                TextAlign::Center => (env.width - indent - line_w).max(0) / 2,
                TextAlign::Right => (env.width - indent - line_w).max(0),
            };
            if xofs > 0 {
                for f in &mut self.fragments[line_start..line_end] {
                    f.xpos += xofs;
                }
            }
            width_max = width_max.max(indent + line_w);

            if first_line {
                wrap_indent = start_indentation(&self.fragments, text, env, line_end);
                first_line = false;
            }
            line_ypos += line_h;
            i = line_end;
        }

        self.height = line_ypos;
        self.line_width_max = width_max;
        self.height
    }

    /// Index of the fragment containing `ofs`. At an exact boundary between
    /// two fragments, `prefer_first` selects the earlier one (used when the
    /// caret should stay on the line a wrap just ended).
    pub(crate) fn fragment_index_at_ofs(&self, ofs: usize, prefer_first: bool) -> usize {
        if self.fragments.is_empty() {
            return 0;
        }
        let mut idx = match self.fragments.binary_search_by(|f| f.ofs.cmp(&ofs)) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        if prefer_first && idx > 0 && self.fragments[idx].ofs == ofs {
            idx -= 1;
        }
        idx
    }

    /// Caret geometry for a byte offset: (x, line y, line height), all
    /// relative to the block's top-left.
    pub(crate) fn caret_geometry(
        &self,
        env: &LayoutEnv<'_>,
        ofs: usize,
        prefer_first: bool,
    ) -> (i32, i32, i32) {
        if self.fragments.is_empty() {
            return (0, 0, env.metrics.height());
        }
        let fi = self.fragment_index_at_ofs(ofs, prefer_first);
        let f = &self.fragments[fi];
        let x = f.xpos + f.char_x(&self.text, env, ofs.clamp(f.ofs, f.end()));
        (x, f.line_ypos, f.line_height)
    }

    /// Resolve a block-local pixel position to a byte offset.
    pub(crate) fn hit_test(&self, env: &LayoutEnv<'_>, x: i32, y: i32) -> usize {
        if self.fragments.is_empty() {
            return 0;
        }
        // Pick the last visual line starting at or above y.
        let mut line_start = 0;
        for (i, f) in self.fragments.iter().enumerate() {
            let starts_line = i == 0 || f.line_ypos != self.fragments[i - 1].line_ypos;
            if starts_line {
                if f.line_ypos <= y {
                    line_start = i;
                } else {
                    break;
                }
            }
        }
        let ly = self.fragments[line_start].line_ypos;
        let mut line_end = line_start;
        while line_end < self.fragments.len() && self.fragments[line_end].line_ypos == ly {
            line_end += 1;
        }

        let first = &self.fragments[line_start];
        if x < first.xpos {
            return first.ofs;
        }
        for f in &self.fragments[line_start..line_end] {
            let fw = f.width(&self.text, env);
            if x < f.xpos + fw {
                return f.char_ofs_at_x(&self.text, env, x - f.xpos);
            }
        }
        let last = &self.fragments[line_end - 1];
        if last.is_break(&self.text) {
            last.ofs
        } else {
            last.end()
        }
    }

    /// Byte range `[start, end)` of the visual line holding `ofs`, where
    /// `end` excludes a trailing break fragment.
    pub(crate) fn line_range_at_ofs(&self, ofs: usize, prefer_first: bool) -> (usize, usize) {
        if self.fragments.is_empty() {
            return (0, 0);
        }
        let fi = self.fragment_index_at_ofs(ofs, prefer_first);
        let ly = self.fragments[fi].line_ypos;
        let mut first = fi;
        while first > 0 && self.fragments[first - 1].line_ypos == ly {
            first -= 1;
        }
        let mut last = fi;
        while last + 1 < self.fragments.len() && self.fragments[last + 1].line_ypos == ly {
            last += 1;
        }
        let end_frag = &self.fragments[last];
        let end = if end_frag.is_break(&self.text) {
            end_frag.ofs
        } else {
            end_frag.end()
        };
        (self.fragments[first].ofs, end)
    }
}

/// Indentation for wrapped lines: the width of the first line's leading
/// tab/space/bullet fragments, so list-like content hangs.
fn start_indentation(
    fragments: &[TextFragment],
    text: &[u8],
    env: &LayoutEnv<'_>,
    line_end: usize,
) -> i32 {
    let mut indent = 0;
    for f in &fragments[..line_end] {
        let is_bullet = f.len == 1 && matches!(text.get(f.ofs), Some(b'-' | b'*'));
        if f.is_tab(text) || f.is_space(text) || is_bullet {
            indent += f.width(text, env);
        } else {
            break;
        }
    }
    indent.min(env.width / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::NoContent;
    use crate::metrics::test_metrics::FixedMetrics;

    fn env<'a>(metrics: &'a FixedMetrics, factory: &'a NoContent, width: i32) -> LayoutEnv<'a> {
        LayoutEnv {
            metrics,
            factory,
            width,
            wrapping: true,
            password: false,
            align: TextAlign::Left,
        }
    }

    fn laid_out(text: &[u8], width: i32) -> TextBlock {
        let m = FixedMetrics::new();
        let f = NoContent;
        let env = env(&m, &f, width);
        let mut block = TextBlock::new(text.to_vec());
        let _ = block.layout(&env, true);
        block
    }

    fn assert_tiling(block: &TextBlock) {
        let mut expect = 0;
        for f in &block.fragments {
            assert_eq!(f.ofs, expect, "fragment gap or overlap at {expect}");
            assert!(f.len > 0);
            expect = f.end();
        }
        assert_eq!(expect, block.len(), "fragments do not cover the block");
    }

    #[test]
    fn test_fragment_tiling() {
        let block = laid_out(b"hello world, one\ttwo\r\n", 1000);
        assert_tiling(&block);
        // "hello", " ", "world", ",", " ", "one", "\t", "two", "\r\n"
        assert_eq!(block.fragments.len(), 9);
    }

    #[test]
    fn test_find_break() {
        assert_eq!(find_break(b"ab\ncd"), Some((2, 1)));
        assert_eq!(find_break(b"ab\r\ncd"), Some((2, 2)));
        assert_eq!(find_break(b"ab\rcd"), Some((2, 1)));
        assert_eq!(find_break(b"abcd"), None);
        // Overlong-encoded newline bytes never match.
        assert_eq!(find_break(b"\xC0\x8A"), None);
    }

    #[test]
    fn test_needs_split() {
        assert_eq!(TextBlock::new(b"ab\ncd".to_vec()).needs_split(), Some(3));
        // A lone trailing break does not split.
        assert_eq!(TextBlock::new(b"ab\n".to_vec()).needs_split(), None);
        assert_eq!(TextBlock::new(b"ab\r\n".to_vec()).needs_split(), None);
        assert_eq!(TextBlock::new(b"ab".to_vec()).needs_split(), None);
    }

    #[test]
    fn test_wrap_at_word_boundary() {
        // advance 8: "hello world" is 88px; at width 64 "hello " fits (48),
        // "world" wraps.
        let block = laid_out(b"hello world", 64);
        assert_tiling(&block);
        let lines: Vec<i32> = block.fragments.iter().map(|f| f.line_ypos).collect();
        assert_eq!(lines, vec![0, 0, 16]);
        // Wrapped line starts back at x 0.
        assert_eq!(block.fragments[2].xpos, 0);
        assert_eq!(block.height, 32);
    }

    #[test]
    fn test_overflow_when_no_break_point() {
        // A single 20-char word at width 64 can't break: it overflows.
        let block = laid_out(b"abcdefghijklmnopqrst", 64);
        assert_eq!(block.fragments.len(), 1);
        assert_eq!(block.fragments[0].line_ypos, 0);
        assert_eq!(block.height, 16);
        assert_eq!(block.line_width_max, 160);
    }

    #[test]
    fn test_no_wrap_single_line() {
        let m = FixedMetrics::new();
        let f = NoContent;
        let mut e = env(&m, &f, 64);
        e.wrapping = false;
        let mut block = TextBlock::new(b"hello world again".to_vec());
        let _ = block.layout(&e, true);
        assert!(block.fragments.iter().all(|fr| fr.line_ypos == 0));
        assert_eq!(block.height, 16);
    }

    #[test]
    fn test_punctuation_clings_to_word() {
        // "one." then " " then "two": at a width that fits "one" but not
        // "one.", the '.' must not start a line; "one." wraps together...
        // here it can't, so the first line overflows with "one.".
        let block = laid_out(b"one. two", 28);
        let dot = &block.fragments[1];
        assert_eq!(block.bytes()[dot.ofs], b'.');
        assert_eq!(
            dot.line_ypos, block.fragments[0].line_ypos,
            "dot must stay on the word's line"
        );
    }

    #[test]
    fn test_hanging_indent() {
        // "- item continues" with the bullet and space leading: wrapped
        // lines indent past "- " (16px).
        let block = laid_out(b"- item continues here", 80);
        assert_tiling(&block);
        let wrapped: Vec<&TextFragment> = block
            .fragments
            .iter()
            .filter(|f| f.line_ypos > 0)
            .collect();
        assert!(!wrapped.is_empty());
        for f in wrapped {
            let starts_line = block
                .fragments
                .iter()
                .filter(|g| g.line_ypos == f.line_ypos)
                .map(|g| g.xpos)
                .min()
                .unwrap();
            assert_eq!(starts_line, 16);
        }
    }

    #[test]
    fn test_alignment_right() {
        let m = FixedMetrics::new();
        let f = NoContent;
        let mut e = env(&m, &f, 100);
        e.align = TextAlign::Right;
        let mut block = TextBlock::new(b"abc".to_vec());
        let _ = block.layout(&e, true);
        // 3 chars = 24px; right aligned at width 100 → x = 76.
        assert_eq!(block.fragments[0].xpos, 76);
    }

    #[test]
    fn test_layout_deferred_without_width() {
        let m = FixedMetrics::new();
        let f = NoContent;
        let e = env(&m, &f, 0);
        let mut block = TextBlock::new(b"hello world".to_vec());
        let h = block.layout(&e, true);
        assert_eq!(h, 16);
        // Fragments exist but carry no positions yet.
        assert!(!block.fragments.is_empty());
    }

    #[test]
    fn test_hit_test_midpoint() {
        let block = laid_out(b"abcd", 1000);
        let m = FixedMetrics::new();
        let f = NoContent;
        let e = env(&m, &f, 1000);
        assert_eq!(block.hit_test(&e, 0, 0), 0);
        assert_eq!(block.hit_test(&e, 11, 0), 1); // closer to boundary 1*8
        assert_eq!(block.hit_test(&e, 13, 0), 2);
        assert_eq!(block.hit_test(&e, 500, 0), 4); // past line end
        assert_eq!(block.hit_test(&e, -5, 0), 0);
    }

    #[test]
    fn test_hit_test_does_not_land_inside_break() {
        let block = laid_out(b"ab\r\n", 1000);
        let m = FixedMetrics::new();
        let f = NoContent;
        let e = env(&m, &f, 1000);
        // Clicking far right of the line lands before the break, not after.
        assert_eq!(block.hit_test(&e, 500, 0), 2);
    }

    #[test]
    fn test_line_range() {
        let block = laid_out(b"hello world", 64);
        // Line 0: "hello ", line 1: "world".
        assert_eq!(block.line_range_at_ofs(2, false), (0, 6));
        assert_eq!(block.line_range_at_ofs(8, false), (6, 11));
    }

    #[test]
    fn test_fragment_boundary_prefer_first() {
        let block = laid_out(b"hello world", 64);
        assert_eq!(block.fragment_index_at_ofs(6, false), 2);
        assert_eq!(block.fragment_index_at_ofs(6, true), 1);
    }

    #[test]
    fn test_styled_factory_produces_embeds() {
        use crate::content::StyledContentFactory;
        let m = FixedMetrics::new();
        let f = StyledContentFactory;
        let e = LayoutEnv {
            metrics: &m,
            factory: &f,
            width: 1000,
            wrapping: true,
            password: false,
            align: TextAlign::Left,
        };
        let mut block = TextBlock::new(b"<color #ff0000>hi</>".to_vec());
        let _ = block.layout(&e, true);
        assert_eq!(block.fragments.len(), 3);
        assert!(block.fragments[0].is_embed());
        assert!(!block.fragments[1].is_embed());
        assert!(block.fragments[2].is_embed());
        // Style markers are zero-width: the text starts at x 0.
        assert_eq!(block.fragments[1].xpos, 0);
    }
}
