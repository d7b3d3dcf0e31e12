//! Fragments: the smallest breakable units within a block.
//!
//! A fragment is a line break, a single tab, one word-break character, a
//! maximal run of word bytes, or an embedded content object. Fragments tile
//! their block's byte string exactly; layout positions are cached here and
//! rebuilt on every reflow, never treated as authoritative state.

use crate::content::FragmentContent;
use crate::document::LayoutEnv;
use crate::utf8;

/// Tab advance measured in space widths.
pub(crate) const TAB_ADVANCE_SPACES: i32 = 4;

/// Glyph shown for every character in password mode.
pub(crate) const PASSWORD_GLYPH: &[u8] = b"*";

/// An atomic, non-breakable unit of content within a block.
#[derive(Debug)]
pub struct TextFragment {
    pub(crate) ofs: usize,
    pub(crate) len: usize,
    /// Line-relative x position, set during layout.
    pub(crate) xpos: i32,
    /// Block-relative y position (baseline-aligned), set during layout.
    pub(crate) ypos: i32,
    /// Block-relative y of the visual line this fragment sits on.
    pub(crate) line_ypos: i32,
    /// Height of the visual line this fragment sits on.
    pub(crate) line_height: i32,
    pub(crate) content: Option<FragmentContent>,
}

impl TextFragment {
    pub(crate) fn new(ofs: usize, len: usize, content: Option<FragmentContent>) -> Self {
        Self {
            ofs,
            len,
            xpos: 0,
            ypos: 0,
            line_ypos: 0,
            line_height: 0,
            content,
        }
    }

    /// Byte offset within the owning block.
    #[must_use]
    pub fn ofs(&self) -> usize {
        self.ofs
    }

    /// Byte length within the owning block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the fragment covers no bytes (never true after layout).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// One past the last byte covered.
    #[must_use]
    pub fn end(&self) -> usize {
        self.ofs + self.len
    }

    /// The bytes this fragment covers in its block's text.
    #[must_use]
    pub fn bytes<'a>(&self, text: &'a [u8]) -> &'a [u8] {
        &text[self.ofs..self.end()]
    }

    /// Horizontal position within the block, set by layout.
    #[must_use]
    pub fn xpos(&self) -> i32 {
        self.xpos
    }

    /// Vertical position within the block, set by layout.
    #[must_use]
    pub fn ypos(&self) -> i32 {
        self.ypos
    }

    /// Top of the visual line this fragment sits on, block-relative.
    #[must_use]
    pub fn line_ypos(&self) -> i32 {
        self.line_ypos
    }

    /// Height of the visual line this fragment sits on.
    #[must_use]
    pub fn line_height(&self) -> i32 {
        self.line_height
    }

    /// Embedded content, if any.
    #[must_use]
    pub fn content(&self) -> Option<&FragmentContent> {
        self.content.as_ref()
    }

    /// Check if this fragment holds embedded content.
    #[must_use]
    pub fn is_embed(&self) -> bool {
        self.content.is_some()
    }

    /// Check if this is a line-break fragment.
    #[must_use]
    pub fn is_break(&self, text: &[u8]) -> bool {
        self.content.is_none() && matches!(text.get(self.ofs), Some(b'\r' | b'\n'))
    }

    /// Check if this is a tab fragment.
    #[must_use]
    pub fn is_tab(&self, text: &[u8]) -> bool {
        self.content.is_none() && text.get(self.ofs) == Some(&b'\t')
    }

    /// Check if this is a single-space fragment.
    #[must_use]
    pub fn is_space(&self, text: &[u8]) -> bool {
        self.content.is_none() && text.get(self.ofs) == Some(&b' ')
    }

    pub(crate) fn width(&self, text: &[u8], env: &LayoutEnv<'_>) -> i32 {
        if let Some(content) = &self.content {
            return content.width(env.metrics, env.width);
        }
        if self.is_break(text) {
            return 0;
        }
        if self.is_tab(text) {
            return env.metrics.string_width(b" ") * TAB_ADVANCE_SPACES;
        }
        if env.password {
            let n = utf8::count_chars(text, self.ofs, self.end());
            return env.metrics.string_width(PASSWORD_GLYPH) * i32::try_from(n).unwrap_or(i32::MAX);
        }
        env.metrics.string_width(self.bytes(text))
    }

    pub(crate) fn height(&self, env: &LayoutEnv<'_>) -> i32 {
        self.content
            .as_ref()
            .map_or_else(|| env.metrics.height(), |c| c.height(env.metrics))
    }

    pub(crate) fn baseline(&self, env: &LayoutEnv<'_>) -> i32 {
        self.content
            .as_ref()
            .map_or_else(|| env.metrics.ascent(), |c| c.baseline(env.metrics))
    }

    /// X position (relative to the fragment) of a byte offset inside it.
    pub(crate) fn char_x(&self, text: &[u8], env: &LayoutEnv<'_>, ofs: usize) -> i32 {
        let ofs = ofs.clamp(self.ofs, self.end());
        if ofs == self.ofs {
            return 0;
        }
        if self.content.is_some() || self.is_break(text) || self.is_tab(text) {
            // Atomic: any interior offset sits at the trailing edge.
            return self.width(text, env);
        }
        if env.password {
            let n = utf8::count_chars(text, self.ofs, ofs);
            return env.metrics.string_width(PASSWORD_GLYPH) * i32::try_from(n).unwrap_or(i32::MAX);
        }
        env.metrics.string_width(&text[self.ofs..ofs])
    }

    /// Byte offset (block-relative) nearest to a fragment-relative x.
    ///
    /// Each candidate boundary is scored against the midpoint of the
    /// following character, so clicks snap to the visually closest boundary
    /// rather than flooring.
    pub(crate) fn char_ofs_at_x(&self, text: &[u8], env: &LayoutEnv<'_>, x: i32) -> usize {
        if self.is_break(text) {
            return self.ofs;
        }
        if self.content.is_some() || self.is_tab(text) {
            let w = self.width(text, env);
            return if x < w / 2 { self.ofs } else { self.end() };
        }
        let placeholder = env
            .password
            .then(|| env.metrics.string_width(PASSWORD_GLYPH));
        let mut i = self.ofs;
        let mut acc = 0;
        while i < self.end() {
            let mut next = i;
            utf8::move_inc(text, &mut next);
            let next = next.min(self.end());
            let cw = placeholder.unwrap_or_else(|| env.metrics.string_width(&text[i..next]));
            if x < acc + cw / 2 {
                return i;
            }
            acc += cw;
            i = next;
        }
        self.end()
    }

    /// Whether a visual line may start with this fragment.
    pub(crate) fn allow_break_before(&self, text: &[u8]) -> bool {
        if let Some(content) = &self.content {
            return content.allow_break_before();
        }
        !never_break_before(text, self.ofs)
    }

    /// Whether a visual line may end after this fragment.
    pub(crate) fn allow_break_after(&self, text: &[u8]) -> bool {
        if let Some(content) = &self.content {
            return content.allow_break_after();
        }
        if self.len == 0 {
            return false;
        }
        let mut last = self.end();
        utf8::move_dec(text, &mut last);
        !never_break_after(text, last.max(self.ofs))
    }
}

/// Characters that terminate a word run and become 1-byte fragments.
pub(crate) fn is_word_break_char(cp: u32) -> bool {
    if matches!(cp, 0x09 | 0x0A | 0x0D | 0x20) {
        return true;
    }
    match u8::try_from(cp) {
        Ok(b) => b != b'_' && b.is_ascii_punctuation(),
        Err(_) => false,
    }
}

fn is_quote(b: u8) -> bool {
    b == b'"' || b == b'\''
}

/// Check if the quote at `pos` is the first quote in its space-delimited run.
fn is_first_quote_in_run(text: &[u8], pos: usize) -> bool {
    let mut i = pos;
    while i > 0 {
        i -= 1;
        match text[i] {
            b' ' | b'\t' | b'\r' | b'\n' => return true,
            b if is_quote(b) => return false,
            _ => {}
        }
    }
    true
}

/// Check if the quote at `pos` is the last quote in its space-delimited run.
fn is_last_quote_in_run(text: &[u8], pos: usize) -> bool {
    let mut i = pos + 1;
    while i < text.len() {
        match text[i] {
            b' ' | b'\t' | b'\r' | b'\n' => return true,
            b if is_quote(b) => return false,
            _ => {}
        }
        i += 1;
    }
    true
}

/// Breaking is disallowed immediately before these characters, so trailing
/// punctuation clings to the word it follows.
fn never_break_before(text: &[u8], pos: usize) -> bool {
    match text.get(pos) {
        Some(
            b'\n' | b'\r' | b' ' | b'-' | b'.' | b',' | b':' | b';' | b'!' | b'?' | b')' | b']'
            | b'}' | b'>',
        ) => true,
        Some(&b) if is_quote(b) => is_first_quote_in_run(text, pos),
        _ => false,
    }
}

/// Breaking is disallowed immediately after these characters, so opening
/// delimiters cling to the word they precede.
fn never_break_after(text: &[u8], pos: usize) -> bool {
    match text.get(pos) {
        Some(b'(' | b'[' | b'{' | b'<' | b'@' | b'$') => true,
        Some(&b) if is_quote(b) => is_last_quote_in_run(text, pos),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::test_metrics::FixedMetrics;
    use crate::{ContentFactory, NoContent, TextAlign};

    fn env<'a>(metrics: &'a FixedMetrics, factory: &'a NoContent) -> LayoutEnv<'a> {
        LayoutEnv {
            metrics,
            factory,
            width: 200,
            wrapping: true,
            password: false,
            align: TextAlign::Left,
        }
    }

    #[test]
    fn test_classification() {
        let text = b"ab\t\r\nx";
        let word = TextFragment::new(0, 2, None);
        let tab = TextFragment::new(2, 1, None);
        let brk = TextFragment::new(3, 2, None);
        assert!(!word.is_break(text) && !word.is_tab(text));
        assert!(tab.is_tab(text));
        assert!(brk.is_break(text));
    }

    #[test]
    fn test_width_and_char_x() {
        let m = FixedMetrics::new();
        let f = NoContent;
        let env = env(&m, &f);
        let text = b"hello";
        let frag = TextFragment::new(0, 5, None);
        assert_eq!(frag.width(text, &env), 40);
        assert_eq!(frag.char_x(text, &env, 0), 0);
        assert_eq!(frag.char_x(text, &env, 3), 24);
    }

    #[test]
    fn test_password_width_counts_chars_not_bytes() {
        let m = FixedMetrics::new();
        let fac = NoContent;
        let mut e = env(&m, &fac);
        e.password = true;
        let text = "é€".as_bytes(); // 5 bytes, 2 chars
        let frag = TextFragment::new(0, 5, None);
        assert_eq!(frag.width(text, &e), 16);
    }

    #[test]
    fn test_char_ofs_midpoint_snap() {
        let m = FixedMetrics::new();
        let f = NoContent;
        let env = env(&m, &f);
        let text = b"abcd";
        let frag = TextFragment::new(0, 4, None);
        // advance is 8: x=3 is before the midpoint of 'a', x=5 is past it.
        assert_eq!(frag.char_ofs_at_x(text, &env, 3), 0);
        assert_eq!(frag.char_ofs_at_x(text, &env, 5), 1);
        assert_eq!(frag.char_ofs_at_x(text, &env, 100), 4);
    }

    #[test]
    fn test_break_rules_punctuation() {
        let text = b"word. (next";
        // '.' at 4: no break before it.
        let dot = TextFragment::new(4, 1, None);
        assert!(!dot.allow_break_before(text));
        // '(' at 6: no break after it.
        let paren = TextFragment::new(6, 1, None);
        assert!(paren.allow_break_before(text));
        assert!(!paren.allow_break_after(text));
        // word fragment: breaks fine on both sides.
        let word = TextFragment::new(0, 4, None);
        assert!(word.allow_break_before(text));
        assert!(word.allow_break_after(text));
    }

    #[test]
    fn test_quote_run_rules() {
        let text = br#"say "hi" now"#;
        // First quote of the run at 4: breaking before is disallowed.
        let open = TextFragment::new(4, 1, None);
        assert!(!open.allow_break_before(text));
        assert!(open.allow_break_after(text));
        // Last quote of the run at 7: breaking after is disallowed.
        let close = TextFragment::new(7, 1, None);
        assert!(close.allow_break_before(text));
        assert!(!close.allow_break_after(text));
    }

    #[test]
    fn test_word_break_chars() {
        assert!(is_word_break_char(u32::from(b' ')));
        assert!(is_word_break_char(u32::from(b'\t')));
        assert!(is_word_break_char(u32::from(b'.')));
        assert!(!is_word_break_char(u32::from(b'_')));
        assert!(!is_word_break_char(u32::from(b'a')));
        assert!(!is_word_break_char(0xE9)); // é
    }

    #[test]
    fn test_factory_match_is_not_text() {
        use crate::StyledContentFactory;
        let f = StyledContentFactory;
        assert!(f.match_content(b"<u>rest") > 0);
    }
}
