//! Host collaborator interfaces: painting, notifications, clipboard.
//!
//! The document drives all visual output and host feedback through
//! [`DocumentHost`]. Every method has a no-op default so tests and headless
//! use can pass a unit struct. Calls are synchronous and fire-and-forget;
//! only [`DocumentHost::on_enter`] returns a value (whether the host
//! consumed the enter key).

use crate::color::Rgba;
use crate::geometry::Rect;
use crate::metrics::FontDescription;

/// Listener and paint surface supplied by the owning widget.
pub trait DocumentHost {
    /// A document region needs repainting (document coordinates).
    fn invalidate(&mut self, rect: Rect) {
        let _ = rect;
    }

    /// Draw a run of text at a baseline-relative position.
    fn draw_string(&mut self, x: i32, y: i32, font: &FontDescription, color: Rgba, bytes: &[u8]) {
        let _ = (x, y, font, color, bytes);
    }

    /// Stroke a rectangle.
    fn draw_rect(&mut self, rect: Rect, color: Rgba) {
        let _ = (rect, color);
    }

    /// Fill a rectangle.
    fn draw_rect_fill(&mut self, rect: Rect, color: Rgba) {
        let _ = (rect, color);
    }

    /// Fill the selection background behind plain text.
    fn draw_selection_bg(&mut self, rect: Rect) {
        let _ = rect;
    }

    /// Draw the caret.
    fn draw_caret(&mut self, rect: Rect) {
        let _ = rect;
    }

    /// The scroll offset changed by the given delta.
    fn scroll(&mut self, dx: i32, dy: i32) {
        let _ = (dx, dy);
    }

    /// Content or layout size changed; scrollbars should be refreshed.
    fn update_scrollbars(&mut self) {}

    /// Start the caret blink timer.
    fn caret_blink_start(&mut self) {}

    /// Stop the caret blink timer.
    fn caret_blink_stop(&mut self) {}

    /// Document content changed through an editing operation.
    fn on_change(&mut self) {}

    /// Enter pressed. Return `true` to consume it (suppresses break
    /// insertion in multiline documents).
    fn on_enter(&mut self) -> bool {
        false
    }

    /// A line break was inserted.
    fn on_break(&mut self) {}
}

/// A host that ignores everything. Useful for headless editing and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullHost;

impl DocumentHost for NullHost {}

/// Platform clipboard access.
pub trait Clipboard {
    /// Check whether text is available.
    fn has_text(&self) -> bool;

    /// Get the clipboard text, if any.
    fn get_text(&mut self) -> Option<String>;

    /// Replace the clipboard text.
    fn set_text(&mut self, text: &str);
}

/// In-memory clipboard. The default for tests and headless hosts.
#[derive(Clone, Debug, Default)]
pub struct MemClipboard {
    text: Option<String>,
}

impl Clipboard for MemClipboard {
    fn has_text(&self) -> bool {
        self.text.as_ref().is_some_and(|t| !t.is_empty())
    }

    fn get_text(&mut self) -> Option<String> {
        self.text.clone()
    }

    fn set_text(&mut self, text: &str) {
        self.text = Some(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_clipboard() {
        let mut cb = MemClipboard::default();
        assert!(!cb.has_text());
        cb.set_text("hello");
        assert!(cb.has_text());
        assert_eq!(cb.get_text().as_deref(), Some("hello"));
        cb.set_text("");
        assert!(!cb.has_text());
    }

    #[test]
    fn test_null_host_defaults() {
        let mut host = NullHost;
        host.invalidate(Rect::new(0, 0, 10, 10));
        host.update_scrollbars();
        assert!(!host.on_enter());
    }
}
