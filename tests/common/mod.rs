#![allow(clippy::nursery)] // Test infra prioritizes clarity over pedantry
#![allow(clippy::pedantic)] // Test infra prioritizes clarity over pedantry
#![allow(dead_code)] // Not every helper is used by every test binary

use std::cell::RefCell;
use std::rc::Rc;

use textweave::{Clipboard, DocumentHost, FontDescription, FontMetrics, Rect, Rgba};
use unicode_width::UnicodeWidthStr;

pub const ADVANCE: i32 = 8;
pub const LINE_HEIGHT: i32 = 16;
pub const ASCENT: i32 = 12;

/// Fixed-cell metrics: every display column is `ADVANCE` pixels, so wide
/// glyphs measure two cells like they would in a terminal grid. Malformed
/// bytes count one cell each.
pub struct FixedMetrics;

impl FontMetrics for FixedMetrics {
    fn height(&self) -> i32 {
        LINE_HEIGHT
    }

    fn ascent(&self) -> i32 {
        ASCENT
    }

    fn string_width(&self, bytes: &[u8]) -> i32 {
        let mut cells = 0usize;
        let mut rest = bytes;
        while !rest.is_empty() {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    cells += s.width();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    cells += std::str::from_utf8(&rest[..valid]).unwrap().width();
                    cells += 1;
                    rest = &rest[valid + 1..];
                }
            }
        }
        cells as i32 * ADVANCE
    }
}

/// Everything a document tells its host, in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    Invalidate(Rect),
    DrawString {
        x: i32,
        y: i32,
        color: Rgba,
        bytes: Vec<u8>,
    },
    DrawRectFill(Rect, Rgba),
    SelectionBg(Rect),
    Caret(Rect),
    Scroll(i32, i32),
    UpdateScrollbars,
    BlinkStart,
    BlinkStop,
    Change,
    Break,
}

/// Host that records every call for later assertions. Clones share the
/// event log, so a copy can stay outside the document.
#[derive(Clone, Default)]
pub struct RecordingHost {
    events: Rc<RefCell<Vec<HostEvent>>>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<HostEvent> {
        std::mem::take(&mut self.events.borrow_mut())
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&HostEvent) -> bool) -> usize {
        self.events.borrow().iter().filter(|e| pred(e)).count()
    }

    pub fn drawn_strings(&self) -> Vec<Vec<u8>> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                HostEvent::DrawString { bytes, .. } => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DocumentHost for RecordingHost {
    fn invalidate(&mut self, rect: Rect) {
        self.events.borrow_mut().push(HostEvent::Invalidate(rect));
    }

    fn draw_string(&mut self, x: i32, y: i32, _font: &FontDescription, color: Rgba, bytes: &[u8]) {
        self.events.borrow_mut().push(HostEvent::DrawString {
            x,
            y,
            color,
            bytes: bytes.to_vec(),
        });
    }

    fn draw_rect_fill(&mut self, rect: Rect, color: Rgba) {
        self.events
            .borrow_mut()
            .push(HostEvent::DrawRectFill(rect, color));
    }

    fn draw_selection_bg(&mut self, rect: Rect) {
        self.events.borrow_mut().push(HostEvent::SelectionBg(rect));
    }

    fn draw_caret(&mut self, rect: Rect) {
        self.events.borrow_mut().push(HostEvent::Caret(rect));
    }

    fn scroll(&mut self, dx: i32, dy: i32) {
        self.events.borrow_mut().push(HostEvent::Scroll(dx, dy));
    }

    fn update_scrollbars(&mut self) {
        self.events.borrow_mut().push(HostEvent::UpdateScrollbars);
    }

    fn caret_blink_start(&mut self) {
        self.events.borrow_mut().push(HostEvent::BlinkStart);
    }

    fn caret_blink_stop(&mut self) {
        self.events.borrow_mut().push(HostEvent::BlinkStop);
    }

    fn on_change(&mut self) {
        self.events.borrow_mut().push(HostEvent::Change);
    }

    fn on_break(&mut self) {
        self.events.borrow_mut().push(HostEvent::Break);
    }
}

/// Clipboard whose storage is shared between clones, standing in for the
/// platform clipboard two documents would both see.
#[derive(Clone, Default)]
pub struct SharedClipboard {
    text: Rc<RefCell<Option<String>>>,
}

impl SharedClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn peek(&self) -> Option<String> {
        self.text.borrow().clone()
    }
}

impl Clipboard for SharedClipboard {
    fn has_text(&self) -> bool {
        self.text.borrow().as_ref().is_some_and(|t| !t.is_empty())
    }

    fn get_text(&mut self) -> Option<String> {
        self.text.borrow().clone()
    }

    fn set_text(&mut self, text: &str) {
        *self.text.borrow_mut() = Some(text.to_string());
    }
}
