//! Two-stack undo history with insert coalescing.

use crate::utf8;

/// One recorded edit: an insertion or removal of `bytes` at a global byte
/// offset. Undoing plays the event in reverse; redoing replays it.
#[derive(Clone, Debug)]
pub struct UndoEvent {
    /// Global byte offset of the edit.
    pub gofs: usize,
    /// The bytes inserted or removed.
    pub bytes: Vec<u8>,
    /// `true` for an insertion, `false` for a removal.
    pub insert: bool,
}

/// Edit history for a document.
///
/// New edits clear the redo stack. Single-character insertions coalesce
/// into the preceding insert event when they are byte-contiguous and the
/// word/space character class matches, so undo steps back over typed words
/// rather than single keystrokes.
#[derive(Debug, Default)]
pub struct UndoStack {
    undos: Vec<UndoEvent>,
    redos: Vec<UndoEvent>,
    applying: bool,
}

impl UndoStack {
    /// Check whether an undo step is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undos.is_empty()
    }

    /// Check whether a redo step is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redos.is_empty()
    }

    /// Number of undo events currently recorded.
    #[must_use]
    pub fn undo_count(&self) -> usize {
        self.undos.len()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undos.clear();
        self.redos.clear();
    }

    pub(crate) fn applying(&self) -> bool {
        self.applying
    }

    pub(crate) fn set_applying(&mut self, applying: bool) {
        self.applying = applying;
    }

    /// Record an edit. No-op while an undo/redo is being applied.
    pub(crate) fn commit(&mut self, gofs: usize, bytes: Vec<u8>, insert: bool) {
        if self.applying || bytes.is_empty() {
            return;
        }
        self.redos.clear();
        if insert && self.try_coalesce(gofs, &bytes) {
            return;
        }
        self.undos.push(UndoEvent {
            gofs,
            bytes,
            insert,
        });
    }

    /// Merge a single-character insertion into the last event when it
    /// extends that event contiguously: a space extends any insert with no
    /// line break in it, a word character extends one with no space or line
    /// break. A word followed by its trailing spaces is one undo step; the
    /// next word starts a new one.
    fn try_coalesce(&mut self, gofs: usize, bytes: &[u8]) -> bool {
        if utf8::count_chars(bytes, 0, bytes.len()) != 1 {
            return false;
        }
        let Some(last) = self.undos.last_mut() else {
            return false;
        };
        if !last.insert || last.gofs + last.bytes.len() != gofs {
            return false;
        }
        let is_space = bytes[0] == b' ';
        let mergeable = if is_space {
            !last.bytes.iter().any(|&b| matches!(b, b'\r' | b'\n'))
        } else {
            !last
                .bytes
                .iter()
                .any(|&b| matches!(b, b' ' | b'\r' | b'\n'))
        };
        if mergeable {
            last.bytes.extend_from_slice(bytes);
        }
        mergeable
    }

    /// Move the newest undo event to the redo stack and return it.
    pub(crate) fn pop_undo(&mut self) -> Option<UndoEvent> {
        let event = self.undos.pop()?;
        self.redos.push(event.clone());
        Some(event)
    }

    /// Move the newest redo event back to the undo stack and return it.
    pub(crate) fn pop_redo(&mut self) -> Option<UndoEvent> {
        let event = self.redos.pop()?;
        self.undos.push(event.clone());
        Some(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_chars(stack: &mut UndoStack, start: usize, text: &str) {
        let mut gofs = start;
        for c in text.chars() {
            let mut buf = [0_u8; 4];
            let bytes = c.encode_utf8(&mut buf).as_bytes().to_vec();
            let len = bytes.len();
            stack.commit(gofs, bytes, true);
            gofs += len;
        }
    }

    #[test]
    fn test_word_coalescing() {
        let mut stack = UndoStack::default();
        type_chars(&mut stack, 0, "ONE TWO");
        // trailing space stays with its word
        assert_eq!(stack.undo_count(), 2);
        assert_eq!(stack.undos[0].bytes, b"ONE ");
        assert_eq!(stack.undos[1].bytes, b"TWO");
    }

    #[test]
    fn test_space_runs_coalesce() {
        let mut stack = UndoStack::default();
        type_chars(&mut stack, 0, "a   b");
        assert_eq!(stack.undo_count(), 2);
        assert_eq!(stack.undos[0].bytes, b"a   ");
        assert_eq!(stack.undos[1].bytes, b"b");
    }

    #[test]
    fn test_space_never_coalesces_across_a_break() {
        let mut stack = UndoStack::default();
        stack.commit(0, b"\n".to_vec(), true);
        stack.commit(1, b" ".to_vec(), true);
        assert_eq!(stack.undo_count(), 2);
    }

    #[test]
    fn test_non_contiguous_insert_starts_new_event() {
        let mut stack = UndoStack::default();
        stack.commit(0, b"a".to_vec(), true);
        stack.commit(10, b"b".to_vec(), true);
        assert_eq!(stack.undo_count(), 2);
    }

    #[test]
    fn test_removal_never_coalesces() {
        let mut stack = UndoStack::default();
        stack.commit(0, b"a".to_vec(), true);
        stack.commit(0, b"a".to_vec(), false);
        stack.commit(0, b"b".to_vec(), true);
        assert_eq!(stack.undo_count(), 3);
    }

    #[test]
    fn test_multi_char_insert_never_coalesces() {
        let mut stack = UndoStack::default();
        stack.commit(0, b"ab".to_vec(), true);
        stack.commit(2, b"cd".to_vec(), true);
        assert_eq!(stack.undo_count(), 2);
    }

    #[test]
    fn test_new_edit_clears_redo() {
        let mut stack = UndoStack::default();
        stack.commit(0, b"abc".to_vec(), true);
        assert!(stack.pop_undo().is_some());
        assert!(stack.can_redo());
        stack.commit(0, b"x".to_vec(), true);
        assert!(!stack.can_redo());
    }

    #[test]
    fn test_applying_suppresses_recording() {
        let mut stack = UndoStack::default();
        stack.set_applying(true);
        stack.commit(0, b"abc".to_vec(), true);
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut stack = UndoStack::default();
        stack.commit(0, b"abc".to_vec(), true);
        let e = stack.pop_undo().unwrap();
        assert_eq!(e.bytes, b"abc");
        assert!(e.insert);
        let e = stack.pop_redo().unwrap();
        assert_eq!(e.bytes, b"abc");
        assert!(stack.can_undo());
        assert!(!stack.can_redo());
    }
}
