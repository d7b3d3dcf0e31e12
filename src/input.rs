//! Key and pointer input types for the document's input surface.

use bitflags::bitflags;

bitflags! {
    /// Keyboard modifier flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        /// Shift key.
        const SHIFT = 0b0000_0001;
        /// Alt/Option key.
        const ALT = 0b0000_0010;
        /// Control key.
        const CTRL = 0b0000_0100;
        /// Super/Meta/Command key.
        const SUPER = 0b0000_1000;
    }
}

/// A key press delivered to [`TextDocument::key_down`].
///
/// [`TextDocument::key_down`]: crate::TextDocument::key_down
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    /// A character key (includes space).
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Tab key.
    Tab,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Left arrow key.
    Left,
    /// Right arrow key.
    Right,
    /// Up arrow key.
    Up,
    /// Down arrow key.
    Down,
    /// Home key.
    Home,
    /// End key.
    End,
    /// Page Up key.
    PageUp,
    /// Page Down key.
    PageDown,
}

impl Key {
    /// Check if this is a navigation key (arrows, home, end, page up/down).
    #[must_use]
    pub fn is_navigation(&self) -> bool {
        matches!(
            self,
            Self::Left
                | Self::Right
                | Self::Up
                | Self::Down
                | Self::Home
                | Self::End
                | Self::PageUp
                | Self::PageDown
        )
    }

    /// Get the character if this is a character key.
    #[must_use]
    pub fn char(&self) -> Option<char> {
        match self {
            Self::Char(c) => Some(*c),
            _ => None,
        }
    }
}

/// Pointer button for mouse events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary (left) button.
    #[default]
    Left,
    /// Middle button.
    Middle,
    /// Secondary (right) button.
    Right,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_predicate() {
        assert!(Key::Left.is_navigation());
        assert!(Key::PageDown.is_navigation());
        assert!(!Key::Char('a').is_navigation());
        assert!(!Key::Backspace.is_navigation());
    }

    #[test]
    fn test_char_accessor() {
        assert_eq!(Key::Char('x').char(), Some('x'));
        assert_eq!(Key::Enter.char(), None);
    }

    #[test]
    fn test_modifier_combination() {
        let mods = Modifiers::CTRL | Modifiers::SHIFT;
        assert!(mods.contains(Modifiers::CTRL));
        assert!(!mods.contains(Modifiers::ALT));
    }
}
