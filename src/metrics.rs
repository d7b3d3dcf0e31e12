//! Font metrics collaborator interface.
//!
//! The document never rasterizes glyphs; all measurement is delegated to a
//! [`FontMetrics`] implementation supplied by the host. Widths are queried
//! on raw bytes so malformed UTF-8 measures like its replacement glyphs
//! instead of failing.

/// Description of the font a document (or styled run) is set in.
///
/// Opaque to this crate beyond equality: the host maps it to an actual
/// typeface when resolving a [`FontMetrics`] and when drawing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct FontDescription {
    /// Host-defined face identifier.
    pub face_id: u32,
    /// Size in pixels.
    pub size: u32,
}

impl FontDescription {
    /// Create a new description.
    #[must_use]
    pub fn new(face_id: u32, size: u32) -> Self {
        Self { face_id, size }
    }
}

/// Measurement queries for one resolved font.
///
/// Implementations are pure from the document's point of view: the same
/// query must return the same answer between two reformat calls.
pub trait FontMetrics {
    /// Total line height in pixels.
    fn height(&self) -> i32;

    /// Distance from the top of the line box to the baseline.
    fn ascent(&self) -> i32;

    /// Pixel advance of a byte string.
    fn string_width(&self, bytes: &[u8]) -> i32;
}

#[cfg(test)]
pub(crate) mod test_metrics {
    use super::FontMetrics;

    /// Fixed-advance font for unit tests: every character is `advance`
    /// pixels wide, lines are `height` tall with a 3/4 ascent.
    pub struct FixedMetrics {
        pub advance: i32,
        pub line_height: i32,
    }

    impl FixedMetrics {
        pub fn new() -> Self {
            Self {
                advance: 8,
                line_height: 16,
            }
        }
    }

    impl FontMetrics for FixedMetrics {
        fn height(&self) -> i32 {
            self.line_height
        }

        fn ascent(&self) -> i32 {
            self.line_height * 3 / 4
        }

        fn string_width(&self, bytes: &[u8]) -> i32 {
            let n = crate::utf8::count_chars(bytes, 0, bytes.len());
            i32::try_from(n).unwrap_or(i32::MAX) * self.advance
        }
    }
}
