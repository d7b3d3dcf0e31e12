//! `textweave` - Retained-mode rich text editing core
//!
//! An embeddable text editing and layout engine: documents are kept as a
//! list of paragraph blocks split into breakable fragments, with incremental
//! reflow, caret and selection tracking, a coalescing undo history, and
//! inline styled content. All measurement, painting, and clipboard access
//! goes through host-supplied collaborator traits, so the engine runs
//! anywhere from a GUI widget to a headless test.
//!
//! Text is stored as raw bytes rather than `String`: editors get handed
//! malformed UTF-8 and must keep it byte-exact, degrade its display to
//! replacement glyphs, and never let stray bytes masquerade as line breaks.
//!
//! # Example
//!
//! ```
//! use textweave::{Key, Modifiers, TextDocument};
//!
//! # struct Fixed;
//! # impl textweave::FontMetrics for Fixed {
//! #     fn height(&self) -> i32 { 16 }
//! #     fn ascent(&self) -> i32 { 12 }
//! #     fn string_width(&self, bytes: &[u8]) -> i32 { bytes.len() as i32 * 8 }
//! # }
//! let mut doc = TextDocument::new(Box::new(Fixed));
//! doc.set_multiline(true);
//! doc.set_layout_size(640, 480);
//! doc.insert_text("hello world");
//! doc.key_down(Key::Char('a'), Modifiers::CTRL);
//! assert_eq!(doc.selection_text(), "hello world");
//! ```

// Crate-level lint configuration
#![allow(clippy::module_name_repetitions)] // TextDocument, TextBlock etc live in document::
#![allow(clippy::missing_panics_doc)] // Docs WIP
#![allow(clippy::missing_const_for_fn)] // Many functions could be const, not critical
#![allow(clippy::doc_markdown)] // Allow technical names without backticks
#![allow(clippy::struct_excessive_bools)] // Document config is a set of flags
#![allow(clippy::collapsible_if)] // Sometimes nested ifs are clearer
#![allow(clippy::collapsible_else_if)] // Symmetric branches read better
#![allow(clippy::items_after_statements)] // Common pattern in tests
#![allow(clippy::range_plus_one)] // Explicit half-open ranges at splice sites
#![allow(clippy::too_many_lines)] // Layout and paint loops stay in one piece

pub mod color;
pub mod content;
pub mod document;
pub mod geometry;
pub mod host;
pub mod input;
pub mod metrics;
pub mod utf8;

// Re-export core types at crate root
pub use color::Rgba;
pub use content::{
    ContentFactory, EmbeddedContent, FragmentContent, NoContent, StyledContentFactory,
};
pub use document::{
    BreakStyle, Caret, TextAlign, TextBlock, TextDocument, TextFragment, TextOffset,
    TextSelection, UndoEvent, UndoStack,
};
pub use geometry::{Point, Rect};
pub use host::{Clipboard, DocumentHost, MemClipboard, NullHost};
pub use input::{Key, Modifiers, MouseButton};
pub use metrics::{FontDescription, FontMetrics};
