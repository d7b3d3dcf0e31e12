//! Non-text fragment content and the pluggable content factory.
//!
//! A fragment normally covers a run of text, but a [`ContentFactory`] may
//! claim a span of source bytes as one embedded object instead: a horizontal
//! rule, a style marker (underline / color push / style pop), or an
//! arbitrary host-supplied embed. The built-in kinds form a closed variant;
//! hosts extend through [`FragmentContent::Embed`].

use crate::color::Rgba;
use crate::geometry::Rect;
use crate::host::DocumentHost;
use crate::metrics::FontMetrics;
use std::fmt;

/// Host-supplied embedded content occupying one fragment slot.
pub trait EmbeddedContent {
    /// Pixel width given the resolved font and the block's layout width.
    fn width(&self, metrics: &dyn FontMetrics, layout_width: i32) -> i32;

    /// Pixel height.
    fn height(&self, metrics: &dyn FontMetrics) -> i32;

    /// Baseline from the top of the content box. Defaults to the bottom.
    fn baseline(&self, metrics: &dyn FontMetrics) -> i32 {
        self.height(metrics)
    }

    /// Paint into the given document-space rectangle. `selected` reports
    /// whether the fragment lies in the active selection; the document draws
    /// no selection background behind embeds, so content that wants a
    /// selected look renders it here.
    fn paint(&self, host: &mut dyn DocumentHost, rect: Rect, color: Rgba, selected: bool) {
        let _ = (host, rect, color, selected);
    }

    /// Whether a line may break before this content.
    fn allow_break_before(&self) -> bool {
        true
    }

    /// Whether a line may break after this content.
    fn allow_break_after(&self) -> bool {
        true
    }
}

/// Content attached to a non-text fragment.
pub enum FragmentContent {
    /// A horizontal rule spanning a percentage of the layout width.
    HorizontalRule {
        /// Width as a percentage of the available layout width.
        width_percent: u32,
        /// Rule thickness in pixels.
        height: i32,
    },
    /// Style marker: start underlining following text.
    Underline,
    /// Style marker: push a text color.
    Color(Rgba),
    /// Style marker: pop the innermost color/underline.
    StylePop,
    /// Host-supplied embed.
    Embed(Box<dyn EmbeddedContent>),
}

impl FragmentContent {
    /// Pixel width of the content.
    #[must_use]
    pub fn width(&self, metrics: &dyn FontMetrics, layout_width: i32) -> i32 {
        match self {
            Self::HorizontalRule { width_percent, .. } => {
                let pct = i32::try_from(*width_percent).unwrap_or(100);
                (layout_width.max(0) * pct) / 100
            }
            Self::Underline | Self::Color(_) | Self::StylePop => 0,
            Self::Embed(embed) => embed.width(metrics, layout_width),
        }
    }

    /// Pixel height of the content.
    #[must_use]
    pub fn height(&self, metrics: &dyn FontMetrics) -> i32 {
        match self {
            Self::HorizontalRule { height, .. } => *height,
            // Style markers are invisible but keep the line's font height so
            // a line of markers alone doesn't collapse.
            Self::Underline | Self::Color(_) | Self::StylePop => metrics.height(),
            Self::Embed(embed) => embed.height(metrics),
        }
    }

    /// Baseline of the content from its top edge.
    #[must_use]
    pub fn baseline(&self, metrics: &dyn FontMetrics) -> i32 {
        match self {
            Self::HorizontalRule { height, .. } => *height,
            Self::Underline | Self::Color(_) | Self::StylePop => metrics.ascent(),
            Self::Embed(embed) => embed.baseline(metrics),
        }
    }

    /// Whether a line may break before this content.
    #[must_use]
    pub fn allow_break_before(&self) -> bool {
        match self {
            Self::Embed(embed) => embed.allow_break_before(),
            _ => true,
        }
    }

    /// Whether a line may break after this content.
    #[must_use]
    pub fn allow_break_after(&self) -> bool {
        match self {
            Self::Embed(embed) => embed.allow_break_after(),
            _ => true,
        }
    }

    /// Whether this content only changes paint state (zero width).
    #[must_use]
    pub fn is_style_marker(&self) -> bool {
        matches!(self, Self::Underline | Self::Color(_) | Self::StylePop)
    }
}

impl fmt::Debug for FragmentContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HorizontalRule {
                width_percent,
                height,
            } => write!(f, "HorizontalRule({width_percent}%, {height}px)"),
            Self::Underline => write!(f, "Underline"),
            Self::Color(c) => write!(f, "Color({c:?})"),
            Self::StylePop => write!(f, "StylePop"),
            Self::Embed(_) => write!(f, "Embed(..)"),
        }
    }
}

/// Matches spans of source text that become embedded content.
pub trait ContentFactory {
    /// If `text` starts with content this factory claims, return the number
    /// of bytes claimed; otherwise 0.
    fn match_content(&self, text: &[u8]) -> usize;

    /// Create the content object for a span previously claimed by
    /// [`match_content`](Self::match_content).
    fn create_content(&self, text: &[u8]) -> Option<FragmentContent>;
}

/// Factory that matches nothing. The default for unstyled documents.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoContent;

impl ContentFactory for NoContent {
    fn match_content(&self, _text: &[u8]) -> usize {
        0
    }

    fn create_content(&self, _text: &[u8]) -> Option<FragmentContent> {
        None
    }
}

/// Default styled-text factory.
///
/// Recognizes a small inline tag vocabulary:
///
/// - `<color #rrggbb>` (also `#rgb` / `#rrggbbaa`) pushes a text color
/// - `<u>` starts underlining
/// - `</>` pops the innermost color/underline
/// - `<hr>` becomes a full-width horizontal rule
#[derive(Clone, Copy, Debug, Default)]
pub struct StyledContentFactory;

impl StyledContentFactory {
    fn match_tag(text: &[u8]) -> Option<(usize, FragmentContent)> {
        if text.starts_with(b"<u>") {
            return Some((3, FragmentContent::Underline));
        }
        if text.starts_with(b"</>") {
            return Some((3, FragmentContent::StylePop));
        }
        if text.starts_with(b"<hr>") {
            return Some((
                4,
                FragmentContent::HorizontalRule {
                    width_percent: 100,
                    height: 2,
                },
            ));
        }
        if let Some(rest) = text.strip_prefix(b"<color ") {
            let end = rest.iter().position(|&b| b == b'>')?;
            let arg = std::str::from_utf8(&rest[..end]).ok()?;
            let color = Rgba::from_hex(arg.trim())?;
            return Some((7 + end + 1, FragmentContent::Color(color)));
        }
        None
    }
}

impl ContentFactory for StyledContentFactory {
    fn match_content(&self, text: &[u8]) -> usize {
        Self::match_tag(text).map_or(0, |(len, _)| len)
    }

    fn create_content(&self, text: &[u8]) -> Option<FragmentContent> {
        Self::match_tag(text).map(|(_, content)| content)
    }
}
