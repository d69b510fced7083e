//! Vector glyph primitives.
//!
//! Characters are not drawn from font outlines. Each one maps to a small fixed
//! stroke set sized to 80% of its cell; adding a new shape means adding a
//! variant here, nothing in pagination or emission changes.

/// Fraction of the character cell a glyph occupies on each axis.
const GLYPH_SCALE: f64 = 0.8;
/// Length of the fallback dot stroke, in mm.
const DOT_LENGTH_MM: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphPrimitive {
    /// Closed rectangle outline: letters, digits, and `. , ! ? ; :`.
    Box,
    /// Single stroke at mid-height: `-` and `_`.
    HorizontalBar,
    /// Single stroke at mid-width: `|`.
    VerticalBar,
    /// Short stroke at the cell center for everything else.
    Dot,
}

impl GlyphPrimitive {
    pub fn for_char(c: char) -> Self {
        match c {
            c if c.is_alphanumeric() => GlyphPrimitive::Box,
            '.' | ',' | '!' | '?' | ';' | ':' => GlyphPrimitive::Box,
            '-' | '_' => GlyphPrimitive::HorizontalBar,
            '|' => GlyphPrimitive::VerticalBar,
            _ => GlyphPrimitive::Dot,
        }
    }

    /// Draw-move targets, in order, for a glyph whose cell starts at `(x, y)`
    /// and measures `cell_width × cell_height` mm.
    pub fn strokes(&self, x: f64, y: f64, cell_width: f64, cell_height: f64) -> Vec<(f64, f64)> {
        let w = cell_width * GLYPH_SCALE;
        let h = cell_height * GLYPH_SCALE;

        match self {
            GlyphPrimitive::Box => vec![
                (x, y),
                (x + w, y),
                (x + w, y + h),
                (x, y + h),
                (x, y),
            ],
            GlyphPrimitive::HorizontalBar => vec![(x, y + h / 2.0), (x + w, y + h / 2.0)],
            GlyphPrimitive::VerticalBar => vec![(x + w / 2.0, y), (x + w / 2.0, y + h)],
            GlyphPrimitive::Dot => vec![
                (x + w / 2.0, y + h / 2.0),
                (x + w / 2.0 + DOT_LENGTH_MM, y + h / 2.0),
            ],
        }
    }
}
