//! Greedy word-wrap and paragraph indentation.
//!
//! Output is a flat sequence of [`LineRecord`]s: wrapped text lines and
//! paragraph-break markers for blank source lines. Words are never split; a
//! word wider than the text area sits alone on its own (overflowing) line.

use serde::{Deserialize, Serialize};

use crate::layout::units::Geometry;

/// Approximate width of one space character used to turn an indent in
/// millimeters into a run of spaces.
const INDENT_SPACE_WIDTH_MM: f64 = 2.0;

/// Upper bound on the indent run, whatever the page size.
const MAX_INDENT_SPACES: usize = 512;

/// One row of the paginated line model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum LineRecord {
    /// A wrapped line of text; never empty.
    Text(String),
    /// Gap between paragraphs, rendered as `paragraph_spacing_mm`.
    ParagraphBreak,
}

impl LineRecord {
    pub fn as_str(&self) -> &str {
        match self {
            LineRecord::Text(line) => line,
            LineRecord::ParagraphBreak => "",
        }
    }
}

/// Word-wrap engine bound to one set of page/text settings.
#[derive(Debug, Clone, Copy)]
pub struct TextLayout<'a> {
    geometry: Geometry<'a>,
}

impl<'a> TextLayout<'a> {
    pub fn new(geometry: Geometry<'a>) -> Self {
        Self { geometry }
    }

    /// Wraps every paragraph of `text` at `max_width_mm`. Pure; calling it twice
    /// with the same inputs yields the same records.
    pub fn wrap(&self, text: &str, max_width_mm: f64) -> Vec<LineRecord> {
        self.wrap_paragraphs(text, max_width_mm)
            .into_iter()
            .flatten()
            .collect()
    }

    /// Wraps and then indents the first line of every paragraph by
    /// `indent_first_line_mm`. This is the model pagination consumes.
    pub fn lay_out(&self, text: &str, max_width_mm: f64) -> Vec<LineRecord> {
        self.wrap_paragraphs(text, max_width_mm)
            .into_iter()
            .flat_map(|lines| self.format_paragraph(lines, true))
            .collect()
    }

    /// Prefixes the first line with `indent_mm / 2` spaces when `is_first` is
    /// set and an indent is configured. `is_first` is false for a paragraph
    /// fragment that continues an earlier one. The indent is capped at the
    /// text-area width.
    pub fn format_paragraph(&self, mut lines: Vec<LineRecord>, is_first: bool) -> Vec<LineRecord> {
        let indent_mm = self.geometry.text().indent_first_line_mm;
        if !is_first || indent_mm <= 0.0 {
            return lines;
        }

        let area_mm = self.geometry.text_area_bounds_mm().width().max(0.0);
        let spaces =
            ((indent_mm.min(area_mm) / INDENT_SPACE_WIDTH_MM) as usize).min(MAX_INDENT_SPACES);
        if let Some(LineRecord::Text(first)) = lines.first_mut() {
            first.insert_str(0, &" ".repeat(spaces));
        }
        lines
    }

    /// Groups records by source paragraph so indentation can find each
    /// paragraph's first line.
    fn wrap_paragraphs(&self, text: &str, max_width_mm: f64) -> Vec<Vec<LineRecord>> {
        text.split('\n')
            .map(|paragraph| paragraph.strip_suffix('\r').unwrap_or(paragraph))
            .map(|paragraph| {
                if paragraph.trim().is_empty() {
                    vec![LineRecord::ParagraphBreak]
                } else {
                    self.wrap_paragraph(paragraph, max_width_mm)
                }
            })
            .collect()
    }

    /// Same measure as [`Geometry::line_width_mm`], kept as a running
    /// character count so each word is measured once.
    fn wrap_paragraph(&self, paragraph: &str, max_width_mm: f64) -> Vec<LineRecord> {
        let char_width_mm = self.geometry.char_width_mm(self.geometry.adaptive_font_size_pt());
        let mut lines = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for word in paragraph.split_whitespace() {
            let word_chars = word.chars().count();
            if current.is_empty() {
                current.push_str(word);
                current_chars = word_chars;
                continue;
            }

            let candidate_chars = current_chars + 1 + word_chars;
            if candidate_chars as f64 * char_width_mm <= max_width_mm {
                current.push(' ');
                current.push_str(word);
                current_chars = candidate_chars;
            } else {
                lines.push(LineRecord::Text(std::mem::take(&mut current)));
                current.push_str(word);
                current_chars = word_chars;
            }
        }

        if !current.is_empty() {
            lines.push(LineRecord::Text(current));
        }
        lines
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
