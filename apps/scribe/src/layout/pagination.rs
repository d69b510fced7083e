//! Pagination: splits the wrapped line model into pages under the vertical
//! space left by the margins and the page-number reserve.
//!
//! # Rules
//! - A text line that would cross `available_height` starts a new page, unless
//!   the current page is still empty (an oversize line is never dropped).
//! - A paragraph break that would overflow also starts a new page; the spacing
//!   is not carried over, but the break record still opens the new page.
//! - Empty or whitespace-only text paginates to zero pages.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::units::Geometry;
use crate::layout::wrap::{LineRecord, TextLayout};
use crate::models::settings::DocumentSettings;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// A sealed page: line records in the order they are drawn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub lines: Vec<LineRecord>,
}

impl Page {
    pub fn text_lines(&self) -> impl Iterator<Item = &str> {
        self.lines
            .iter()
            .map(LineRecord::as_str)
            .filter(|line| !line.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStatistics {
    pub characters: usize,
    pub words: usize,
    /// Source lines: newline count + 1.
    pub lines: usize,
    pub pages: usize,
    pub avg_words_per_page: f64,
}

/// A word that cannot fit on a line at the current font size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlongWord {
    pub word: String,
    pub width_mm: f64,
    pub max_width_mm: f64,
}

/// Advisory fit check. Pagination and emission still run when `fits` is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitReport {
    pub fits: bool,
    pub page_count: usize,
    pub message: String,
    pub overlong_word: Option<OverlongWord>,
}

// ────────────────────────────────────────────────────────────────────────────
// Page manager
// ────────────────────────────────────────────────────────────────────────────

/// Accumulating / flushed state of the single pagination pass.
struct PageBuilder {
    pages: Vec<Page>,
    current: Vec<LineRecord>,
    current_y: f64,
}

impl PageBuilder {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Vec::new(),
            current_y: 0.0,
        }
    }

    fn seal(&mut self) {
        self.pages.push(Page {
            lines: std::mem::take(&mut self.current),
        });
        self.current_y = 0.0;
    }

    fn finish(mut self) -> Vec<Page> {
        if !self.current.is_empty() {
            self.seal();
        }
        self.pages
    }
}

pub struct PageManager<'a> {
    settings: &'a DocumentSettings,
    geometry: Geometry<'a>,
}

impl<'a> PageManager<'a> {
    pub fn new(settings: &'a DocumentSettings) -> Self {
        Self {
            settings,
            geometry: Geometry::from_document(settings),
        }
    }

    pub fn geometry(&self) -> Geometry<'a> {
        self.geometry
    }

    /// Text-area height minus the page-number reserve, in mm.
    pub fn available_height_mm(&self) -> f64 {
        self.geometry.text_area_bounds_mm().height() - self.settings.page_numbers.reserve_mm()
    }

    pub fn max_line_width_mm(&self) -> f64 {
        self.geometry.text_area_bounds_mm().width()
    }

    /// Lays out `text` and distributes the records over pages. Regenerates
    /// everything from scratch on each call.
    pub fn paginate(&self, text: &str) -> Vec<Page> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let records = TextLayout::new(self.geometry).lay_out(text, self.max_line_width_mm());
        let pages = self.paginate_records(records);

        debug!(
            pages = pages.len(),
            available_mm = self.available_height_mm(),
            "Paginated text"
        );

        if pages.is_empty() {
            vec![Page::default()]
        } else {
            pages
        }
    }

    /// Runs the pagination state machine over already-wrapped records.
    pub fn paginate_records(&self, records: Vec<LineRecord>) -> Vec<Page> {
        let font_pt = self.geometry.adaptive_font_size_pt();
        let line_height = self.geometry.line_height_mm(font_pt);
        let paragraph_spacing = self.settings.text.paragraph_spacing_mm;
        let available = self.available_height_mm();

        let mut builder = PageBuilder::new();

        for record in records {
            let advance = match record {
                LineRecord::ParagraphBreak => paragraph_spacing,
                LineRecord::Text(_) => line_height,
            };
            let overflows = builder.current_y + advance > available;

            match record {
                LineRecord::ParagraphBreak if overflows && !builder.current.is_empty() => {
                    builder.seal();
                }
                LineRecord::ParagraphBreak => builder.current_y += advance,
                LineRecord::Text(_) => {
                    if overflows && !builder.current.is_empty() {
                        builder.seal();
                    }
                    builder.current_y += advance;
                }
            }
            builder.current.push(record);
        }

        builder.finish()
    }

    pub fn statistics(&self, text: &str) -> TextStatistics {
        let characters = text.chars().count();
        let words = text.split_whitespace().count();
        let lines = text.matches('\n').count() + 1;
        let pages = self.paginate(text).len();
        let avg_words_per_page = if pages > 0 {
            words as f64 / pages as f64
        } else {
            0.0
        };

        TextStatistics {
            characters,
            words,
            lines,
            pages,
            avg_words_per_page,
        }
    }

    /// Reports the first word wider than the text area at the current adaptive
    /// font size. Advisory only.
    pub fn validate_fits(&self, text: &str) -> FitReport {
        let pages = self.paginate(text);
        if pages.is_empty() {
            return FitReport {
                fits: true,
                page_count: 0,
                message: "Text is empty".to_string(),
                overlong_word: None,
            };
        }

        let max_width_mm = self.max_line_width_mm();
        let overlong = text.split_whitespace().find_map(|word| {
            let width_mm = self.geometry.line_width_mm(word);
            (width_mm > max_width_mm).then(|| OverlongWord {
                word: word.to_string(),
                width_mm,
                max_width_mm,
            })
        });

        match overlong {
            Some(word) => FitReport {
                fits: false,
                page_count: pages.len(),
                message: format!(
                    "Word '{}' is too long for the current settings ({:.1} mm > {:.1} mm)",
                    word.word, word.width_mm, word.max_width_mm
                ),
                overlong_word: Some(word),
            },
            None => FitReport {
                fits: true,
                page_count: pages.len(),
                message: format!("Text fits on {} page(s)", pages.len()),
                overlong_word: None,
            },
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
