//! Geometry and unit conversion shared by preview, pagination, and emission.
//!
//! Glyph metrics are a fixed approximation of a monospaced face: every
//! character is `0.6em` wide and a line is `1.2em` tall. Preview and emission
//! both measure through this module, so the on-screen layout and the plotted
//! sheet agree even though neither uses real font outlines.

use serde::Serialize;

use crate::models::settings::{Alignment, DocumentSettings, PageSettings, TextSettings};

/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;
/// Millimeters per typographic point (1/72 inch).
pub const MM_PER_PT: f64 = 0.352778;
/// Character advance as a fraction of the font size.
pub const CHAR_WIDTH_EM: f64 = 0.6;
/// Base line height as a fraction of the font size, before `line_spacing`.
pub const LINE_HEIGHT_EM: f64 = 1.2;

pub const MIN_FONT_SIZE_PT: f64 = 6.0;
pub const MAX_FONT_SIZE_PT: f64 = 72.0;

// ────────────────────────────────────────────────────────────────────────────
// Bounds
// ────────────────────────────────────────────────────────────────────────────

/// Text-flow rectangle inside the margins. Units depend on the constructor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds<T> {
    pub left: T,
    pub top: T,
    pub right: T,
    pub bottom: T,
}

impl Bounds<f64> {
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry service
// ────────────────────────────────────────────────────────────────────────────

/// Borrowed view over the page and text settings that answers every
/// measurement question the layout pipeline asks.
#[derive(Debug, Clone, Copy)]
pub struct Geometry<'a> {
    page: &'a PageSettings,
    text: &'a TextSettings,
}

impl<'a> Geometry<'a> {
    pub fn new(page: &'a PageSettings, text: &'a TextSettings) -> Self {
        Self { page, text }
    }

    pub fn from_document(settings: &'a DocumentSettings) -> Self {
        Self::new(&settings.page, &settings.text)
    }

    pub fn page(&self) -> &'a PageSettings {
        self.page
    }

    pub fn text(&self) -> &'a TextSettings {
        self.text
    }

    pub fn mm_to_px(&self, mm: f64) -> i64 {
        (mm / MM_PER_INCH * self.page.dpi as f64).round() as i64
    }

    pub fn px_to_mm(&self, px: i64) -> f64 {
        px as f64 / self.page.dpi as f64 * MM_PER_INCH
    }

    /// Font size in points. With `auto_font_size` the size is derived from the
    /// grid cell (rounded to whole pixels at the page DPI) times the fill ratio,
    /// clamped to `[6, 72]`.
    pub fn adaptive_font_size_pt(&self) -> f64 {
        if !self.text.auto_font_size {
            return self.text.font_size_pt;
        }

        let grid_px = self.mm_to_px(self.page.grid_size_mm) as f64;
        let target_px = grid_px * self.text.font_fill_ratio;
        let target_in = target_px / self.page.dpi as f64;
        let pt = target_in * 72.0;

        pt.clamp(MIN_FONT_SIZE_PT, MAX_FONT_SIZE_PT)
    }

    /// Horizontal advance of one character at `font_size_pt`, excluding letter spacing.
    pub fn char_width_mm(&self, font_size_pt: f64) -> f64 {
        font_size_pt * CHAR_WIDTH_EM * MM_PER_PT
    }

    /// Baseline-to-baseline distance at `font_size_pt`, including `line_spacing`.
    pub fn line_height_mm(&self, font_size_pt: f64) -> f64 {
        font_size_pt * LINE_HEIGHT_EM * MM_PER_PT * self.text.line_spacing
    }

    /// Width of `line` at the adaptive font size. Counts characters, not bytes.
    pub fn line_width_mm(&self, line: &str) -> f64 {
        line.chars().count() as f64 * self.char_width_mm(self.adaptive_font_size_pt())
    }

    pub fn text_area_bounds_mm(&self) -> Bounds<f64> {
        Bounds {
            left: self.page.margin_left_mm,
            top: self.page.margin_top_mm,
            right: self.page.width_mm - self.page.margin_right_mm,
            bottom: self.page.height_mm - self.page.margin_bottom_mm,
        }
    }

    pub fn text_area_bounds_px(&self) -> Bounds<i64> {
        let mm = self.text_area_bounds_mm();
        Bounds {
            left: self.mm_to_px(mm.left),
            top: self.mm_to_px(mm.top),
            right: self.mm_to_px(mm.right),
            bottom: self.mm_to_px(mm.bottom),
        }
    }

    /// Snaps one coordinate to the nearest multiple of the grid size.
    pub fn align_to_grid(&self, coord_mm: f64) -> f64 {
        let grid = self.page.grid_size_mm;
        (coord_mm / grid).round() * grid
    }

    /// Snaps both axes independently.
    pub fn align_point_to_grid(&self, x_mm: f64, y_mm: f64) -> (f64, f64) {
        (self.align_to_grid(x_mm), self.align_to_grid(y_mm))
    }

    /// Start X of a line for the configured alignment. `justify` starts at the
    /// left bound and does not stretch inter-word spacing.
    pub fn line_x_position_mm(&self, line: &str, left_bound_mm: f64) -> f64 {
        let bounds = self.text_area_bounds_mm();
        match self.text.alignment {
            Alignment::Left | Alignment::Justify => left_bound_mm,
            Alignment::Center => {
                left_bound_mm + (bounds.width() - self.line_width_mm(line)) / 2.0
            }
            Alignment::Right => bounds.right - self.line_width_mm(line),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_settings() -> DocumentSettings {
        DocumentSettings::default()
    }

    #[test]
    fn test_mm_px_round_trip_within_one_unit() {
        let settings = make_settings();
        for dpi in [72_u32, 96, 150, 300, 600] {
            let mut page = settings.page.clone();
            page.dpi = dpi;
            let geo = Geometry::new(&page, &settings.text);
            for px in [0_i64, 1, 7, 38, 100, 999] {
                let back = geo.mm_to_px(geo.px_to_mm(px));
                assert!((back - px).abs() <= 1, "dpi {dpi}: {px} -> {back}");
            }
            for mm in [0.0, 0.5, 2.0, 25.4, 80.0, 210.0] {
                let back = geo.px_to_mm(geo.mm_to_px(mm));
                assert!((back - mm).abs() < 1.0, "dpi {dpi}: {mm} -> {back}");
            }
        }
    }

    #[test]
    fn test_mm_to_px_one_inch() {
        let settings = make_settings();
        let geo = Geometry::from_document(&settings);
        assert_eq!(geo.mm_to_px(25.4), 96);
    }

    #[test]
    fn test_adaptive_font_size_matches_formula() {
        // 80x60 page, 5 mm margins, 2 mm grid, fill 0.8, 96 dpi.
        let settings = make_settings();
        let geo = Geometry::from_document(&settings);

        let grid_px = (2.0_f64 / 25.4 * 96.0).round(); // 8 px
        let expected = (grid_px * 0.8 / 96.0 * 72.0).clamp(6.0, 72.0);

        assert_eq!(geo.adaptive_font_size_pt(), expected);
        assert_eq!(geo.adaptive_font_size_pt(), geo.adaptive_font_size_pt());
        // 6.4 px -> 4.8 pt, so the lower clamp applies.
        assert_eq!(expected, 6.0);
    }

    #[test]
    fn test_adaptive_font_size_clamped_high() {
        let mut settings = make_settings();
        settings.page.grid_size_mm = 50.0;
        settings.text.font_fill_ratio = 1.0;
        let geo = Geometry::from_document(&settings);
        assert_eq!(geo.adaptive_font_size_pt(), 72.0);
    }

    #[test]
    fn test_adaptive_font_size_in_range_for_various_grids() {
        let mut settings = make_settings();
        for grid in [0.1, 1.0, 5.0, 8.0, 12.5, 30.0] {
            settings.page.grid_size_mm = grid;
            let pt = Geometry::from_document(&settings).adaptive_font_size_pt();
            assert!((6.0..=72.0).contains(&pt), "grid {grid}: {pt}");
        }
    }

    #[test]
    fn test_manual_font_size_passes_through() {
        let mut settings = make_settings();
        settings.text.auto_font_size = false;
        settings.text.font_size_pt = 3.25; // below the clamp, still untouched
        let geo = Geometry::from_document(&settings);
        assert_eq!(geo.adaptive_font_size_pt(), 3.25);
    }

    #[test]
    fn test_glyph_metrics() {
        let settings = make_settings();
        let geo = Geometry::from_document(&settings);
        assert!((geo.char_width_mm(10.0) - 2.11667).abs() < 1e-4);
        // line_spacing 1.2
        assert!((geo.line_height_mm(10.0) - 5.08000).abs() < 1e-4);
    }

    #[test]
    fn test_text_area_bounds() {
        let settings = make_settings();
        let geo = Geometry::from_document(&settings);
        let mm = geo.text_area_bounds_mm();
        assert_eq!(mm, Bounds { left: 5.0, top: 5.0, right: 75.0, bottom: 55.0 });
        assert_eq!(mm.width(), 70.0);
        assert_eq!(mm.height(), 50.0);

        let px = geo.text_area_bounds_px();
        assert_eq!(px.left, geo.mm_to_px(5.0));
        assert_eq!(px.right, geo.mm_to_px(75.0));
    }

    #[test]
    fn test_align_to_grid() {
        let settings = make_settings();
        let geo = Geometry::from_document(&settings);
        assert_eq!(geo.align_to_grid(4.9), 4.0);
        assert_eq!(geo.align_to_grid(5.1), 6.0);
        assert_eq!(geo.align_point_to_grid(0.4, 7.2), (0.0, 8.0));
    }

    #[test]
    fn test_line_x_position_per_alignment() {
        let mut settings = make_settings();
        settings.text.auto_font_size = false;
        settings.text.font_size_pt = 10.0;
        let line = "abcd";

        for (alignment, expected) in [
            (Alignment::Left, 5.0),
            (Alignment::Justify, 5.0),
            (Alignment::Center, 5.0 + (70.0 - 4.0 * 2.11667) / 2.0),
            (Alignment::Right, 75.0 - 4.0 * 2.11667),
        ] {
            settings.text.alignment = alignment;
            let geo = Geometry::from_document(&settings);
            let x = geo.line_x_position_mm(line, 5.0);
            assert!((x - expected).abs() < 1e-3, "{alignment:?}: {x} vs {expected}");
        }
    }
}
