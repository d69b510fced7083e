//! G-code emission for the pen plotter.
//!
//! Walks the paginated line model and writes an absolute-coordinate,
//! millimeter program: header, one block per page with pauses for sheet
//! changes, and a footer. Pen state and the drawing cursor live in a local
//! [`ProgramWriter`] threaded through the per-page and per-line functions, so
//! emission is a function of `(pages, settings, machine)` alone.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gcode::glyphs::GlyphPrimitive;
use crate::layout::pagination::Page;
use crate::layout::units::Geometry;
use crate::layout::wrap::LineRecord;
use crate::models::settings::{DocumentSettings, HorizontalAnchor, VerticalAnchor};

pub const ABSOLUTE_MODE: &str = "G90";
pub const MILLIMETER_UNITS: &str = "G21";
pub const HOME: &str = "G28";
pub const TRAVEL_MOVE: &str = "G0";
pub const DRAW_MOVE: &str = "G1";
pub const PAUSE: &str = "M0";
pub const PROGRAM_END: &str = "M30";

/// Number of characters of a line echoed in its travel-move comment.
const LINE_PREVIEW_CHARS: usize = 30;

/// Seconds of drawing per character in the print-time estimate.
const DRAW_SECONDS_PER_CHAR: u64 = 2;
/// Seconds per page for travel and sheet changes in the print-time estimate.
const CHANGEOVER_SECONDS_PER_PAGE: u64 = 30;

// ────────────────────────────────────────────────────────────────────────────
// Machine settings
// ────────────────────────────────────────────────────────────────────────────

/// Feed rates and pen tokens. Defaults suit a two-state solenoid or servo pen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSettings {
    /// mm/min for pen-up moves.
    pub travel_feed_rate: u32,
    /// mm/min for pen-down moves.
    pub draw_feed_rate: u32,
    pub pen_up_command: String,
    pub pen_down_command: String,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            travel_feed_rate: 3000,
            draw_feed_rate: 1500,
            pen_up_command: "M5".to_string(),
            pen_down_command: "M3".to_string(),
        }
    }
}

/// Per-request overrides layered over the configured machine defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MachineOverrides {
    pub travel_feed_rate: Option<u32>,
    pub draw_feed_rate: Option<u32>,
    pub pen_up_command: Option<String>,
    pub pen_down_command: Option<String>,
}

impl MachineSettings {
    pub fn with_overrides(&self, overrides: Option<&MachineOverrides>) -> Self {
        let Some(o) = overrides else {
            return self.clone();
        };
        Self {
            travel_feed_rate: o.travel_feed_rate.unwrap_or(self.travel_feed_rate),
            draw_feed_rate: o.draw_feed_rate.unwrap_or(self.draw_feed_rate),
            pen_up_command: o
                .pen_up_command
                .clone()
                .unwrap_or_else(|| self.pen_up_command.clone()),
            pen_down_command: o
                .pen_down_command
                .clone()
                .unwrap_or_else(|| self.pen_down_command.clone()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.travel_feed_rate == 0 || self.draw_feed_rate == 0 {
            return Err("Feed rates must be greater than 0 mm/min".to_string());
        }
        if self.pen_up_command.trim().is_empty() || self.pen_down_command.trim().is_empty() {
            return Err("Pen up/down commands must not be empty".to_string());
        }
        if self.pen_up_command.contains(['\n', ';']) || self.pen_down_command.contains(['\n', ';'])
        {
            return Err("Pen commands must be a single token without comments".to_string());
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Observer seam
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmissionError {
    #[error("G-code generation was cancelled")]
    Cancelled,

    #[error("G-code generation failed: {0}")]
    Failed(String),

    #[error("G-code worker stopped unexpectedly: {0}")]
    WorkerPanicked(String),
}

/// Receives progress while a program is generated and may stop it.
pub trait EmissionObserver {
    fn on_progress(&mut self, _percent: u8) {}
    fn on_status(&mut self, _status: &str) {}
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Observer that ignores everything.
pub struct Silent;

impl EmissionObserver for Silent {}

// ────────────────────────────────────────────────────────────────────────────
// Program writer (local drawing state)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pen {
    Up,
    Down,
}

struct ProgramWriter<'m> {
    machine: &'m MachineSettings,
    lines: Vec<String>,
    pen: Pen,
}

impl<'m> ProgramWriter<'m> {
    fn new(machine: &'m MachineSettings) -> Self {
        Self {
            machine,
            lines: Vec::new(),
            pen: Pen::Up,
        }
    }

    fn raw(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn comment(&mut self, text: impl AsRef<str>) {
        self.lines.push(format!("; {}", text.as_ref()));
    }

    /// Writes the pen-up token unconditionally; used where the program
    /// re-asserts pen up at fixed points.
    fn force_pen_up(&mut self) {
        self.lines
            .push(format!("{} ; Pen up", self.machine.pen_up_command));
        self.pen = Pen::Up;
    }

    fn pen_up(&mut self) {
        if self.pen == Pen::Down {
            self.force_pen_up();
        }
    }

    fn pen_down(&mut self) {
        if self.pen == Pen::Up {
            self.lines
                .push(format!("{} ; Pen down", self.machine.pen_down_command));
            self.pen = Pen::Down;
        }
    }

    fn travel(&mut self, x: f64, y: f64, comment: Option<&str>) {
        let mut line = format!("{TRAVEL_MOVE} X{x:.2} Y{y:.2}");
        if let Some(comment) = comment {
            line.push_str(" ; ");
            line.push_str(comment);
        }
        self.lines.push(line);
    }

    fn draw_glyph(&mut self, c: char, x: f64, y: f64, cell_width: f64, cell_height: f64) {
        self.comment(format!("Glyph '{c}' at ({x:.2}, {y:.2})"));
        for (px, py) in GlyphPrimitive::for_char(c).strokes(x, y, cell_width, cell_height) {
            self.lines.push(format!("{DRAW_MOVE} X{px:.2} Y{py:.2}"));
        }
    }

    fn finish(self) -> String {
        self.lines.join("\n")
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Public entry points
// ────────────────────────────────────────────────────────────────────────────

/// Generates the complete program with no progress reporting.
pub fn generate_program(
    pages: &[Page],
    settings: &DocumentSettings,
    machine: &MachineSettings,
) -> Result<String, EmissionError> {
    emit_program(pages, settings, machine, &mut Silent)
}

/// Generates the complete program, reporting progress as the share of line
/// records processed and checking for cancellation before every record.
pub fn emit_program(
    pages: &[Page],
    settings: &DocumentSettings,
    machine: &MachineSettings,
    observer: &mut dyn EmissionObserver,
) -> Result<String, EmissionError> {
    settings
        .validate()
        .map_err(|e| EmissionError::Failed(e.to_string()))?;
    machine.validate().map_err(EmissionError::Failed)?;

    observer.on_status("Starting G-code generation...");

    let geometry = Geometry::from_document(settings);
    let mut out = ProgramWriter::new(machine);
    write_header(&mut out, pages.len(), settings, &geometry);

    let total_lines: usize = pages.iter().map(|p| p.lines.len()).sum();
    let mut processed_lines = 0usize;

    for (page_index, page) in pages.iter().enumerate() {
        observer.on_status(&format!("Processing page {}...", page_index + 1));
        emit_page(&mut out, observer, settings, &geometry, page_index, page, pages.len())?;

        processed_lines += page.lines.len();
        observer.on_progress(progress_percent(processed_lines, total_lines));

        if page_index + 1 < pages.len() {
            if observer.is_cancelled() {
                return Err(EmissionError::Cancelled);
            }
            out.blank();
            out.comment(format!("=== End of page {} ===", page_index + 1));
            out.force_pen_up();
            out.raw(format!("{TRAVEL_MOVE} X0 Y0 ; Return to origin"));
            out.raw(format!("{PAUSE} ; Pause for sheet change"));
            out.comment(format!("=== Start of page {} ===", page_index + 2));
            out.blank();
        }
    }

    if pages.is_empty() {
        observer.on_progress(100);
    }

    out.blank();
    out.comment("=== End of program ===");
    out.force_pen_up();
    out.raw(format!("{TRAVEL_MOVE} X0 Y0 ; Return home"));
    out.raw(format!("{PROGRAM_END} ; End of program"));
    out.comment(format!("Pages processed: {}", pages.len()));
    out.comment(format!("Total lines: {total_lines}"));

    observer.on_status("G-code ready");
    Ok(out.finish())
}

fn progress_percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        100
    } else {
        (processed * 100 / total).min(100) as u8
    }
}

fn write_header(
    out: &mut ProgramWriter<'_>,
    page_count: usize,
    settings: &DocumentSettings,
    geometry: &Geometry<'_>,
) {
    let machine = out.machine;
    out.comment("===== G-code for pen plotter =====");
    out.comment(format!("Pages: {page_count}"));
    out.comment(format!(
        "Sheet size: {}x{} mm",
        settings.page.width_mm, settings.page.height_mm
    ));
    out.comment(format!("Font: {}", settings.text.font_family));
    out.comment(format!(
        "Font size: {:.1}pt ({})",
        geometry.adaptive_font_size_pt(),
        if settings.text.auto_font_size { "adaptive" } else { "fixed" }
    ));
    out.comment(format!("Alignment: {}", settings.text.alignment.as_str()));
    out.comment(format!(
        "Grid: {} {} mm",
        settings.page.grid_type.as_str(),
        settings.page.grid_size_mm
    ));
    out.blank();
    out.comment("=== Initialization ===");
    out.raw(format!("{ABSOLUTE_MODE} ; Absolute positioning"));
    out.raw(format!("{MILLIMETER_UNITS} ; Millimeters"));
    out.raw(format!("{HOME} ; Home"));
    out.force_pen_up();
    out.raw(format!(
        "{TRAVEL_MOVE} F{} ; Travel feed rate",
        machine.travel_feed_rate
    ));
    out.raw(format!(
        "{DRAW_MOVE} F{} ; Draw feed rate",
        machine.draw_feed_rate
    ));
    out.blank();
}

fn emit_page(
    out: &mut ProgramWriter<'_>,
    observer: &mut dyn EmissionObserver,
    settings: &DocumentSettings,
    geometry: &Geometry<'_>,
    page_index: usize,
    page: &Page,
    total_pages: usize,
) -> Result<(), EmissionError> {
    out.comment(format!("=== Page {} ===", page_index + 1));

    let bounds = geometry.text_area_bounds_mm();
    let font_pt = geometry.adaptive_font_size_pt();
    let char_width = geometry.char_width_mm(font_pt);
    let line_height = geometry.line_height_mm(font_pt);
    let letter_spacing = settings.text.letter_spacing_mm;

    let mut cursor_y = bounds.top;

    for (line_index, record) in page.lines.iter().enumerate() {
        if observer.is_cancelled() {
            return Err(EmissionError::Cancelled);
        }

        let line = match record {
            LineRecord::ParagraphBreak => {
                cursor_y += settings.text.paragraph_spacing_mm;
                continue;
            }
            LineRecord::Text(line) => line,
        };

        let (x, y) =
            geometry.align_point_to_grid(geometry.line_x_position_mm(line, bounds.left), cursor_y);

        out.pen_up();
        out.travel(
            x,
            y,
            Some(&format!("Line {}: {}", line_index + 1, line_preview(line))),
        );

        let mut cursor_x = x;
        for c in line.chars() {
            if c != ' ' {
                out.pen_down();
                out.draw_glyph(c, cursor_x, y, char_width, line_height);
            }
            cursor_x += char_width + letter_spacing;
        }
        out.pen_up();

        cursor_y += line_height;
    }

    if settings.page_numbers.enabled {
        emit_page_number(out, settings, geometry, page_index, total_pages);
    }
    Ok(())
}

fn emit_page_number(
    out: &mut ProgramWriter<'_>,
    settings: &DocumentSettings,
    geometry: &Geometry<'_>,
    page_index: usize,
    total_pages: usize,
) {
    let numbers = &settings.page_numbers;
    let text = numbers.render(page_index + 1, total_pages);
    let (x, y) = page_number_anchor(settings);

    let char_width = geometry.char_width_mm(numbers.font_size_pt);
    let char_height = geometry.line_height_mm(numbers.font_size_pt);

    out.blank();
    out.comment(format!("Page number: {text}"));
    out.pen_up();
    out.travel(x, y, None);
    out.pen_down();

    let mut cursor_x = x;
    for c in text.chars() {
        if c != ' ' {
            out.draw_glyph(c, cursor_x, y, char_width, char_height);
        }
        cursor_x += char_width;
    }
    out.pen_up();
}

/// Anchor of the page-number stamp in page coordinates.
pub fn page_number_anchor(settings: &DocumentSettings) -> (f64, f64) {
    let page = &settings.page;
    let numbers = &settings.page_numbers;
    let offset = numbers.offset_mm;

    let y = match numbers.position.vertical() {
        VerticalAnchor::Top => offset,
        VerticalAnchor::Bottom => page.height_mm - offset,
    };
    let x = match numbers.position.horizontal() {
        HorizontalAnchor::Left => offset,
        HorizontalAnchor::Center => page.width_mm / 2.0,
        HorizontalAnchor::Right => page.width_mm - offset,
    };
    (x, y)
}

fn line_preview(line: &str) -> String {
    let mut preview: String = line.chars().take(LINE_PREVIEW_CHARS).collect();
    if line.chars().count() > LINE_PREVIEW_CHARS {
        preview.push_str("...");
    }
    preview
}

// ────────────────────────────────────────────────────────────────────────────
// Print time estimate
// ────────────────────────────────────────────────────────────────────────────

/// Coarse, non-binding duration estimate for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintTimeEstimate {
    pub total_seconds: u64,
    pub minutes: u64,
    pub hours: u64,
    pub draw_seconds: u64,
    pub travel_seconds: u64,
    /// Characters across all non-empty line records, spaces included.
    pub characters: u64,
}

pub fn estimate_print_time(pages: &[Page]) -> PrintTimeEstimate {
    let characters: u64 = pages
        .iter()
        .flat_map(|p| p.text_lines())
        .map(|line| line.chars().count() as u64)
        .sum();

    let draw_seconds = characters * DRAW_SECONDS_PER_CHAR;
    let travel_seconds = pages.len() as u64 * CHANGEOVER_SECONDS_PER_PAGE;
    let total_seconds = draw_seconds + travel_seconds;

    PrintTimeEstimate {
        total_seconds,
        minutes: total_seconds / 60,
        hours: total_seconds / 3600,
        draw_seconds,
        travel_seconds,
        characters,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::validator::validate;
    use crate::layout::pagination::PageManager;
    use crate::models::settings::PageNumberPosition;

    fn make_settings() -> DocumentSettings {
        let mut settings = DocumentSettings::default();
        settings.text.indent_first_line_mm = 0.0;
        settings.page_numbers.enabled = false;
        settings
    }

    fn make_pages(settings: &DocumentSettings, text: &str) -> Vec<Page> {
        PageManager::new(settings).paginate(text)
    }

    fn lines_of(program: &str) -> Vec<&str> {
        program.lines().collect()
    }

    /// Replays pen tokens and checks that travel happens with the pen up and
    /// drawing with the pen down.
    fn assert_pen_discipline(program: &str, machine: &MachineSettings) {
        let mut down = false;
        let mut seen_pen_token = false;
        for line in program.lines() {
            let code = line.split(';').next().unwrap_or("").trim();
            let first = code.split_whitespace().next().unwrap_or("");
            if first == machine.pen_down_command {
                assert!(seen_pen_token, "pen lowered before initial pen up");
                down = true;
            } else if first == machine.pen_up_command {
                seen_pen_token = true;
                down = false;
            } else if first == TRAVEL_MOVE && code.contains('X') {
                assert!(!down, "travel move with pen down: {line}");
            } else if first == DRAW_MOVE && code.contains('X') {
                assert!(down, "draw move with pen up: {line}");
            } else if line.starts_with("; Line") || line.starts_with("; Page number") {
                assert!(!down, "new line started with pen down");
            }
        }
        assert!(!down, "program ends with pen down");
    }

    #[test]
    fn test_header_and_footer() {
        let settings = make_settings();
        let pages = make_pages(&settings, "Hi");
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();
        let lines = lines_of(&program);

        assert!(lines.contains(&"G90 ; Absolute positioning"));
        assert!(lines.contains(&"G21 ; Millimeters"));
        assert!(lines.contains(&"G28 ; Home"));
        assert!(lines.contains(&"G0 F3000 ; Travel feed rate"));
        assert!(lines.contains(&"G1 F1500 ; Draw feed rate"));
        assert!(lines.contains(&"; Font size: 6.0pt (adaptive)"));
        assert!(lines.contains(&"M30 ; End of program"));
        assert_eq!(lines.last(), Some(&"; Total lines: 1"));
        assert!(lines.contains(&"; Pages processed: 1"));
    }

    #[test]
    fn test_line_travel_is_grid_aligned() {
        let settings = make_settings();
        let pages = make_pages(&settings, "Hello");
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();
        // Left margin 5 mm snaps to 6.00 (round half away from zero on a 2 mm grid).
        assert!(program.contains("G0 X6.00 Y6.00 ; Line 1: Hello"));
    }

    #[test]
    fn test_glyph_strokes_emitted_per_character() {
        let settings = make_settings();
        let pages = make_pages(&settings, "a-|@");
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();
        let draws = program
            .lines()
            .filter(|l| l.starts_with("G1 X"))
            .count();
        // box 5 + bar 2 + bar 2 + dot 2
        assert_eq!(draws, 11);
        assert!(program.contains("; Glyph 'a' at (6.00, 6.00)"));
    }

    #[test]
    fn test_spaces_emit_no_geometry() {
        let settings = make_settings();
        let pages = make_pages(&settings, "a b");
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();
        assert_eq!(program.matches("; Glyph").count(), 2);
        assert_eq!(program.matches("M3 ; Pen down").count(), 1);
    }

    #[test]
    fn test_pen_discipline_across_pages() {
        let mut settings = make_settings();
        settings.page_numbers.enabled = true;
        let text = "Lorem ipsum dolor sit amet, consectetur adipiscing elit.\n\n".repeat(20);
        let pages = make_pages(&settings, &text);
        assert!(pages.len() > 1);

        let machine = MachineSettings::default();
        let program = generate_program(&pages, &settings, &machine).unwrap();
        assert_pen_discipline(&program, &machine);
    }

    #[test]
    fn test_page_breaks_pause_between_pages_only() {
        let settings = make_settings();
        let text = (1..=30).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let pages = make_pages(&settings, &text);
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();

        assert_eq!(
            program.matches("M0 ; Pause for sheet change").count(),
            pages.len() - 1
        );
        assert!(program.contains("; === Start of page 2 ==="));
        assert!(!program.contains(&format!("; === End of page {} ===", pages.len())));
    }

    #[test]
    fn test_paragraph_break_advances_cursor() {
        let mut settings = make_settings();
        settings.text.paragraph_spacing_mm = 10.0;
        let pages = make_pages(&settings, "a\n\nb");
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();
        // Line height at 6pt with 1.2 spacing is ~3.05 mm: 5 + 3.05 + 10 = 18.05 -> 18.
        assert!(program.contains("G0 X6.00 Y18.00 ; Line 3: b"));
    }

    #[test]
    fn test_page_number_stamp() {
        let mut settings = make_settings();
        settings.page_numbers.enabled = true;
        settings.page_numbers.format = "{page}/{total}".to_string();
        settings.page_numbers.position = PageNumberPosition::TopRight;
        let pages = make_pages(&settings, "Hello");
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();

        assert!(program.contains("; Page number: 1/1"));
        assert!(program.contains("G0 X77.00 Y3.00"));
    }

    #[test]
    fn test_page_number_anchor_positions() {
        let mut settings = make_settings();
        settings.page_numbers.position = PageNumberPosition::BottomCenter;
        assert_eq!(page_number_anchor(&settings), (40.0, 57.0));
        settings.page_numbers.position = PageNumberPosition::TopLeft;
        assert_eq!(page_number_anchor(&settings), (3.0, 3.0));
    }

    #[test]
    fn test_custom_machine_tokens() {
        let settings = make_settings();
        let pages = make_pages(&settings, "ab");
        let machine = MachineSettings {
            travel_feed_rate: 6000,
            draw_feed_rate: 800,
            pen_up_command: "M300 S50".to_string(),
            pen_down_command: "M300 S30".to_string(),
        };
        let program = generate_program(&pages, &settings, &machine).unwrap();
        assert!(program.contains("M300 S30 ; Pen down"));
        assert!(program.contains("M300 S50 ; Pen up"));
        assert!(program.contains("G0 F6000"));
        assert!(!program.contains("M3 ; Pen down"));
    }

    #[test]
    fn test_overrides_layer_over_defaults() {
        let defaults = MachineSettings::default();
        let overrides = MachineOverrides {
            draw_feed_rate: Some(900),
            ..MachineOverrides::default()
        };
        let merged = defaults.with_overrides(Some(&overrides));
        assert_eq!(merged.draw_feed_rate, 900);
        assert_eq!(merged.travel_feed_rate, 3000);
        assert_eq!(defaults.with_overrides(None), defaults);
    }

    #[test]
    fn test_empty_pages_still_valid_program() {
        let settings = make_settings();
        let program = generate_program(&[], &settings, &MachineSettings::default()).unwrap();
        assert!(program.contains("; Total lines: 0"));
        assert!(validate(&program).ok);
    }

    #[test]
    fn test_generated_program_passes_validator() {
        let mut settings = make_settings();
        settings.page_numbers.enabled = true;
        let pages = make_pages(&settings, "Some text\n\nacross paragraphs, with punctuation!");
        let program = generate_program(&pages, &settings, &MachineSettings::default()).unwrap();
        let report = validate(&program);
        assert!(report.ok, "{:?}", report.diagnostics);
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn test_invalid_settings_fail_emission() {
        let mut settings = make_settings();
        settings.page.dpi = 0;
        let err = generate_program(&[], &settings, &MachineSettings::default()).unwrap_err();
        assert!(matches!(err, EmissionError::Failed(msg) if msg.contains("DPI")));
    }

    #[test]
    fn test_progress_and_cancellation_observer() {
        struct Recorder {
            progress: Vec<u8>,
            cancel_after: Option<usize>,
        }
        impl EmissionObserver for Recorder {
            fn on_progress(&mut self, percent: u8) {
                self.progress.push(percent);
            }
            fn is_cancelled(&self) -> bool {
                self.cancel_after
                    .map(|n| self.progress.len() >= n)
                    .unwrap_or(false)
            }
        }

        let settings = make_settings();
        let text = (1..=40).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        let pages = make_pages(&settings, &text);
        let machine = MachineSettings::default();

        let mut recorder = Recorder { progress: vec![], cancel_after: None };
        emit_program(&pages, &settings, &machine, &mut recorder).unwrap();
        assert_eq!(recorder.progress.len(), pages.len());
        assert_eq!(recorder.progress.last(), Some(&100));
        assert!(recorder.progress.windows(2).all(|w| w[0] <= w[1]));

        let mut cancelling = Recorder { progress: vec![], cancel_after: Some(1) };
        let err = emit_program(&pages, &settings, &machine, &mut cancelling).unwrap_err();
        assert_eq!(err, EmissionError::Cancelled);
    }

    #[test]
    fn test_estimate_print_time() {
        let pages = vec![
            Page {
                lines: vec![
                    LineRecord::Text("abc de".to_string()),
                    LineRecord::ParagraphBreak,
                ],
            },
            Page {
                lines: vec![LineRecord::Text("fgh".to_string())],
            },
        ];
        let estimate = estimate_print_time(&pages);
        assert_eq!(estimate.characters, 9);
        assert_eq!(estimate.draw_seconds, 18);
        assert_eq!(estimate.travel_seconds, 60);
        assert_eq!(estimate.total_seconds, 78);
        assert_eq!(estimate.minutes, 1);
        assert_eq!(estimate.hours, 0);
    }

    #[test]
    fn test_line_preview_truncates() {
        let long = "x".repeat(35);
        assert_eq!(line_preview(&long), format!("{}...", "x".repeat(30)));
        assert_eq!(line_preview("short"), "short");
    }
}
