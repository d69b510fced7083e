//! Configuration records supplied by the editor: page geometry, text styling,
//! and page-number stamping. All three are plain values; layout and emission
//! recompute everything from them on every request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ────────────────────────────────────────────────────────────────────────────
// Enumerations
// ────────────────────────────────────────────────────────────────────────────

/// Ruling printed on the physical sheet. Only informational for emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridType {
    Cell,
    Ruled,
}

impl GridType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GridType::Cell => "cell",
            GridType::Ruled => "ruled",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    /// Positioned like `Left`; inter-word space is not distributed.
    Justify,
}

impl Alignment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

/// Where the page-number stamp is anchored: {top|bottom} × {left|center|right}.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageNumberPosition {
    TopLeft,
    TopCenter,
    TopRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerticalAnchor {
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAnchor {
    Left,
    Center,
    Right,
}

impl PageNumberPosition {
    pub fn vertical(&self) -> VerticalAnchor {
        match self {
            PageNumberPosition::TopLeft
            | PageNumberPosition::TopCenter
            | PageNumberPosition::TopRight => VerticalAnchor::Top,
            PageNumberPosition::BottomLeft
            | PageNumberPosition::BottomCenter
            | PageNumberPosition::BottomRight => VerticalAnchor::Bottom,
        }
    }

    pub fn horizontal(&self) -> HorizontalAnchor {
        match self {
            PageNumberPosition::TopLeft | PageNumberPosition::BottomLeft => HorizontalAnchor::Left,
            PageNumberPosition::TopCenter | PageNumberPosition::BottomCenter => {
                HorizontalAnchor::Center
            }
            PageNumberPosition::TopRight | PageNumberPosition::BottomRight => {
                HorizontalAnchor::Right
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Settings records
// ────────────────────────────────────────────────────────────────────────────

/// Physical sheet. All lengths in millimeters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageSettings {
    pub width_mm: f64,
    pub height_mm: f64,
    pub margin_left_mm: f64,
    pub margin_right_mm: f64,
    pub margin_top_mm: f64,
    pub margin_bottom_mm: f64,
    pub dpi: u32,
    pub grid_size_mm: f64,
    pub grid_type: GridType,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            width_mm: 80.0,
            height_mm: 60.0,
            margin_left_mm: 5.0,
            margin_right_mm: 5.0,
            margin_top_mm: 5.0,
            margin_bottom_mm: 5.0,
            dpi: 96,
            grid_size_mm: 2.0,
            grid_type: GridType::Cell,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSettings {
    pub font_family: String,
    pub font_size_pt: f64,
    /// Multiplier applied to the base line height.
    pub line_spacing: f64,
    pub letter_spacing_mm: f64,
    pub paragraph_spacing_mm: f64,
    pub indent_first_line_mm: f64,
    pub alignment: Alignment,
    pub auto_font_size: bool,
    /// Fraction of a grid cell the glyph height should occupy, 0.0 – 1.0.
    pub font_fill_ratio: f64,
}

impl Default for TextSettings {
    fn default() -> Self {
        Self {
            font_family: "Arial".to_string(),
            font_size_pt: 12.0,
            line_spacing: 1.2,
            letter_spacing_mm: 0.5,
            paragraph_spacing_mm: 3.0,
            indent_first_line_mm: 5.0,
            alignment: Alignment::Left,
            auto_font_size: true,
            font_fill_ratio: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageNumberSettings {
    pub enabled: bool,
    pub position: PageNumberPosition,
    /// Template; must contain `{page}`, may contain `{total}`.
    pub format: String,
    pub font_size_pt: f64,
    pub offset_mm: f64,
}

impl Default for PageNumberSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            position: PageNumberPosition::BottomCenter,
            format: "- {page} -".to_string(),
            font_size_pt: 10.0,
            offset_mm: 3.0,
        }
    }
}

impl PageNumberSettings {
    /// Vertical space withheld from the text flow for the stamp.
    pub fn reserve_mm(&self) -> f64 {
        if self.enabled {
            self.offset_mm * 2.0 + 5.0
        } else {
            0.0
        }
    }

    /// Expands `{page}` and `{total}` for a 1-based page number.
    pub fn render(&self, page: usize, total: usize) -> String {
        self.format
            .replace("{page}", &page.to_string())
            .replace("{total}", &total.to_string())
    }
}

/// The three records bundled together, as every layout entry point needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentSettings {
    pub page: PageSettings,
    pub text: TextSettings,
    pub page_numbers: PageNumberSettings,
}

// ────────────────────────────────────────────────────────────────────────────
// Validation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid settings: {}", .messages.join("; "))]
pub struct SettingsError {
    pub messages: Vec<String>,
}

/// Pushes `message` when `value` is not a finite number strictly above zero.
fn require_positive(errors: &mut Vec<String>, value: f64, message: &str) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(message.to_string());
    }
}

fn require_non_negative(errors: &mut Vec<String>, value: f64, message: &str) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(message.to_string());
    }
}

impl PageSettings {
    pub fn collect_errors(&self, errors: &mut Vec<String>) {
        require_positive(errors, self.width_mm, "Page width must be greater than 0 mm");
        require_positive(errors, self.height_mm, "Page height must be greater than 0 mm");
        if self.dpi == 0 {
            errors.push("DPI must be greater than 0".to_string());
        }
        require_positive(errors, self.grid_size_mm, "Grid size must be greater than 0 mm");
        require_non_negative(errors, self.margin_left_mm, "Left margin must not be negative");
        require_non_negative(errors, self.margin_right_mm, "Right margin must not be negative");
        require_non_negative(errors, self.margin_top_mm, "Top margin must not be negative");
        require_non_negative(errors, self.margin_bottom_mm, "Bottom margin must not be negative");

        if self.margin_left_mm + self.margin_right_mm >= self.width_mm {
            errors.push(format!(
                "Left and right margins ({:.1} mm + {:.1} mm) leave no room on a {:.1} mm wide page",
                self.margin_left_mm, self.margin_right_mm, self.width_mm
            ));
        }
        if self.margin_top_mm + self.margin_bottom_mm >= self.height_mm {
            errors.push(format!(
                "Top and bottom margins ({:.1} mm + {:.1} mm) leave no room on a {:.1} mm tall page",
                self.margin_top_mm, self.margin_bottom_mm, self.height_mm
            ));
        }
    }
}

impl TextSettings {
    pub fn collect_errors(&self, errors: &mut Vec<String>) {
        require_positive(errors, self.font_size_pt, "Font size must be greater than 0 pt");
        require_positive(errors, self.line_spacing, "Line spacing must be greater than 0");
        require_non_negative(errors, self.letter_spacing_mm, "Letter spacing must not be negative");
        require_non_negative(
            errors,
            self.paragraph_spacing_mm,
            "Paragraph spacing must not be negative",
        );
        require_non_negative(
            errors,
            self.indent_first_line_mm,
            "First-line indent must not be negative",
        );
        if !(0.0..=1.0).contains(&self.font_fill_ratio) {
            errors.push("Font fill ratio must be between 0.0 and 1.0".to_string());
        }
    }
}

impl PageNumberSettings {
    pub fn collect_errors(&self, errors: &mut Vec<String>) {
        if !self.format.contains("{page}") {
            errors.push("Page number format must contain the {page} placeholder".to_string());
        }
        require_positive(
            errors,
            self.font_size_pt,
            "Page number font size must be greater than 0 pt",
        );
        require_non_negative(errors, self.offset_mm, "Page number offset must not be negative");
    }
}

impl DocumentSettings {
    /// Checks every record and reports all violations at once. Nothing is
    /// corrected here; callers decide what to do with the messages.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut messages = Vec::new();
        self.page.collect_errors(&mut messages);
        self.text.collect_errors(&mut messages);
        self.page_numbers.collect_errors(&mut messages);
        self.collect_fit_errors(&mut messages);

        if messages.is_empty() {
            Ok(())
        } else {
            Err(SettingsError { messages })
        }
    }

    /// Checks that depend on the text area. Skipped when the margins already
    /// leave no room, which is reported on its own.
    fn collect_fit_errors(&self, errors: &mut Vec<String>) {
        let page = &self.page;
        let area_width = page.width_mm - page.margin_left_mm - page.margin_right_mm;
        let area_height = page.height_mm - page.margin_top_mm - page.margin_bottom_mm;

        if area_width > 0.0 && self.text.indent_first_line_mm > area_width {
            errors.push(format!(
                "First-line indent ({:.1} mm) is wider than the {:.1} mm text area",
                self.text.indent_first_line_mm, area_width
            ));
        }

        let reserve = self.page_numbers.reserve_mm();
        if area_height > 0.0 && reserve >= area_height {
            errors.push(format!(
                "Page number reserve ({:.1} mm) leaves no room in the {:.1} mm tall text area",
                reserve, area_height
            ));
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
