//! Structural checks over a generated G-code stream.
//!
//! Parsing is line-based and lenient. Comment-only and blank lines are
//! skipped, inline `;` comments are stripped, and only the tokens the plotter
//! program relies on are interpreted. A stream counts as initialized once any
//! one of `G90`, `G21` or `G28` appears. Any error makes the report not-ok;
//! warnings never do.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::gcode::emitter::{ABSOLUTE_MODE, HOME, MILLIMETER_UNITS, PROGRAM_END};

/// Positions beyond this magnitude on either axis are flagged.
pub const COORDINATE_LIMIT_MM: f64 = 200.0;

const INIT_TOKENS: [&str; 3] = [ABSOLUTE_MODE, MILLIMETER_UNITS, HOME];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// 1-based source line; `None` for whole-program findings.
    pub line: Option<usize>,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {line}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub ok: bool,
    /// Errors first, then warnings, each group in source order.
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// Human-readable diagnostics in report order.
    pub fn messages(&self) -> Vec<String> {
        self.diagnostics.iter().map(ToString::to_string).collect()
    }
}

pub fn validate(stream: &str) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut seen_init = false;
    let mut seen_end = false;
    // Absolute position; axes omitted on a line keep their last value.
    let mut cursor = (0.0_f64, 0.0_f64);

    for (index, raw) in stream.lines().enumerate() {
        let line_no = index + 1;
        let code = raw.split(';').next().unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }

        let mut words = code.split_whitespace();
        let Some(command) = words.next().map(str::to_ascii_uppercase) else {
            continue;
        };

        if INIT_TOKENS.contains(&command.as_str()) {
            seen_init = true;
        }
        if command == PROGRAM_END {
            seen_end = true;
        }
        if !is_motion(&command) {
            continue;
        }

        let mut updated = false;
        for word in words {
            let mut chars = word.chars();
            let Some(axis) = chars.next().map(|c| c.to_ascii_uppercase()) else {
                continue;
            };
            let slot = match axis {
                'X' => &mut cursor.0,
                'Y' => &mut cursor.1,
                _ => continue,
            };

            let value = chars.as_str();
            match value.parse::<f64>() {
                Ok(v) if v.is_finite() => {
                    *slot = v;
                    updated = true;
                }
                _ => errors.push(Diagnostic {
                    line: Some(line_no),
                    severity: Severity::Error,
                    message: format!("Invalid {axis} coordinate '{value}'"),
                }),
            }
        }

        let (x, y) = cursor;
        if updated && (x.abs() > COORDINATE_LIMIT_MM || y.abs() > COORDINATE_LIMIT_MM) {
            warnings.push(Diagnostic {
                line: Some(line_no),
                severity: Severity::Warning,
                message: format!(
                    "Position ({x:.2}, {y:.2}) is outside the {COORDINATE_LIMIT_MM}x{COORDINATE_LIMIT_MM} mm workspace"
                ),
            });
        }
    }

    if !seen_init {
        errors.push(Diagnostic {
            line: None,
            severity: Severity::Error,
            message: format!(
                "Missing initialization command (one of {})",
                INIT_TOKENS.join(", ")
            ),
        });
    }
    if !seen_end {
        warnings.push(Diagnostic {
            line: None,
            severity: Severity::Warning,
            message: format!("Missing program end command ({PROGRAM_END})"),
        });
    }

    let ok = errors.is_empty();
    debug!(
        errors = errors.len(),
        warnings = warnings.len(),
        "Validated G-code stream"
    );
    errors.extend(warnings);
    ValidationReport {
        ok,
        diagnostics: errors,
    }
}

fn is_motion(command: &str) -> bool {
    matches!(command, "G0" | "G00" | "G1" | "G01")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
