//! Axum route handlers for the Layout API.
//!
//! Layout is CPU-bound, so every handler hands the work to
//! `tokio::task::spawn_blocking` after validating the request.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::layout::pagination::{FitReport, Page, PageManager, TextStatistics};
use crate::layout::units::Bounds;
use crate::models::settings::DocumentSettings;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LayoutRequest {
    pub text: String,
    #[serde(default)]
    pub settings: DocumentSettings,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub text: String,
    #[serde(default)]
    pub settings: DocumentSettings,
    /// 0-based page the editor is showing; clamped to the page range.
    #[serde(default)]
    pub current_page: usize,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub pages: Vec<Page>,
    pub page_count: usize,
    pub current_page: usize,
    pub adaptive_font_size_pt: f64,
    pub char_width_mm: f64,
    pub line_height_mm: f64,
    pub available_height_mm: f64,
    /// Grid cell as drawn on screen at the page DPI.
    pub grid_size_px: i64,
    pub text_area_mm: Bounds<f64>,
    pub text_area_px: Bounds<i64>,
}

#[derive(Debug, Serialize)]
pub struct SettingsValidationResponse {
    pub valid: bool,
    pub errors: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Runs CPU-bound work on the blocking pool and maps a join failure to
/// `AppError::Internal`.
pub(crate) async fn run_blocking<T, F>(what: &'static str, work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("spawn_blocking failed in {what}: {e}")))?
}

/// Size limit plus settings validation shared by every text endpoint.
pub(crate) fn check_request(
    state: &AppState,
    text: &str,
    settings: &DocumentSettings,
) -> Result<(), AppError> {
    state.check_text_size(text)?;
    settings.validate()?;
    Ok(())
}

fn clamp_page(requested: usize, page_count: usize) -> usize {
    requested.min(page_count.saturating_sub(1))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/settings/validate
pub async fn handle_validate_settings(
    Json(settings): Json<DocumentSettings>,
) -> Json<SettingsValidationResponse> {
    let errors = match settings.validate() {
        Ok(()) => Vec::new(),
        Err(e) => e.messages,
    };
    Json(SettingsValidationResponse {
        valid: errors.is_empty(),
        errors,
    })
}

/// POST /api/v1/layout/preview
///
/// Returns the paginated line model the editor draws, regenerated from
/// scratch on every call.
pub async fn handle_preview(
    State(state): State<AppState>,
    Json(req): Json<PreviewRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    check_request(&state, &req.text, &req.settings)?;

    let response = run_blocking("layout preview", move || {
        let manager = PageManager::new(&req.settings);
        let geometry = manager.geometry();
        let pages = manager.paginate(&req.text);
        let font_pt = geometry.adaptive_font_size_pt();

        Ok(PreviewResponse {
            page_count: pages.len(),
            current_page: clamp_page(req.current_page, pages.len()),
            adaptive_font_size_pt: font_pt,
            char_width_mm: geometry.char_width_mm(font_pt),
            line_height_mm: geometry.line_height_mm(font_pt),
            available_height_mm: manager.available_height_mm(),
            grid_size_px: geometry.mm_to_px(geometry.page().grid_size_mm),
            text_area_mm: geometry.text_area_bounds_mm(),
            text_area_px: geometry.text_area_bounds_px(),
            pages,
        })
    })
    .await?;

    Ok(Json(response))
}

/// POST /api/v1/layout/statistics
pub async fn handle_statistics(
    State(state): State<AppState>,
    Json(req): Json<LayoutRequest>,
) -> Result<Json<TextStatistics>, AppError> {
    check_request(&state, &req.text, &req.settings)?;
    let stats = run_blocking("text statistics", move || {
        Ok(PageManager::new(&req.settings).statistics(&req.text))
    })
    .await?;
    Ok(Json(stats))
}

/// POST /api/v1/layout/fit
///
/// Advisory: a report with `fits: false` is still a 200.
pub async fn handle_fit(
    State(state): State<AppState>,
    Json(req): Json<LayoutRequest>,
) -> Result<Json<FitReport>, AppError> {
    check_request(&state, &req.text, &req.settings)?;
    let report = run_blocking("fit check", move || {
        Ok(PageManager::new(&req.settings).validate_fits(&req.text))
    })
    .await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 0), 0);
        assert_eq!(clamp_page(5, 3), 2);
        assert_eq!(clamp_page(1, 3), 1);
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_result() {
        let value = run_blocking("test", || Ok(7)).await.unwrap();
        assert_eq!(value, 7);

        let err = run_blocking::<(), _>("test", || Err(AppError::Validation("no".into())))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
