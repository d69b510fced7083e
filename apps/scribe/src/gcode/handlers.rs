//! Axum route handlers for the Export and G-code APIs.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::gcode::emitter::{
    estimate_print_time, generate_program, MachineOverrides, MachineSettings, PrintTimeEstimate,
};
use crate::gcode::registry::JobSnapshot;
use crate::gcode::validator::{validate, ValidationReport};
use crate::layout::handlers::{check_request, run_blocking, LayoutRequest};
use crate::layout::pagination::PageManager;
use crate::models::settings::DocumentSettings;
use crate::state::AppState;

/// Lines returned by the stream preview when the request does not say.
const DEFAULT_PREVIEW_LINES: usize = 40;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub text: String,
    #[serde(default)]
    pub settings: DocumentSettings,
    /// Caller's document key; one running export per key.
    pub document_id: Option<String>,
    pub machine: Option<MachineOverrides>,
}

#[derive(Debug, Deserialize)]
pub struct GcodePreviewRequest {
    pub text: String,
    #[serde(default)]
    pub settings: DocumentSettings,
    pub machine: Option<MachineOverrides>,
    pub max_lines: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct GcodePreviewResponse {
    pub lines: Vec<String>,
    pub total_lines: usize,
    pub truncated: bool,
}

#[derive(Debug, Deserialize)]
pub struct ValidateGcodeRequest {
    pub gcode: String,
}

#[derive(Debug, Serialize)]
pub struct ValidateGcodeResponse {
    #[serde(flatten)]
    pub report: ValidationReport,
    pub messages: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn resolve_machine(
    state: &AppState,
    overrides: Option<&MachineOverrides>,
) -> Result<MachineSettings, AppError> {
    let machine = state.config.machine.with_overrides(overrides);
    machine.validate().map_err(AppError::Validation)?;
    Ok(machine)
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/export
///
/// Paginates the text and starts a background emission job.
/// Returns 202 with the job snapshot; poll `GET /api/v1/export/:job_id`.
pub async fn handle_export(
    State(state): State<AppState>,
    Json(req): Json<ExportRequest>,
) -> Result<(StatusCode, Json<JobSnapshot>), AppError> {
    check_request(&state, &req.text, &req.settings)?;
    let machine = resolve_machine(&state, req.machine.as_ref())?;

    let ExportRequest {
        text,
        settings,
        document_id,
        ..
    } = req;

    let (pages, settings) = run_blocking("export pagination", move || {
        let pages = PageManager::new(&settings).paginate(&text);
        Ok((pages, settings))
    })
    .await?;

    let snapshot = state
        .jobs
        .submit(document_id, pages, settings, machine)
        .await?;
    info!(
        job_id = %snapshot.job_id,
        document_id = ?snapshot.document_id,
        pages = snapshot.pages,
        "Export accepted"
    );

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// GET /api/v1/export/:job_id
pub async fn handle_export_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobSnapshot>, AppError> {
    Ok(Json(state.jobs.get(job_id).await?))
}

/// DELETE /api/v1/export/:job_id
///
/// Cooperative: the job stops at its next checkpoint. Poll for the final state.
pub async fn handle_export_cancel(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<(StatusCode, Json<JobSnapshot>), AppError> {
    let snapshot = state.jobs.cancel(job_id).await?;
    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

/// POST /api/v1/export/estimate
pub async fn handle_estimate(
    State(state): State<AppState>,
    Json(req): Json<LayoutRequest>,
) -> Result<Json<PrintTimeEstimate>, AppError> {
    check_request(&state, &req.text, &req.settings)?;
    let estimate = run_blocking("print time estimate", move || {
        let pages = PageManager::new(&req.settings).paginate(&req.text);
        Ok(estimate_print_time(&pages))
    })
    .await?;
    Ok(Json(estimate))
}

/// POST /api/v1/gcode/validate
pub async fn handle_validate_gcode(
    State(state): State<AppState>,
    Json(req): Json<ValidateGcodeRequest>,
) -> Result<Json<ValidateGcodeResponse>, AppError> {
    state.check_text_size(&req.gcode)?;
    let report = run_blocking("G-code validation", move || Ok(validate(&req.gcode))).await?;
    Ok(Json(ValidateGcodeResponse {
        messages: report.messages(),
        report,
    }))
}

/// POST /api/v1/gcode/preview
///
/// Generates the program synchronously and returns its first lines.
pub async fn handle_gcode_preview(
    State(state): State<AppState>,
    Json(req): Json<GcodePreviewRequest>,
) -> Result<Json<GcodePreviewResponse>, AppError> {
    check_request(&state, &req.text, &req.settings)?;
    let machine = resolve_machine(&state, req.machine.as_ref())?;
    let max_lines = req.max_lines.unwrap_or(DEFAULT_PREVIEW_LINES);

    let response = run_blocking("G-code preview", move || {
        let pages = PageManager::new(&req.settings).paginate(&req.text);
        let program = generate_program(&pages, &req.settings, &machine)?;
        let total_lines = program.lines().count();
        let lines: Vec<String> = program
            .lines()
            .take(max_lines)
            .map(str::to_string)
            .collect();
        Ok(GcodePreviewResponse {
            truncated: total_lines > lines.len(),
            total_lines,
            lines,
        })
    })
    .await?;

    Ok(Json(response))
}
