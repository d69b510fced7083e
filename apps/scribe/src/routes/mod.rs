pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::gcode::handlers as gcode;
use crate::layout::handlers as layout;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Settings
        .route(
            "/api/v1/settings/validate",
            post(layout::handle_validate_settings),
        )
        // Layout API
        .route("/api/v1/layout/preview", post(layout::handle_preview))
        .route("/api/v1/layout/statistics", post(layout::handle_statistics))
        .route("/api/v1/layout/fit", post(layout::handle_fit))
        // Export API
        .route("/api/v1/export", post(gcode::handle_export))
        .route("/api/v1/export/estimate", post(gcode::handle_estimate))
        .route(
            "/api/v1/export/:job_id",
            get(gcode::handle_export_status).delete(gcode::handle_export_cancel),
        )
        // G-code API
        .route("/api/v1/gcode/validate", post(gcode::handle_validate_gcode))
        .route("/api/v1/gcode/preview", post(gcode::handle_gcode_preview))
        .with_state(state)
}
