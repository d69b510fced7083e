use std::time::Duration;

use crate::config::Config;
use crate::errors::AppError;
use crate::gcode::registry::JobRegistry;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Export jobs, running and finished.
    pub jobs: JobRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let jobs = JobRegistry::new(Duration::from_secs(config.job_retention_secs));
        Self { config, jobs }
    }

    /// Rejects texts above the configured size limit.
    pub fn check_text_size(&self, text: &str) -> Result<(), AppError> {
        if text.len() > self.config.max_text_bytes {
            return Err(AppError::Validation(format!(
                "Text is {} bytes; the limit is {} bytes",
                text.len(),
                self.config.max_text_bytes
            )));
        }
        Ok(())
    }
}
