//! Background G-code generation.
//!
//! Emission is CPU-bound, so it runs on the blocking pool. The caller gets an
//! [`EmissionJob`]: a stream of progress/status events, a cancel handle, and a
//! future for the final program. Cancellation is cooperative; the worker
//! checks the flag before each line record and between pages.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::gcode::emitter::{emit_program, EmissionError, EmissionObserver, MachineSettings};
use crate::layout::pagination::Page;
use crate::models::settings::DocumentSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Progress(u8),
    Status(String),
}

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Forwards observer callbacks onto the job's event channel. A dropped
/// receiver is not an error; the program is still produced.
struct ChannelObserver {
    events: mpsc::UnboundedSender<JobEvent>,
    cancel: CancelHandle,
}

impl EmissionObserver for ChannelObserver {
    fn on_progress(&mut self, percent: u8) {
        let _ = self.events.send(JobEvent::Progress(percent));
    }

    fn on_status(&mut self, status: &str) {
        let _ = self.events.send(JobEvent::Status(status.to_string()));
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

pub struct EmissionJob {
    pub id: Uuid,
    pub events: mpsc::UnboundedReceiver<JobEvent>,
    cancel: CancelHandle,
    worker: JoinHandle<Result<String, EmissionError>>,
}

impl EmissionJob {
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Splits the job so events and the outcome can be consumed by
    /// different tasks.
    pub fn into_parts(self) -> (mpsc::UnboundedReceiver<JobEvent>, JobOutcome) {
        (
            self.events,
            JobOutcome {
                id: self.id,
                worker: self.worker,
            },
        )
    }

    pub async fn wait(self) -> Result<String, EmissionError> {
        let (_events, outcome) = self.into_parts();
        outcome.wait().await
    }
}

pub struct JobOutcome {
    id: Uuid,
    worker: JoinHandle<Result<String, EmissionError>>,
}

impl JobOutcome {
    /// Resolves with the program, the cancellation, or the failure. A worker
    /// that panicked surfaces as [`EmissionError::WorkerPanicked`].
    pub async fn wait(self) -> Result<String, EmissionError> {
        let result = self
            .worker
            .await
            .map_err(|e| EmissionError::WorkerPanicked(e.to_string()))
            .and_then(|r| r);

        match &result {
            Ok(program) => info!(job_id = %self.id, bytes = program.len(), "G-code job finished"),
            Err(EmissionError::Cancelled) => info!(job_id = %self.id, "G-code job cancelled"),
            Err(e) => warn!(job_id = %self.id, error = %e, "G-code job failed"),
        }
        result
    }
}

/// Starts emission on the blocking pool and returns immediately.
/// Must be called from within a Tokio runtime.
pub fn spawn_emission(
    pages: Vec<Page>,
    settings: DocumentSettings,
    machine: MachineSettings,
) -> EmissionJob {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancelHandle::default();

    info!(job_id = %id, pages = pages.len(), "G-code job started");

    let mut observer = ChannelObserver {
        events: tx,
        cancel: cancel.clone(),
    };
    let worker = tokio::task::spawn_blocking(move || {
        debug!(job_id = %id, "G-code worker running");
        emit_program(&pages, &settings, &machine, &mut observer)
    });

    EmissionJob {
        id,
        events: rx,
        cancel,
        worker,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::pagination::PageManager;
    use crate::layout::wrap::LineRecord;

    fn make_settings() -> DocumentSettings {
        let mut settings = DocumentSettings::default();
        settings.page_numbers.enabled = false;
        settings
    }

    fn make_pages(settings: &DocumentSettings, lines: usize) -> Vec<Page> {
        let text = (1..=lines)
            .map(|i| format!("line number {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        PageManager::new(settings).paginate(&text)
    }

    #[tokio::test]
    async fn test_job_produces_program_and_events() {
        let settings = make_settings();
        let pages = make_pages(&settings, 40);
        let page_count = pages.len();

        let job = spawn_emission(pages, settings, MachineSettings::default());
        let (mut events, outcome) = job.into_parts();
        let program = outcome.wait().await.unwrap();
        assert!(program.contains("M30"));

        let mut received = Vec::new();
        while let Some(event) = events.recv().await {
            received.push(event);
        }

        let progress: Vec<u8> = received
            .iter()
            .filter_map(|e| match e {
                JobEvent::Progress(p) => Some(*p),
                JobEvent::Status(_) => None,
            })
            .collect();
        assert_eq!(progress.len(), page_count);
        assert_eq!(progress.last(), Some(&100));
        assert_eq!(
            received.first(),
            Some(&JobEvent::Status("Starting G-code generation...".to_string()))
        );
        assert!(received.contains(&JobEvent::Status("Processing page 2...".to_string())));
    }

    #[test]
    fn test_cancel_before_work_yields_cancelled() {
        let settings = make_settings();
        // A single page with many records gives the worker a per-record check.
        let pages = vec![Page {
            lines: vec![LineRecord::Text("x".to_string()); 500],
        }];

        let cancel = CancelHandle::default();
        cancel.cancel();
        let mut observer = ChannelObserver {
            events: mpsc::unbounded_channel().0,
            cancel,
        };
        let result = emit_program(&pages, &settings, &MachineSettings::default(), &mut observer);
        assert_eq!(result, Err(EmissionError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_handle_reaches_worker() {
        let settings = make_settings();
        let pages = make_pages(&settings, 200);

        let job = spawn_emission(pages, settings, MachineSettings::default());
        let handle = job.cancel_handle();
        handle.cancel();
        assert!(handle.is_cancelled());

        // The worker may already have finished; either outcome is well-formed.
        match job.wait().await {
            Ok(program) => assert!(program.contains("M30")),
            Err(e) => assert_eq!(e, EmissionError::Cancelled),
        }
    }

    #[tokio::test]
    async fn test_dropped_event_receiver_does_not_fail_job() {
        let settings = make_settings();
        let pages = make_pages(&settings, 5);
        let job = spawn_emission(pages, settings, MachineSettings::default());
        let (events, outcome) = job.into_parts();
        drop(events);
        assert!(outcome.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_invalid_settings_fail_job() {
        let mut settings = make_settings();
        settings.page.grid_size_mm = 0.0;
        let job = spawn_emission(vec![], settings, MachineSettings::default());
        assert!(matches!(job.wait().await, Err(EmissionError::Failed(_))));
    }
}
