//! In-memory tracking of export jobs for the HTTP surface.
//!
//! Each submitted export gets an entry keyed by job id. A driver task drains
//! the job's events into the entry and, once the worker ends, records the
//! program with its validation report or the failure. At most one job per
//! `document_id` may be running at a time. Finished jobs are kept for a
//! retention window and pruned on the next submit after it lapses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::gcode::emitter::{EmissionError, MachineSettings};
use crate::gcode::job::{spawn_emission, CancelHandle, JobEvent};
use crate::gcode::validator::{validate, ValidationReport};
use crate::layout::pagination::Page;
use crate::models::settings::DocumentSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Running)
    }
}

/// Point-in-time view of a job, as returned by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub document_id: Option<String>,
    pub state: JobState,
    pub progress: u8,
    pub status: String,
    pub pages: usize,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub gcode: Option<String>,
    pub validation: Option<ValidationReport>,
}

struct JobEntry {
    snapshot: JobSnapshot,
    cancel: CancelHandle,
}

/// How long finished jobs stay readable when no retention is configured.
pub const DEFAULT_RETENTION: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobEntry>>>,
    retention: Duration,
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION)
    }
}

impl JobRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: Arc::default(),
            retention,
        }
    }

    /// Starts an export and returns its initial snapshot.
    pub async fn submit(
        &self,
        document_id: Option<String>,
        pages: Vec<Page>,
        settings: DocumentSettings,
        machine: MachineSettings,
    ) -> Result<JobSnapshot, AppError> {
        let mut jobs = self.jobs.write().await;
        prune_expired(&mut jobs, self.retention, Utc::now());

        if let Some(doc) = &document_id {
            let busy = jobs.values().any(|entry| {
                entry.snapshot.state == JobState::Running
                    && entry.snapshot.document_id.as_deref() == Some(doc.as_str())
            });
            if busy {
                return Err(AppError::Conflict(format!(
                    "Document '{doc}' already has an export in progress"
                )));
            }
        }

        let page_count = pages.len();
        let job = spawn_emission(pages, settings, machine);
        let job_id = job.id;
        let cancel = job.cancel_handle();

        let snapshot = JobSnapshot {
            job_id,
            document_id,
            state: JobState::Running,
            progress: 0,
            status: "Queued".to_string(),
            pages: page_count,
            created_at: Utc::now(),
            finished_at: None,
            error: None,
            gcode: None,
            validation: None,
        };
        jobs.insert(
            job_id,
            JobEntry {
                snapshot: snapshot.clone(),
                cancel,
            },
        );
        drop(jobs);

        let registry = self.clone();
        let (mut events, outcome) = job.into_parts();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                registry.apply_event(job_id, event).await;
            }
            let result = outcome.wait().await;
            registry.finish(job_id, result).await;
        });

        Ok(snapshot)
    }

    pub async fn get(&self, job_id: Uuid) -> Result<JobSnapshot, AppError> {
        self.jobs
            .read()
            .await
            .get(&job_id)
            .map(|entry| entry.snapshot.clone())
            .ok_or_else(|| AppError::NotFound(format!("Export job {job_id} not found")))
    }

    /// Requests cancellation. Finished jobs are returned unchanged.
    pub async fn cancel(&self, job_id: Uuid) -> Result<JobSnapshot, AppError> {
        let jobs = self.jobs.read().await;
        let entry = jobs
            .get(&job_id)
            .ok_or_else(|| AppError::NotFound(format!("Export job {job_id} not found")))?;

        if !entry.snapshot.state.is_terminal() {
            debug!(job_id = %job_id, "Cancellation requested");
            entry.cancel.cancel();
        }
        Ok(entry.snapshot.clone())
    }

    async fn apply_event(&self, job_id: Uuid, event: JobEvent) {
        let mut jobs = self.jobs.write().await;
        let Some(entry) = jobs.get_mut(&job_id) else {
            return;
        };
        match event {
            JobEvent::Progress(percent) => entry.snapshot.progress = percent,
            JobEvent::Status(status) => entry.snapshot.status = status,
        }
    }

    async fn finish(&self, job_id: Uuid, result: Result<String, EmissionError>) {
        let result = match result {
            Ok(program) => tokio::task::spawn_blocking(move || {
                let report = validate(&program);
                (program, report)
            })
            .await
            .map_err(|e| EmissionError::WorkerPanicked(format!("validation task failed: {e}"))),
            Err(e) => Err(e),
        };

        let mut jobs = self.jobs.write().await;
        let Some(entry) = jobs.get_mut(&job_id) else {
            return;
        };
        let snapshot = &mut entry.snapshot;
        snapshot.finished_at = Some(Utc::now());

        match result {
            Ok((program, report)) => {
                if !report.ok {
                    warn!(job_id = %job_id, errors = report.errors().count(), "Generated G-code failed validation");
                }
                snapshot.state = JobState::Completed;
                snapshot.progress = 100;
                snapshot.gcode = Some(program);
                snapshot.validation = Some(report);
            }
            Err(EmissionError::Cancelled) => {
                snapshot.state = JobState::Cancelled;
                snapshot.status = "Cancelled".to_string();
            }
            Err(e) => {
                snapshot.state = JobState::Failed;
                snapshot.error = Some(e.to_string());
            }
        }
    }

    /// Registers a running entry for `document_id` without spawning work.
    #[cfg(test)]
    pub(crate) async fn insert_running(&self, document_id: &str) -> Uuid {
        let job_id = Uuid::new_v4();
        let snapshot = JobSnapshot {
            job_id,
            document_id: Some(document_id.to_string()),
            state: JobState::Running,
            progress: 0,
            status: "Queued".to_string(),
            pages: 0,
            created_at: Utc::now(),
            finished_at: None,
            error: None,
            gcode: None,
            validation: None,
        };
        self.jobs.write().await.insert(
            job_id,
            JobEntry {
                snapshot,
                cancel: CancelHandle::default(),
            },
        );
        job_id
    }
}

/// Drops finished jobs whose `finished_at` is at least `retention` old.
fn prune_expired(jobs: &mut HashMap<Uuid, JobEntry>, retention: Duration, now: DateTime<Utc>) {
    let before = jobs.len();
    jobs.retain(|_, entry| match entry.snapshot.finished_at {
        Some(finished_at) => (now - finished_at)
            .to_std()
            .map(|age| age < retention)
            .unwrap_or(true),
        None => true,
    });
    let pruned = before - jobs.len();
    if pruned > 0 {
        debug!(pruned, remaining = jobs.len(), "Pruned finished export jobs");
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
