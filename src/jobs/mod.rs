//! Background processing jobs
//!
//! A web request starts a pipeline run and returns at once; the job keeps the
//! run's stage, slide counters and final outcome so clients can poll it.
//!
//! Runs share one slide table on disk, so they execute one at a time: a job
//! stays `Queued` until the previous run has finished. Only the newest
//! [`MAX_FINISHED_JOBS`] finished jobs are retained.

use crate::document::Document;
use crate::pipeline::{PipelineOrchestrator, PipelineProgress, PipelineStage, RunReport};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use uuid::Uuid;

/// Finished jobs kept for polling; older ones are dropped
pub const MAX_FINISHED_JOBS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub id: Uuid,
    pub document: String,
    pub status: JobStatus,
    pub stage: PipelineStage,
    pub detail: String,
    pub completed_slides: usize,
    pub total_slides: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<RunReport>,
}

impl JobInfo {
    fn new(id: Uuid, document: &Document) -> Self {
        Self {
            id,
            document: document.to_string(),
            status: JobStatus::Queued,
            stage: PipelineStage::Init,
            detail: String::new(),
            completed_slides: 0,
            total_slides: 0,
            started_at: Utc::now(),
            finished_at: None,
            error: None,
            report: None,
        }
    }

    fn apply(&mut self, progress: PipelineProgress) {
        self.status = JobStatus::Running;
        self.stage = progress.stage;
        self.detail = progress.detail;
        if progress.total_slides > 0 {
            self.completed_slides = progress.completed_slides;
            self.total_slides = progress.total_slides;
        }
    }
}

/// Thread-safe registry of pipeline jobs
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, JobInfo>>>,
    run_lock: Arc<Mutex<()>>,
}

/// Drop the oldest finished jobs beyond `keep`; queued and running jobs stay
fn prune_finished(jobs: &mut HashMap<Uuid, JobInfo>, keep: usize) {
    let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
        .values()
        .filter(|j| j.status.is_finished())
        .map(|j| (j.finished_at.unwrap_or(j.started_at), j.id))
        .collect();
    if finished.len() <= keep {
        return;
    }
    finished.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, id) in finished.into_iter().skip(keep) {
        jobs.remove(&id);
    }
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a pipeline run and return its id immediately
    pub async fn start(&self, orchestrator: Arc<PipelineOrchestrator>, document: Document) -> Uuid {
        let id = Uuid::new_v4();
        self.jobs.write().await.insert(id, JobInfo::new(id, &document));
        tracing::info!("Job {} queued for {}", id, document);

        let (progress_tx, mut progress_rx) = mpsc::channel::<PipelineProgress>(32);

        let jobs = Arc::clone(&self.jobs);
        let forwarder = tokio::spawn(async move {
            while let Some(progress) = progress_rx.recv().await {
                if let Some(job) = jobs.write().await.get_mut(&id) {
                    job.apply(progress);
                }
            }
        });

        let jobs = Arc::clone(&self.jobs);
        let run_lock = Arc::clone(&self.run_lock);
        tokio::spawn(async move {
            let result = {
                let _guard = run_lock.lock().await;
                tracing::debug!("Job {} acquired the run lock", id);
                orchestrator.run(&document, Some(progress_tx)).await
            };
            // Sender dropped with the run; drain remaining updates first
            let _ = forwarder.await;

            let mut guard = jobs.write().await;
            let Some(job) = guard.get_mut(&id) else {
                return;
            };
            job.finished_at = Some(Utc::now());
            match result {
                Ok(report) => {
                    job.status = JobStatus::Succeeded;
                    job.stage = PipelineStage::Done;
                    job.report = Some(report);
                }
                Err(e) => {
                    job.status = JobStatus::Failed;
                    job.stage = PipelineStage::Failed;
                    job.error = Some(e.to_string());
                }
            }
            tracing::info!("Job {} finished: {:?}", id, job.status);
            prune_finished(&mut *guard, MAX_FINISHED_JOBS);
        });

        id
    }

    pub async fn get(&self, id: Uuid) -> Option<JobInfo> {
        self.jobs.read().await.get(&id).cloned()
    }

    /// All jobs, newest first
    pub async fn list(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }
}
