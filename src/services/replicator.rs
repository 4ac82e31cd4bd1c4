//! Idempotent replication of HyP3 outputs into a destination bucket.
//!
//! A run has two phases. Planning looks up the project's jobs, derives the
//! candidate artifacts and keeps the ones missing from the destination.
//! Execution copies every planned task; failures are recorded per task and
//! never stop the batch.
//!
//! Existence is checked once at plan time. Two concurrent runs for the same
//! project can both copy a file; copies overwrite, so the result is the same.

use futures::stream::{self, StreamExt};
use std::time::Instant;

use crate::models::artifact::candidates_for_job;
use crate::models::job::Job;
use crate::models::transfer::{TransferOutcome, TransferReport, TransferTask};
use crate::services::hyp3::DirectoryError;
use crate::services::traits::{CopyRequest, JobDirectory, ObjectStore};

/// Default multipart threshold and part size (100 MiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 100 * 1024 * 1024;

/// Planned work for one project.
#[derive(Debug, Clone)]
pub struct TransferPlan {
    pub project_name: String,
    pub target_bucket: String,
    pub jobs: Vec<Job>,
    pub tasks: Vec<TransferTask>,
}

#[derive(Debug, thiserror::Error)]
pub enum ReplicateError {
    #[error("Job directory unavailable: {0}")]
    DirectoryUnavailable(#[from] DirectoryError),
}

pub struct Replicator<D, S> {
    directory: D,
    store: S,
    chunk_size: u64,
    max_concurrent_copies: usize,
}

impl<D: JobDirectory, S: ObjectStore> Replicator<D, S> {
    pub fn new(directory: D, store: S) -> Self {
        Self {
            directory,
            store,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_copies: 1,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_max_concurrent_copies(mut self, n: usize) -> Self {
        self.max_concurrent_copies = n.max(1);
        self
    }

    /// Find the project's artifacts that are missing from `target_bucket`.
    pub async fn plan(&self, project_name: &str, target_bucket: &str) -> Result<TransferPlan, ReplicateError> {
        let jobs = self.directory.find_jobs(project_name).await?;

        let mut tasks = Vec::new();
        for job in &jobs {
            for artifact in candidates_for_job(job, target_bucket) {
                if self.store.exists(&artifact.target_bucket, &artifact.target_key).await {
                    tracing::debug!(target_key = %artifact.target_key, "Already present, skipping");
                    continue;
                }
                tasks.push(TransferTask { artifact });
            }
        }

        tracing::info!(
            project = %project_name,
            jobs = jobs.len(),
            tasks = tasks.len(),
            "Transfer plan ready"
        );
        metrics::counter!("transfer_files_planned_total").increment(tasks.len() as u64);

        Ok(TransferPlan {
            project_name: project_name.to_string(),
            target_bucket: target_bucket.to_string(),
            jobs,
            tasks,
        })
    }

    /// Copy every task, at most `max_concurrent_copies` at a time.
    pub async fn execute(&self, tasks: Vec<TransferTask>) -> TransferReport {
        let planned = tasks.len();
        let outcomes: Vec<TransferOutcome> = stream::iter(tasks)
            .map(|task| self.run_task(task))
            .buffer_unordered(self.max_concurrent_copies)
            .collect()
            .await;

        let report = TransferReport { planned, outcomes };
        tracing::info!(
            planned = report.planned,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Transfer batch finished"
        );
        report
    }

    /// Plan and execute in one step.
    pub async fn replicate(&self, project_name: &str, target_bucket: &str) -> Result<TransferReport, ReplicateError> {
        let plan = self.plan(project_name, target_bucket).await?;
        Ok(self.execute(plan.tasks).await)
    }

    async fn run_task(&self, task: TransferTask) -> TransferOutcome {
        let artifact = &task.artifact;
        let request = CopyRequest {
            source_bucket: &artifact.source_bucket,
            source_key: &artifact.source_key,
            target_bucket: &artifact.target_bucket,
            target_key: &artifact.target_key,
            chunk_size: self.chunk_size,
        };

        tracing::info!(source = %task.source_uri(), target = %task.target_uri(), "Copying");
        let start = Instant::now();
        let result = self.store.copy(&request).await;
        metrics::histogram!("transfer_copy_seconds").record(start.elapsed().as_secs_f64());

        match result {
            Ok(strategy) => {
                metrics::counter!("transfer_copies_completed").increment(1);
                tracing::info!(
                    target_key = %artifact.target_key,
                    strategy = ?strategy,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Copy complete"
                );
                TransferOutcome::Copied { task, strategy }
            }
            Err(e) => {
                metrics::counter!("transfer_copies_failed").increment(1);
                tracing::error!(target_key = %artifact.target_key, error = %e, "Copy failed");
                TransferOutcome::Failed {
                    task,
                    error: e.to_string(),
                }
            }
        }
    }
}
