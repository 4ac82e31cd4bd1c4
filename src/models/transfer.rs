use serde::{Deserialize, Serialize};

use crate::models::artifact::CandidateArtifact;

/// A candidate artifact confirmed absent from the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferTask {
    pub artifact: CandidateArtifact,
}

impl TransferTask {
    pub fn source_uri(&self) -> String {
        format!("s3://{}/{}", self.artifact.source_bucket, self.artifact.source_key)
    }

    pub fn target_uri(&self) -> String {
        format!("s3://{}/{}", self.artifact.target_bucket, self.artifact.target_key)
    }
}

/// How the object store carried out a copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyStrategy {
    SingleRequest,
    Multipart { parts: usize },
}

/// Result of executing one transfer task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransferOutcome {
    Copied {
        task: TransferTask,
        strategy: CopyStrategy,
    },
    Failed {
        task: TransferTask,
        error: String,
    },
}

impl TransferOutcome {
    pub fn task(&self) -> &TransferTask {
        match self {
            TransferOutcome::Copied { task, .. } | TransferOutcome::Failed { task, .. } => task,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Copied { .. })
    }
}

/// Aggregate result of one execute phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferReport {
    pub planned: usize,
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Failed tasks with their error messages.
    pub fn failures(&self) -> impl Iterator<Item = (&TransferTask, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            TransferOutcome::Failed { task, error } => Some((task, error.as_str())),
            TransferOutcome::Copied { .. } => None,
        })
    }

    pub fn is_complete_success(&self) -> bool {
        self.failed() == 0 && self.outcomes.len() == self.planned
    }
}
