//! In-memory stand-ins for HyP3 and S3
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Mutex;

use hyp3_transfer::models::job::Job;
use hyp3_transfer::models::transfer::CopyStrategy;
use hyp3_transfer::services::hyp3::DirectoryError;
use hyp3_transfer::services::storage::StorageError;
use hyp3_transfer::services::traits::{CopyRequest, JobDirectory, ObjectStore};

/// Job directory serving a fixed job list, or failing every lookup.
pub struct FakeDirectory {
    jobs: Vec<Job>,
    unavailable: bool,
}

impl FakeDirectory {
    pub fn with_jobs(jobs: Vec<Job>) -> Self {
        Self {
            jobs,
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            jobs: Vec::new(),
            unavailable: true,
        }
    }
}

#[async_trait]
impl JobDirectory for FakeDirectory {
    async fn find_jobs(&self, name: &str) -> Result<Vec<Job>, DirectoryError> {
        if self.unavailable {
            return Err(DirectoryError::Unavailable("connection refused".to_string()));
        }
        Ok(self.jobs.iter().filter(|j| j.name == name).cloned().collect())
    }
}

/// A copy attempt seen by [`FakeStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCopy {
    pub source: String,
    pub target: String,
    pub chunk_size: u64,
}

/// Object store over a set of `bucket/key` strings.
#[derive(Default)]
pub struct FakeStore {
    objects: Mutex<HashSet<String>>,
    broken_lookups: HashSet<String>,
    failing_copies: HashSet<String>,
    copies: Mutex<Vec<RecordedCopy>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an object.
    pub fn with_object(self, bucket: &str, key: &str) -> Self {
        self.objects.lock().unwrap().insert(format!("{}/{}", bucket, key));
        self
    }

    /// Make lookups of `key` fail.
    pub fn with_broken_lookup(mut self, key: &str) -> Self {
        self.broken_lookups.insert(key.to_string());
        self
    }

    /// Make copies to `target_key` fail.
    pub fn with_failing_copy(mut self, target_key: &str) -> Self {
        self.failing_copies.insert(target_key.to_string());
        self
    }

    pub fn copies(&self) -> Vec<RecordedCopy> {
        self.copies.lock().unwrap().clone()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects.lock().unwrap().contains(&format!("{}/{}", bucket, key))
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn exists(&self, bucket: &str, key: &str) -> bool {
        if self.broken_lookups.contains(key) {
            return false;
        }
        self.contains(bucket, key)
    }

    async fn copy(&self, request: &CopyRequest<'_>) -> Result<CopyStrategy, StorageError> {
        self.copies.lock().unwrap().push(RecordedCopy {
            source: format!("{}/{}", request.source_bucket, request.source_key),
            target: format!("{}/{}", request.target_bucket, request.target_key),
            chunk_size: request.chunk_size,
        });

        if self.failing_copies.contains(request.target_key) {
            return Err(StorageError::Copy("AccessDenied".to_string()));
        }

        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", request.target_bucket, request.target_key));
        Ok(CopyStrategy::SingleRequest)
    }
}
