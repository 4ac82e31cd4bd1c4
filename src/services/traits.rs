//! Seams between the replicator and the services it drives.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::job::Job;
use crate::models::transfer::CopyStrategy;
use crate::services::hyp3::DirectoryError;
use crate::services::storage::StorageError;

/// Source of job records for a project.
#[async_trait]
pub trait JobDirectory: Send + Sync {
    /// All jobs whose name equals `name`, in no particular order.
    async fn find_jobs(&self, name: &str) -> Result<Vec<Job>, DirectoryError>;
}

/// One server-side copy between two bucket/key locations.
#[derive(Debug, Clone, Copy)]
pub struct CopyRequest<'a> {
    pub source_bucket: &'a str,
    pub source_key: &'a str,
    pub target_bucket: &'a str,
    pub target_key: &'a str,
    /// Objects at least this large are copied in parts of this size.
    pub chunk_size: u64,
}

/// Bucket/key addressed storage with existence checks and server-side copy.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Whether the object exists. Lookup failures report `false`.
    async fn exists(&self, bucket: &str, key: &str) -> bool;

    /// Copy without downloading, returning the strategy used.
    async fn copy(&self, request: &CopyRequest<'_>) -> Result<CopyStrategy, StorageError>;
}

#[async_trait]
impl<T: JobDirectory + ?Sized> JobDirectory for Arc<T> {
    async fn find_jobs(&self, name: &str) -> Result<Vec<Job>, DirectoryError> {
        (**self).find_jobs(name).await
    }
}

#[async_trait]
impl<T: ObjectStore + ?Sized> ObjectStore for Arc<T> {
    async fn exists(&self, bucket: &str, key: &str) -> bool {
        (**self).exists(bucket, key).await
    }

    async fn copy(&self, request: &CopyRequest<'_>) -> Result<CopyStrategy, StorageError> {
        (**self).copy(request).await
    }
}
