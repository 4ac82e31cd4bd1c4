use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client;

use crate::models::transfer::CopyStrategy;
use crate::services::traits::{CopyRequest, ObjectStore};

/// S3 refuses multipart uploads with more parts than this.
pub const MAX_PARTS: u64 = 10_000;

/// An inclusive byte range of the source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// `x-amz-copy-source-range` header value.
    pub fn header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// Split an object of `size` bytes into `chunk_size` parts.
///
/// The part size grows when `chunk_size` would need more than
/// [`MAX_PARTS`] parts. The last part holds the remainder.
pub fn plan_parts(size: u64, chunk_size: u64) -> Vec<ByteRange> {
    if size == 0 {
        return Vec::new();
    }
    let part_size = chunk_size.max(size.div_ceil(MAX_PARTS)).max(1);

    (0..size)
        .step_by(part_size as usize)
        .map(|start| ByteRange {
            start,
            end: (start + part_size).min(size) - 1,
        })
        .collect()
}

/// Single request below `chunk_size`, multipart at or above it.
pub fn strategy_for(size: u64, chunk_size: u64) -> CopyStrategy {
    if size < chunk_size {
        CopyStrategy::SingleRequest
    } else {
        CopyStrategy::Multipart {
            parts: plan_parts(size, chunk_size).len(),
        }
    }
}

/// `CopySource` value: the bucket followed by the percent-encoded key.
pub fn copy_source(bucket: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", bucket, encoded.join("/"))
}

/// Client for S3 server-side copies between buckets.
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build a client from the default credential chain.
    ///
    /// A custom endpoint switches to path-style addressing for S3-compatible
    /// stores.
    pub async fn new(region: &str, endpoint_url: Option<&str>, max_attempts: u32) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .retry_config(RetryConfig::standard().with_max_attempts(max_attempts));

        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(endpoint_url.is_some())
            .build();

        Self {
            client: Client::from_conf(s3_config),
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Size of an object, or `None` if it does not exist.
    pub async fn object_size(&self, bucket: &str, key: &str) -> Result<Option<u64>, StorageError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(output) => Ok(Some(output.content_length().unwrap_or(0).max(0) as u64)),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(None)
                } else {
                    Err(StorageError::Lookup {
                        location: format!("{}/{}", bucket, key),
                        message: DisplayErrorContext(&service_err).to_string(),
                    })
                }
            }
        }
    }

    async fn copy_single(&self, request: &CopyRequest<'_>, source: &str) -> Result<(), StorageError> {
        self.client
            .copy_object()
            .copy_source(source)
            .bucket(request.target_bucket)
            .key(request.target_key)
            .send()
            .await
            .map_err(|e| StorageError::Copy(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn copy_multipart(
        &self,
        request: &CopyRequest<'_>,
        source: &str,
        size: u64,
    ) -> Result<usize, StorageError> {
        let upload = self
            .client
            .create_multipart_upload()
            .bucket(request.target_bucket)
            .key(request.target_key)
            .send()
            .await
            .map_err(|e| StorageError::Multipart(DisplayErrorContext(&e).to_string()))?;

        let upload_id = upload
            .upload_id()
            .ok_or_else(|| StorageError::Multipart("no upload id returned".to_string()))?
            .to_string();

        let parts = plan_parts(size, request.chunk_size);
        match self.copy_parts(request, source, &upload_id, &parts).await {
            Ok(completed) => {
                self.client
                    .complete_multipart_upload()
                    .bucket(request.target_bucket)
                    .key(request.target_key)
                    .upload_id(&upload_id)
                    .multipart_upload(
                        CompletedMultipartUpload::builder()
                            .set_parts(Some(completed))
                            .build(),
                    )
                    .send()
                    .await
                    .map_err(|e| StorageError::Multipart(DisplayErrorContext(&e).to_string()))?;
                Ok(parts.len())
            }
            Err(e) => {
                if let Err(abort_err) = self
                    .client
                    .abort_multipart_upload()
                    .bucket(request.target_bucket)
                    .key(request.target_key)
                    .upload_id(&upload_id)
                    .send()
                    .await
                {
                    tracing::warn!(
                        upload_id = %upload_id,
                        error = %DisplayErrorContext(&abort_err),
                        "Failed to abort multipart upload"
                    );
                }
                Err(e)
            }
        }
    }

    async fn copy_parts(
        &self,
        request: &CopyRequest<'_>,
        source: &str,
        upload_id: &str,
        parts: &[ByteRange],
    ) -> Result<Vec<CompletedPart>, StorageError> {
        let mut completed = Vec::with_capacity(parts.len());

        for (index, range) in parts.iter().enumerate() {
            let part_number = index as i32 + 1;
            let output = self
                .client
                .upload_part_copy()
                .bucket(request.target_bucket)
                .key(request.target_key)
                .upload_id(upload_id)
                .part_number(part_number)
                .copy_source(source)
                .copy_source_range(range.header())
                .send()
                .await
                .map_err(|e| StorageError::Multipart(DisplayErrorContext(&e).to_string()))?;

            let e_tag = output
                .copy_part_result()
                .and_then(|r| r.e_tag())
                .ok_or_else(|| StorageError::Multipart(format!("part {} returned no ETag", part_number)))?;

            tracing::trace!(part_number, range = %range.header(), "Copied part");
            completed.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(e_tag)
                    .build(),
            );
        }

        Ok(completed)
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn exists(&self, bucket: &str, key: &str) -> bool {
        match self.object_size(bucket, key).await {
            Ok(size) => size.is_some(),
            Err(e) => {
                tracing::warn!(error = %e, "Existence check failed, treating object as absent");
                false
            }
        }
    }

    async fn copy(&self, request: &CopyRequest<'_>) -> Result<CopyStrategy, StorageError> {
        let size = self
            .object_size(request.source_bucket, request.source_key)
            .await?
            .ok_or_else(|| {
                StorageError::Copy(format!(
                    "source object {}/{} does not exist",
                    request.source_bucket, request.source_key
                ))
            })?;

        let source = copy_source(request.source_bucket, request.source_key);

        match strategy_for(size, request.chunk_size) {
            CopyStrategy::SingleRequest => {
                self.copy_single(request, &source).await?;
                Ok(CopyStrategy::SingleRequest)
            }
            CopyStrategy::Multipart { .. } => {
                tracing::debug!(bytes = size, chunk_size = request.chunk_size, "Using multipart copy");
                let parts = self.copy_multipart(request, &source, size).await?;
                Ok(CopyStrategy::Multipart { parts })
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Lookup of {location} failed: {message}")]
    Lookup { location: String, message: String },

    #[error("Copy failed: {0}")]
    Copy(String),

    #[error("Multipart copy failed: {0}")]
    Multipart(String),
}
