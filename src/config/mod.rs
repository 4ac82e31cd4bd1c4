use garde::Validate;
use serde::Deserialize;

/// Smallest part size S3 accepts for a multipart upload (5 MiB).
pub const MIN_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Largest object S3 copies in a single request (5 GiB).
pub const MAX_CHUNK_SIZE: u64 = 5 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TransferConfig {
    /// HyP3 API base URL
    #[serde(default = "default_hyp3_api_url")]
    #[garde(url)]
    pub hyp3_api_url: String,

    /// Earthdata Login bearer token. Preferred over username/password.
    #[serde(default)]
    #[garde(skip)]
    pub earthdata_token: Option<String>,

    /// Earthdata Login username
    #[serde(default)]
    #[garde(skip)]
    pub earthdata_username: Option<String>,

    /// Earthdata Login password
    #[serde(default)]
    #[garde(skip)]
    pub earthdata_password: Option<String>,

    /// AWS region of the source and destination buckets
    #[serde(default = "default_aws_region")]
    #[garde(length(min = 1))]
    pub aws_region: String,

    /// Optional S3-compatible endpoint (e.g., a local MinIO)
    #[serde(default)]
    #[garde(url)]
    pub s3_endpoint_url: Option<String>,

    /// Multipart threshold and part size in bytes
    #[serde(default = "default_chunk_size")]
    #[garde(range(min = MIN_CHUNK_SIZE, max = MAX_CHUNK_SIZE))]
    pub chunk_size: u64,

    /// Upper bound on copies in flight
    #[serde(default = "default_max_concurrent_copies")]
    #[garde(range(min = 1, max = 64))]
    pub max_concurrent_copies: usize,

    /// Transport-level attempts per S3 call
    #[serde(default = "default_s3_max_attempts")]
    #[garde(range(min = 1, max = 10))]
    pub s3_max_attempts: u32,
}

fn default_hyp3_api_url() -> String {
    "https://hyp3-api.asf.alaska.edu".to_string()
}

fn default_aws_region() -> String {
    "us-west-2".to_string()
}

fn default_chunk_size() -> u64 {
    100 * 1024 * 1024
}

fn default_max_concurrent_copies() -> usize {
    4
}

fn default_s3_max_attempts() -> u32 {
    3
}

impl TransferConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate.
    pub fn with_overrides(
        mut self,
        chunk_size: Option<u64>,
        max_concurrent_copies: Option<usize>,
    ) -> Result<Self, ConfigError> {
        if let Some(chunk_size) = chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(n) = max_concurrent_copies {
            self.max_concurrent_copies = n;
        }
        self.validate()?;
        Ok(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
