use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::models::job::Job;

/// Extension of the base product that every derived artifact replaces.
pub const PRODUCT_EXTENSION: &str = ".zip";

/// Output files copied for every RTC job, keyed by the suffix that replaces
/// the product's `.zip` extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter, IntoStaticStr)]
pub enum ArtifactSuffix {
    #[strum(serialize = "_VV.tif")]
    Vv,
    #[strum(serialize = "_VH.tif")]
    Vh,
    #[strum(serialize = "_rgb.tif")]
    Rgb,
    #[strum(serialize = "_VV.tif.xml")]
    VvMetadata,
}

impl ArtifactSuffix {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// A file expected to exist for a job, with its renamed destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateArtifact {
    pub suffix: ArtifactSuffix,
    pub source_bucket: String,
    pub source_key: String,
    pub target_bucket: String,
    pub target_key: String,
}

/// Swap the product extension for `suffix`.
///
/// Returns `None` when `base_key` has no `.zip` to replace.
pub fn derive_source_key(base_key: &str, suffix: ArtifactSuffix) -> Option<String> {
    if !base_key.contains(PRODUCT_EXTENSION) {
        return None;
    }
    Some(base_key.replace(PRODUCT_EXTENSION, suffix.as_str()))
}

/// Rename a source key so the destination groups files by project name
/// instead of job id.
pub fn derive_target_key(source_key: &str, job_id: &str, name: &str) -> String {
    source_key.replace(job_id, name)
}

/// Inverse of [`derive_target_key`] as long as `name` does not already
/// occur in the source key; any such occurrence is also turned into
/// `job_id`.
pub fn restore_source_key(target_key: &str, job_id: &str, name: &str) -> String {
    target_key.replace(name, job_id)
}

/// All candidate artifacts for one job, in suffix table order.
///
/// Jobs without a source location, or whose product key has no `.zip`,
/// yield nothing.
pub fn candidates_for_job(job: &Job, target_bucket: &str) -> Vec<CandidateArtifact> {
    let Some(source) = job.source_location.as_ref() else {
        tracing::warn!(job_id = %job.job_id, status = ?job.status, "Job has no output files, skipping");
        return Vec::new();
    };

    ArtifactSuffix::iter()
        .filter_map(|suffix| {
            let Some(source_key) = derive_source_key(&source.key, suffix) else {
                tracing::debug!(
                    job_id = %job.job_id,
                    key = %source.key,
                    "Product key has no .zip extension, skipping"
                );
                return None;
            };
            let target_key = derive_target_key(&source_key, &job.job_id, &job.name);
            Some(CandidateArtifact {
                suffix,
                source_bucket: source.bucket.clone(),
                source_key,
                target_bucket: target_bucket.to_string(),
                target_key,
            })
        })
        .collect()
}
