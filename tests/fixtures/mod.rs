//! Job fixtures shaped like HyP3 RTC_GAMMA results
#![allow(dead_code)]

use hyp3_transfer::models::job::{Job, JobStatus, S3Location};

pub const SOURCE_BUCKET: &str = "bkt-src";
pub const TARGET_BUCKET: &str = "bkt-dst";

/// A succeeded job whose product key is `key`.
pub fn succeeded_job(job_id: &str, name: &str, key: &str) -> Job {
    Job {
        job_id: job_id.to_string(),
        name: name.to_string(),
        job_type: Some("RTC_GAMMA".to_string()),
        status: JobStatus::Succeeded,
        request_time: None,
        source_location: Some(S3Location {
            bucket: SOURCE_BUCKET.to_string(),
            key: key.to_string(),
        }),
    }
}

/// The `abc123` / `glacier-run` job with its product at the bucket root.
pub fn glacier_run_job() -> Job {
    succeeded_job("abc123", "glacier-run", "abc123.zip")
}

/// `count` succeeded jobs sharing one project name, with HyP3-style keys.
pub fn project_jobs(name: &str, count: usize) -> Vec<Job> {
    (0..count)
        .map(|i| {
            let job_id = format!("job-{:04}", i);
            let key = format!("{}/S1A_IW_2023010{}T000000_DVP_RTC30_G_gpuned_{:04X}.zip", job_id, i % 10, i);
            succeeded_job(&job_id, name, &key)
        })
        .collect()
}

/// A job that is still running and has no files yet.
pub fn running_job(job_id: &str, name: &str) -> Job {
    Job {
        status: JobStatus::Running,
        source_location: None,
        ..succeeded_job(job_id, name, "unused.zip")
    }
}
