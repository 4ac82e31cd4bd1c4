//! HyP3 API client
//!
//! Looks up processing jobs by name through the HyP3 REST API, authenticating
//! with Earthdata Login.
//!
//! API reference: <https://hyp3-api.asf.alaska.edu/ui/>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::TransferConfig;
use crate::models::job::{Job, JobStatus, S3Location};
use crate::services::traits::JobDirectory;

/// Earthdata Login authorize endpoint for the ASF auth application. A
/// successful basic-auth request leaves an `asf-urs` cookie in the jar.
const EDL_AUTHORIZE_URL: &str = "https://urs.earthdata.nasa.gov/oauth/authorize?response_type=code&client_id=BO_n7nTIlMljdvU6kRRB3g&redirect_uri=https://auth.asf.alaska.edu/login";

const SESSION_COOKIE: &str = "asf-urs";

/// Error type for HyP3 API operations. Every variant is fatal for a run.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("HTTP request to HyP3 failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HyP3 returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Earthdata Login authentication failed: {0}")]
    Auth(String),

    #[error("Failed to decode HyP3 response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("HyP3 unavailable: {0}")]
    Unavailable(String),
}

/// Earthdata Login credentials.
#[derive(Debug, Clone)]
pub enum Credentials {
    Token(String),
    Login { username: String, password: String },
}

impl Credentials {
    /// Pick credentials from configuration, preferring a token.
    pub fn from_config(config: &TransferConfig) -> Result<Self, DirectoryError> {
        if let Some(token) = config.earthdata_token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Credentials::Token(token.clone()));
        }
        match (&config.earthdata_username, &config.earthdata_password) {
            (Some(username), Some(password)) => Ok(Credentials::Login {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(DirectoryError::Auth(
                "set EARTHDATA_TOKEN or EARTHDATA_USERNAME and EARTHDATA_PASSWORD".to_string(),
            )),
        }
    }
}

#[derive(Deserialize)]
struct JobsPage {
    jobs: Vec<Hyp3Job>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Deserialize)]
struct Hyp3Job {
    job_id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    job_type: Option<String>,
    status_code: JobStatus,
    #[serde(default)]
    request_time: Option<DateTime<Utc>>,
    #[serde(default)]
    files: Vec<Hyp3File>,
}

#[derive(Deserialize)]
struct Hyp3File {
    s3: S3Location,
}

impl Hyp3Job {
    fn into_job(self, queried_name: &str) -> Job {
        Job {
            name: self.name.unwrap_or_else(|| queried_name.to_string()),
            source_location: self.files.into_iter().next().map(|f| f.s3),
            job_id: self.job_id,
            job_type: self.job_type,
            status: self.status_code,
            request_time: self.request_time,
        }
    }
}

/// Decode one page of `GET /jobs`, returning its jobs and the next page URL.
fn decode_page(body: &str, queried_name: &str) -> Result<(Vec<Job>, Option<String>), DirectoryError> {
    let page: JobsPage = serde_json::from_str(body)?;
    let jobs = page
        .jobs
        .into_iter()
        .map(|j| j.into_job(queried_name))
        .collect();
    Ok((jobs, page.next))
}

/// Client for the HyP3 jobs API.
pub struct Hyp3Client {
    http: reqwest::Client,
    api_url: String,
}

impl Hyp3Client {
    /// Build an authenticated client.
    ///
    /// Tokens are sent as a bearer header on every request; username and
    /// password are exchanged once for a session cookie.
    pub async fn connect(api_url: &str, credentials: Credentials) -> Result<Self, DirectoryError> {
        let jar = Arc::new(Jar::default());
        let mut builder = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .user_agent(concat!("hyp3-transfer/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(60));

        if let Credentials::Token(token) = &credentials {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| DirectoryError::Auth(e.to_string()))?;
            value.set_sensitive(true);
            let mut headers = HeaderMap::new();
            headers.insert(AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        let client = Self {
            http: builder.build()?,
            api_url: api_url.trim_end_matches('/').to_string(),
        };

        if let Credentials::Login { username, password } = &credentials {
            client.login(&jar, username, password).await?;
        }

        Ok(client)
    }

    async fn login(&self, jar: &Jar, username: &str, password: &str) -> Result<(), DirectoryError> {
        tracing::info!(username = %username, "Logging in to Earthdata Login");

        let response = self
            .http
            .get(EDL_AUTHORIZE_URL)
            .basic_auth(username, Some(password))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DirectoryError::Auth(format!(
                "Earthdata Login returned HTTP {}",
                response.status()
            )));
        }

        let api_url = reqwest::Url::parse(&self.api_url)
            .map_err(|e| DirectoryError::Auth(format!("invalid HyP3 API URL: {}", e)))?;
        let has_session = jar
            .cookies(&api_url)
            .and_then(|v| v.to_str().ok().map(|s| s.contains(SESSION_COOKIE)))
            .unwrap_or(false);

        if !has_session {
            return Err(DirectoryError::Auth(
                "no session cookie issued; check username and password".to_string(),
            ));
        }
        Ok(())
    }

    async fn fetch_page(&self, url: &str, query: Option<&str>) -> Result<String, DirectoryError> {
        let mut request = self.http.get(url);
        if let Some(name) = query {
            request = request.query(&[("name", name)]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), body));
        }
        Ok(response.text().await?)
    }
}

/// Gateway and overload responses mean the service is down, not that the
/// request was wrong.
fn status_error(status: u16, body: String) -> DirectoryError {
    match status {
        502..=504 => DirectoryError::Unavailable(format!("HTTP {}", status)),
        _ => DirectoryError::Status { status, body },
    }
}

#[async_trait]
impl JobDirectory for Hyp3Client {
    async fn find_jobs(&self, name: &str) -> Result<Vec<Job>, DirectoryError> {
        let first_url = format!("{}/jobs", self.api_url);
        let mut body = self.fetch_page(&first_url, Some(name)).await?;
        let mut jobs = Vec::new();

        loop {
            let (page, next) = decode_page(&body, name)?;
            tracing::debug!(count = page.len(), "Fetched page of HyP3 jobs");
            jobs.extend(page);

            match next {
                // `next` already carries the query string
                Some(next_url) => body = self.fetch_page(&next_url, None).await?,
                None => break,
            }
        }

        tracing::info!(project = %name, jobs = jobs.len(), "Found HyP3 jobs");
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"{
        "jobs": [
            {
                "job_id": "27836b79-e5b2-4d8f-932f-659724ea02c3",
                "job_type": "RTC_GAMMA",
                "name": "glacier-run",
                "status_code": "SUCCEEDED",
                "request_time": "2021-07-12T14:06:47+00:00",
                "user_id": "someuser",
                "files": [
                    {
                        "filename": "S1A_IW_20210710T000000_DVP_RTC30_G_gpuned_FD6A.zip",
                        "size": 123456789,
                        "url": "https://d3gm2hf49xd6jj.cloudfront.net/27836b79-e5b2-4d8f-932f-659724ea02c3/S1A_IW_20210710T000000_DVP_RTC30_G_gpuned_FD6A.zip",
                        "s3": {
                            "bucket": "hyp3-contentbucket",
                            "key": "27836b79-e5b2-4d8f-932f-659724ea02c3/S1A_IW_20210710T000000_DVP_RTC30_G_gpuned_FD6A.zip"
                        }
                    }
                ]
            },
            {
                "job_id": "b2a1e0f4-0000-4000-8000-000000000000",
                "job_type": "RTC_GAMMA",
                "name": "glacier-run",
                "status_code": "RUNNING",
                "request_time": "2021-07-12T14:06:47+00:00"
            }
        ],
        "next": "https://hyp3-api.asf.alaska.edu/jobs?name=glacier-run&start_token=abc"
    }"#;

    #[test]
    fn test_decode_page() {
        let (jobs, next) = decode_page(PAGE, "glacier-run").unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(
            next.as_deref(),
            Some("https://hyp3-api.asf.alaska.edu/jobs?name=glacier-run&start_token=abc")
        );

        let done = &jobs[0];
        assert_eq!(done.status, JobStatus::Succeeded);
        let location = done.source_location.as_ref().unwrap();
        assert_eq!(location.bucket, "hyp3-contentbucket");
        assert!(location.key.ends_with("FD6A.zip"));

        assert_eq!(jobs[1].status, JobStatus::Running);
        assert!(jobs[1].source_location.is_none());
    }

    #[test]
    fn test_missing_name_falls_back_to_query() {
        let body = r#"{"jobs": [{"job_id": "abc123", "name": null, "status_code": "FAILED"}]}"#;
        let (jobs, next) = decode_page(body, "glacier-run").unwrap();
        assert_eq!(jobs[0].name, "glacier-run");
        assert_eq!(jobs[0].status, JobStatus::Failed);
        assert!(next.is_none());
    }

    #[test]
    fn test_malformed_page_is_an_error() {
        let err = decode_page(r#"{"items": []}"#, "glacier-run").unwrap_err();
        assert!(matches!(err, DirectoryError::Decode(_)));
    }

    #[test]
    fn test_gateway_errors_mean_unavailable() {
        assert!(matches!(status_error(503, String::new()), DirectoryError::Unavailable(_)));
        assert!(matches!(status_error(502, String::new()), DirectoryError::Unavailable(_)));
        assert!(matches!(
            status_error(401, "Unauthorized".to_string()),
            DirectoryError::Status { status: 401, .. }
        ));
    }

    #[test]
    fn test_credentials_prefer_token() {
        let config: TransferConfig = envy::from_iter(vec![
            ("EARTHDATA_TOKEN".to_string(), "tok".to_string()),
            ("EARTHDATA_USERNAME".to_string(), "user".to_string()),
            ("EARTHDATA_PASSWORD".to_string(), "pass".to_string()),
        ])
        .unwrap();
        assert!(matches!(Credentials::from_config(&config), Ok(Credentials::Token(t)) if t == "tok"));
    }

    #[test]
    fn test_credentials_required() {
        let config: TransferConfig =
            envy::from_iter(vec![("EARTHDATA_USERNAME".to_string(), "user".to_string())]).unwrap();
        assert!(matches!(Credentials::from_config(&config), Err(DirectoryError::Auth(_))));
    }
}
