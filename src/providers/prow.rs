use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Semaphore;
use url::Url;

use super::RunSource;
use crate::error::{ReportError, Result};
use crate::periodics::RunRecord;

const USER_AGENT: &str = concat!("periodics-report/", env!("CARGO_PKG_VERSION"));
const STATUS_FILE: &str = "prowjob.json";

/// Run history published as a browsable directory tree of job logs
/// (one directory per run, each holding a `prowjob.json`).
pub struct ProwArtifacts {
    client: Client,
    base_url: Url,
    entry_pattern: Regex,
    semaphore: Arc<Semaphore>,
}

#[derive(Debug, Deserialize)]
struct ProwJob {
    status: Option<RunRecord>,
}

impl ProwArtifacts {
    /// Creates a client for the log tree rooted at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or `base_url`
    /// is not a valid URL.
    pub fn new(base_url: &str, max_concurrent_requests: usize) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ReportError::Config(format!("Failed to create HTTP client: {e}")))?;

        // Url::join drops the last segment unless the base ends with '/'
        let base = if base_url.ends_with('/') {
            base_url.to_owned()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base)
            .map_err(|e| ReportError::Config(format!("Invalid artifacts URL: {e}")))?;

        Ok(Self {
            client,
            base_url,
            entry_pattern: Regex::new(r"<img[^>]*>([^<]*)")?,
            semaphore: Arc::new(Semaphore::new(max_concurrent_requests.max(1))),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ReportError::Config(format!("Invalid artifacts path '{path}': {e}")))
    }

    /// GETs `url`, returning `None` on 404.
    async fn fetch(&self, url: Url) -> Result<Option<reqwest::Response>> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| ReportError::Config(format!("Request limiter closed: {e}")))?;

        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ReportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(Some(response))
    }

    /// Extracts run directories from a listing page, newest first.
    ///
    /// Each entry is the text right after an `<img>` icon; parent links and
    /// the `latest-build` marker are ignored.
    fn parse_run_listing(&self, html: &str) -> Vec<String> {
        let mut run_ids: Vec<String> = self
            .entry_pattern
            .captures_iter(html)
            .filter_map(|caps| caps.get(1))
            .map(|entry| entry.as_str().trim())
            .filter(|entry| {
                !entry.is_empty() && !entry.contains("..") && !entry.contains("latest-build")
            })
            .map(ToString::to_string)
            .collect();

        // Listings are sorted oldest first
        run_ids.reverse();
        run_ids
    }
}

fn status_path(job_name: &str, run_id: &str) -> String {
    if run_id.ends_with('/') {
        format!("{job_name}/{run_id}{STATUS_FILE}")
    } else {
        format!("{job_name}/{run_id}/{STATUS_FILE}")
    }
}

#[async_trait]
impl RunSource for ProwArtifacts {
    async fn list_run_ids(&self, job_name: &str) -> Result<Vec<String>> {
        let url = self.url(&format!("{job_name}/"))?;

        let Some(response) = self.fetch(url).await? else {
            warn!("No run history found for {job_name}");
            return Ok(Vec::new());
        };

        let html = response.text().await?;
        let run_ids = self.parse_run_listing(&html);
        debug!("Found {} runs for {job_name}", run_ids.len());

        Ok(run_ids)
    }

    async fn get_run_status(&self, job_name: &str, run_id: &str) -> Result<Option<RunRecord>> {
        let url = self.url(&status_path(job_name, run_id))?;

        let Some(response) = self.fetch(url).await? else {
            return Ok(None);
        };

        let body = response.text().await?;
        let prowjob: ProwJob = serde_json::from_str(&body)?;

        Ok(prowjob.status)
    }
}
