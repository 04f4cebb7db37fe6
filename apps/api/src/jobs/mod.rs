//! External job search. The provider is a trait seam like the oracles:
//! dispatch only sees `Vec<JobPosting>`, tests swap in a canned provider.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::job::JobPosting;

pub const DEFAULT_SEARCH_LIMIT: usize = 10;
pub const MAX_SEARCH_LIMIT: usize = 25;

#[async_trait]
pub trait JobProvider: Send + Sync {
    /// Searches live postings. `limit` is already clamped by the caller.
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<JobPosting>, AppError>;
}

/// Wire shape of one posting as the search API returns it.
#[derive(Debug, Deserialize)]
struct ProviderJob {
    job_title: String,
    employer_name: String,
    #[serde(default)]
    job_city: Option<String>,
    #[serde(default)]
    job_country: Option<String>,
    #[serde(default)]
    job_apply_link: String,
    #[serde(default)]
    job_description: String,
}

#[derive(Debug, Deserialize)]
struct ProviderResponse {
    #[serde(default)]
    data: Vec<ProviderJob>,
}

impl From<ProviderJob> for JobPosting {
    fn from(job: ProviderJob) -> Self {
        let location = match (job.job_city, job.job_country) {
            (Some(city), Some(country)) => format!("{city}, {country}"),
            (Some(city), None) => city,
            (None, Some(country)) => country,
            (None, None) => "Unspecified".to_string(),
        };
        JobPosting {
            // Provider postings are not persisted rows; they live in the
            // session cache only.
            id: 0,
            title: job.job_title,
            company: job.employer_name,
            location,
            link: job.job_apply_link,
            description: job.job_description,
        }
    }
}

/// JSearch-style HTTP provider.
pub struct HttpJobProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl HttpJobProvider {
    pub fn new(endpoint: String, api_key: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl JobProvider for HttpJobProvider {
    async fn search(
        &self,
        query: &str,
        location: Option<&str>,
        limit: usize,
    ) -> Result<Vec<JobPosting>, AppError> {
        let full_query = match location {
            Some(loc) => format!("{query} in {loc}"),
            None => query.to_string(),
        };
        debug!("Job search: {full_query} (limit {limit})");

        let response = self
            .client
            .get(&self.endpoint)
            .header("X-RapidAPI-Key", &self.api_key)
            .query(&[("query", full_query.as_str()), ("num_pages", "1")])
            .send()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("job search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "job search provider returned status {status}"
            )));
        }

        let parsed: ProviderResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("job search response invalid: {e}")))?;

        let mut jobs: Vec<JobPosting> = parsed.data.into_iter().map(JobPosting::from).collect();
        jobs.truncate(limit);
        info!("Job search returned {} posting(s)", jobs.len());
        Ok(jobs)
    }
}
