//! In-memory `Store` used by unit tests across the crate.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::job::JobPosting;
use crate::models::match_record::{MatchRecord, MatchSummary};
use crate::models::resume::{ResumeDoc, ResumeSummary};
use crate::session::workflow::JobFilter;
use crate::store::Store;

#[derive(Default)]
pub struct MemoryStore {
    pub resumes: Mutex<Vec<ResumeDoc>>,
    pub jobs: Mutex<Vec<JobPosting>>,
    pub matches: Mutex<HashMap<(i64, i64), MatchRecord>>,
    /// Canned rows returned by `execute_readonly`; the last executed SQL
    /// is recorded for assertions.
    pub query_rows: Mutex<Vec<serde_json::Value>>,
    pub executed_sql: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn with_resume(self, id: i64, name: &str, text: &str) -> Self {
        self.resumes.lock().unwrap().push(ResumeDoc {
            id,
            name: name.to_string(),
            text: text.to_string(),
        });
        self
    }

    pub fn with_job(self, id: i64, title: &str, company: &str) -> Self {
        self.jobs.lock().unwrap().push(JobPosting {
            id,
            title: title.to_string(),
            company: company.to_string(),
            location: "Remote".to_string(),
            link: format!("https://example.com/job/{id}"),
            description: format!("{title} role at {company}"),
        });
        self
    }

    pub fn match_count(&self) -> usize {
        self.matches.lock().unwrap().len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, AppError> {
        Ok(self
            .resumes
            .lock()
            .unwrap()
            .iter()
            .map(|r| ResumeSummary {
                id: r.id,
                name: r.name.clone(),
            })
            .collect())
    }

    async fn get_resume(&self, id: i64) -> Result<Option<ResumeDoc>, AppError> {
        Ok(self
            .resumes
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn get_job(&self, id: i64) -> Result<Option<JobPosting>, AppError> {
        Ok(self.jobs.lock().unwrap().iter().find(|j| j.id == id).cloned())
    }

    async fn insert_job(&self, job: &JobPosting) -> Result<JobPosting, AppError> {
        let mut jobs = self.jobs.lock().unwrap();
        let next_id = jobs.iter().map(|j| j.id).max().unwrap_or(0) + 1;
        let stored = JobPosting {
            id: next_id,
            ..job.clone()
        };
        jobs.push(stored.clone());
        Ok(stored)
    }

    async fn list_jobs(
        &self,
        resume_id: i64,
        filter: &JobFilter,
    ) -> Result<Vec<JobPosting>, AppError> {
        let jobs = self.jobs.lock().unwrap();
        let matches = self.matches.lock().unwrap();
        Ok(jobs
            .iter()
            .filter(|j| match filter {
                JobFilter::All => true,
                JobFilter::Unmatched => !matches.contains_key(&(resume_id, j.id)),
                JobFilter::Keyword(kw) => {
                    let kw = kw.to_lowercase();
                    j.title.to_lowercase().contains(&kw)
                        || j.description.to_lowercase().contains(&kw)
                        || j.company.to_lowercase().contains(&kw)
                }
            })
            .cloned()
            .collect())
    }

    async fn upsert_match(&self, record: &MatchRecord) -> Result<(), AppError> {
        self.matches
            .lock()
            .unwrap()
            .insert((record.resume_id, record.job_id), record.clone());
        Ok(())
    }

    async fn top_matches(
        &self,
        resume_id: i64,
        limit: i64,
    ) -> Result<Vec<MatchSummary>, AppError> {
        let jobs = self.jobs.lock().unwrap();
        let mut rows: Vec<MatchSummary> = self
            .matches
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.resume_id == resume_id)
            .map(|m| {
                let job = jobs.iter().find(|j| j.id == m.job_id);
                MatchSummary {
                    resume_id: m.resume_id,
                    job_id: m.job_id,
                    title: job.map_or_else(String::new, |j| j.title.clone()),
                    company: job.map_or_else(String::new, |j| j.company.clone()),
                    location: job.map_or_else(String::new, |j| j.location.clone()),
                    overall_score: m.overall_score,
                    reasoning: m.reasoning.clone(),
                }
            })
            .collect();
        rows.sort_by(|a, b| b.overall_score.cmp(&a.overall_score));
        rows.truncate(limit as usize);
        Ok(rows)
    }

    async fn execute_readonly(&self, sql: &str) -> Result<Vec<serde_json::Value>, AppError> {
        self.executed_sql.lock().unwrap().push(sql.to_string());
        Ok(self.query_rows.lock().unwrap().clone())
    }
}
