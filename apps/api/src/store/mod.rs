//! Persistence collaborator. The core never opens a connection itself;
//! everything goes through this trait, and query text reaches
//! `execute_readonly` only after the safety gate.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::errors::AppError;
use crate::models::job::JobPosting;
use crate::models::match_record::{MatchRecord, MatchSummary};
use crate::models::resume::{ResumeDoc, ResumeSummary};
use crate::session::workflow::JobFilter;

#[cfg(test)]
pub mod memory;

#[async_trait]
pub trait Store: Send + Sync {
    /// Resumes ordered newest first (selection ordinal 1 = latest).
    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, AppError>;

    async fn get_resume(&self, id: i64) -> Result<Option<ResumeDoc>, AppError>;

    async fn get_job(&self, id: i64) -> Result<Option<JobPosting>, AppError>;

    /// Persists a freshly searched posting and returns the stored row
    /// with its assigned id.
    async fn insert_job(&self, job: &JobPosting) -> Result<JobPosting, AppError>;

    /// Jobs eligible for a matching run. `resume_id` matters only for
    /// `JobFilter::Unmatched`.
    async fn list_jobs(&self, resume_id: i64, filter: &JobFilter)
        -> Result<Vec<JobPosting>, AppError>;

    /// Insert-or-replace keyed on `(resume_id, job_id)`. Atomic: a single
    /// conditional write, safe under concurrent batch scoring.
    async fn upsert_match(&self, record: &MatchRecord) -> Result<(), AppError>;

    /// Stored matches for a résumé, best first.
    async fn top_matches(&self, resume_id: i64, limit: i64)
        -> Result<Vec<MatchSummary>, AppError>;

    /// Runs an already-validated SELECT and returns rows as JSON objects.
    async fn execute_readonly(&self, sql: &str) -> Result<Vec<serde_json::Value>, AppError>;
}

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn list_resumes(&self) -> Result<Vec<ResumeSummary>, AppError> {
        let rows = sqlx::query_as::<_, ResumeSummary>(
            "SELECT id, name FROM resumes ORDER BY saved_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_resume(&self, id: i64) -> Result<Option<ResumeDoc>, AppError> {
        let row = sqlx::query_as::<_, ResumeDoc>(
            "SELECT id, name, text FROM resumes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_job(&self, id: i64) -> Result<Option<JobPosting>, AppError> {
        let row = sqlx::query_as::<_, JobPosting>(
            "SELECT id, title, company, location, link, description FROM jobs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn insert_job(&self, job: &JobPosting) -> Result<JobPosting, AppError> {
        let row = sqlx::query_as::<_, JobPosting>(
            "INSERT INTO jobs (title, company, location, link, description) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id, title, company, location, link, description",
        )
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.link)
        .bind(&job.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn list_jobs(
        &self,
        resume_id: i64,
        filter: &JobFilter,
    ) -> Result<Vec<JobPosting>, AppError> {
        let rows = match filter {
            JobFilter::All => {
                sqlx::query_as::<_, JobPosting>(
                    "SELECT id, title, company, location, link, description FROM jobs",
                )
                .fetch_all(&self.pool)
                .await?
            }
            JobFilter::Unmatched => {
                sqlx::query_as::<_, JobPosting>(
                    "SELECT id, title, company, location, link, description FROM jobs j \
                     WHERE NOT EXISTS ( \
                         SELECT 1 FROM resume_job_matches m \
                         WHERE m.resume_id = $1 AND m.job_id = j.id \
                     )",
                )
                .bind(resume_id)
                .fetch_all(&self.pool)
                .await?
            }
            JobFilter::Keyword(keyword) => {
                let pattern = format!("%{keyword}%");
                sqlx::query_as::<_, JobPosting>(
                    "SELECT id, title, company, location, link, description FROM jobs \
                     WHERE title ILIKE $1 OR description ILIKE $1 OR company ILIKE $1",
                )
                .bind(pattern)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    async fn upsert_match(&self, record: &MatchRecord) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO resume_job_matches \
                 (resume_id, job_id, overall_score, skill_alignment, experience_match, \
                  role_fit, cultural_fit, reasoning, matched_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (resume_id, job_id) DO UPDATE SET \
                 overall_score = EXCLUDED.overall_score, \
                 skill_alignment = EXCLUDED.skill_alignment, \
                 experience_match = EXCLUDED.experience_match, \
                 role_fit = EXCLUDED.role_fit, \
                 cultural_fit = EXCLUDED.cultural_fit, \
                 reasoning = EXCLUDED.reasoning, \
                 matched_at = EXCLUDED.matched_at",
        )
        .bind(record.resume_id)
        .bind(record.job_id)
        .bind(record.overall_score)
        .bind(record.skill_alignment)
        .bind(record.experience_match)
        .bind(record.role_fit)
        .bind(record.cultural_fit)
        .bind(&record.reasoning)
        .bind(record.matched_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn top_matches(
        &self,
        resume_id: i64,
        limit: i64,
    ) -> Result<Vec<MatchSummary>, AppError> {
        let rows = sqlx::query_as::<_, MatchSummary>(
            "SELECT m.resume_id, m.job_id, j.title, j.company, j.location, \
                    m.overall_score, m.reasoning \
             FROM resume_job_matches m \
             JOIN jobs j ON j.id = m.job_id \
             WHERE m.resume_id = $1 \
             ORDER BY m.overall_score DESC \
             LIMIT $2",
        )
        .bind(resume_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn execute_readonly(&self, sql: &str) -> Result<Vec<serde_json::Value>, AppError> {
        // Wrapping in to_jsonb keeps this generic over whatever column set
        // the generated query selects. The inner text was already vetted
        // by the guard; its casing is preserved.
        let wrapped = format!("SELECT to_jsonb(q) FROM ({sql}) q");
        let rows: Vec<serde_json::Value> = sqlx::query_scalar(&wrapped)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}
