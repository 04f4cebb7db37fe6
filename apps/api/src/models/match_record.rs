use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored match between a résumé and a job.
///
/// Uniqueness: at most one current record per `(resume_id, job_id)` pair.
/// Re-scoring the same pair overwrites the old record (upsert), it never
/// appends.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchRecord {
    pub resume_id: i64,
    pub job_id: i64,
    /// Weighted composite of the sub-dimension scores, 0-100.
    pub overall_score: i32,
    pub skill_alignment: i32,
    pub experience_match: i32,
    pub role_fit: i32,
    /// Absent when the oracle did not produce a cultural dimension; the
    /// three-way weighting was used in that case.
    pub cultural_fit: Option<i32>,
    pub reasoning: String,
    pub matched_at: DateTime<Utc>,
}

/// The slice of a match shown in ranked lists and cached for ordinal
/// follow-ups ("tell me about match #2").
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MatchSummary {
    pub resume_id: i64,
    pub job_id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub overall_score: i32,
    pub reasoning: String,
}
