//! Match scorer: weighted composite over the oracle's sub-dimension
//! scores, with retry-once semantics for malformed output and a
//! bounded-concurrency batch runner.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::matching::oracle::{OracleError, ScoreCard, ScoringOracle};
use crate::models::job::JobPosting;
use crate::models::match_record::MatchRecord;
use crate::models::resume::ResumeDoc;
use crate::store::Store;

/// The oracle is the bottleneck resource; more in-flight calls than this
/// just queue at the provider and burn the rate limit.
const MAX_CONCURRENT_SCORING: usize = 4;

/// Composite score and the weighting label recorded in the reasoning.
///
/// Four dimensions: 0.4*skill + 0.3*experience + 0.2*role + 0.1*cultural.
/// Without cultural_fit, role_fit absorbs the remainder: 0.4/0.3/0.3.
pub fn overall_score(card: &ScoreCard) -> (i32, &'static str) {
    let skill = card.skill_alignment as f64;
    let experience = card.experience_match as f64;
    let role = card.role_fit as f64;

    match card.cultural_fit {
        Some(cultural) => {
            let overall = 0.4 * skill + 0.3 * experience + 0.2 * role + 0.1 * cultural as f64;
            (overall.round() as i32, "weights 40/30/20/10")
        }
        None => {
            let overall = 0.4 * skill + 0.3 * experience + 0.3 * role;
            (overall.round() as i32, "weights 40/30/30")
        }
    }
}

/// Calls the scoring oracle, retrying exactly once with a strict-format
/// request when the first answer is malformed or out of range.
///
/// Transport failures are not retried here (the client already does) and
/// surface as `OracleUnavailable`; a second bad payload is `ScoringFailed`.
pub async fn score_with_retry(
    oracle: &dyn ScoringOracle,
    resume_text: &str,
    job_text: &str,
    guidance: &[String],
) -> Result<ScoreCard, AppError> {
    for strict in [false, true] {
        match oracle.score(resume_text, job_text, guidance, strict).await {
            Ok(card) if card.in_range() => return Ok(card),
            Ok(card) => {
                warn!("Oracle returned out-of-range scores (strict={strict}): {card:?}");
            }
            Err(OracleError::Malformed(msg)) => {
                warn!("Oracle returned malformed output (strict={strict}): {msg}");
            }
            Err(OracleError::Unavailable(msg)) => {
                return Err(AppError::OracleUnavailable(msg));
            }
        }
    }

    Err(AppError::ScoringFailed(
        "oracle output unusable after strict retry".to_string(),
    ))
}

/// The job posting as the scoring oracle sees it.
pub fn job_prompt_text(job: &JobPosting) -> String {
    format!(
        "Title: {}\nCompany: {}\nLocation: {}\n{}",
        job.title, job.company, job.location, job.description
    )
}

/// Builds the persisted record for one scored pair. The reasoning keeps
/// the oracle's summary plus the weighting that produced the composite,
/// so stored scores stay auditable.
pub fn build_record(resume_id: i64, job_id: i64, card: &ScoreCard) -> MatchRecord {
    let (overall, weighting) = overall_score(card);
    MatchRecord {
        resume_id,
        job_id,
        overall_score: overall,
        skill_alignment: card.skill_alignment,
        experience_match: card.experience_match,
        role_fit: card.role_fit,
        cultural_fit: card.cultural_fit,
        reasoning: format!("{} [{}]", card.summary.trim(), weighting),
        matched_at: Utc::now(),
    }
}

/// One job's fate within a batch.
#[derive(Debug)]
pub enum JobOutcome {
    Scored { record: MatchRecord, job: JobPosting },
    Failed { job: JobPosting, error: String },
}

/// Result of a batch run, successes ranked by score.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub scored: Vec<(MatchRecord, JobPosting)>,
    pub failed: Vec<(JobPosting, String)>,
}

/// Scores one résumé against many jobs concurrently, bounded by
/// `MAX_CONCURRENT_SCORING`, upserting each success as it lands.
///
/// Partial-failure semantics: one bad job never aborts the batch. The
/// caller gets every success plus a per-job error for the rest.
pub async fn score_batch(
    oracle: Arc<dyn ScoringOracle>,
    store: Arc<dyn Store>,
    resume: &ResumeDoc,
    jobs: Vec<JobPosting>,
) -> BatchReport {
    let semaphore = Arc::new(Semaphore::new(MAX_CONCURRENT_SCORING));
    let mut tasks = JoinSet::new();

    for job in jobs {
        let oracle = oracle.clone();
        let store = store.clone();
        let semaphore = semaphore.clone();
        let resume_id = resume.id;
        let resume_text = resume.text.clone();

        tasks.spawn(async move {
            // Semaphore closed only on shutdown; treat as unavailable.
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    return JobOutcome::Failed {
                        job,
                        error: "scoring pool shut down".to_string(),
                    }
                }
            };

            let job_text = job_prompt_text(&job);

            match score_with_retry(oracle.as_ref(), &resume_text, &job_text, &[]).await {
                Ok(card) => {
                    let record = build_record(resume_id, job.id, &card);
                    match store.upsert_match(&record).await {
                        Ok(()) => JobOutcome::Scored { record, job },
                        Err(e) => JobOutcome::Failed {
                            job,
                            error: format!("saving match failed: {e}"),
                        },
                    }
                }
                Err(e) => JobOutcome::Failed {
                    job,
                    error: e.to_string(),
                },
            }
        });
    }

    let mut report = BatchReport::default();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(JobOutcome::Scored { record, job }) => report.scored.push((record, job)),
            Ok(JobOutcome::Failed { job, error }) => {
                warn!("Scoring failed for job {} ({}): {error}", job.id, job.title);
                report.failed.push((job, error));
            }
            Err(e) => warn!("Scoring task panicked: {e}"),
        }
    }

    report
        .scored
        .sort_by(|(a, _), (b, _)| b.overall_score.cmp(&a.overall_score));

    info!(
        "Batch complete for resume {}: {} scored, {} failed",
        resume.id,
        report.scored.len(),
        report.failed.len()
    );
    report
}
