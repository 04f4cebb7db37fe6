//! Request dispatcher. One closed enum of request shapes, one pure-ish
//! function routing them against the session's state. The caller holds
//! the session lock for the whole call, so everything in here can mutate
//! `ConversationState` without further synchronization.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::jobs::{JobProvider, DEFAULT_SEARCH_LIMIT, MAX_SEARCH_LIMIT};
use crate::llm_client::LlmClient;
use crate::matching::oracle::{CriticOracle, ScoringOracle};
use crate::matching::refine::{refine, CancelFlag, RefineConfig, RefineStatus};
use crate::matching::scorer::{build_record, job_prompt_text, score_batch};
use crate::models::job::JobPosting;
use crate::models::match_record::{MatchRecord, MatchSummary};
use crate::models::resume::ResumeSummary;
use crate::query::nl_sql::run_query;
use crate::session::cache::{CachedRow, ResultKind};
use crate::session::state::ConversationState;
use crate::session::workflow::{
    parse_job_filter, parse_resume_selection, JobFilter, ResumeSelection, Workflow,
};
use crate::store::Store;

const DEFAULT_MATCHES_SHOWN: i64 = 10;

/// Everything a dispatch can touch besides the session itself. Trait
/// objects throughout so tests run against in-memory fakes.
#[derive(Clone)]
pub struct Deps {
    pub store: Arc<dyn Store>,
    pub jobs: Arc<dyn JobProvider>,
    pub scoring: Arc<dyn ScoringOracle>,
    pub critic: Arc<dyn CriticOracle>,
    pub llm: LlmClient,
}

/// The closed set of request shapes. The tool-selection step upstream
/// (UI or utterance classifier) produces one of these; nothing else gets
/// in.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatRequest {
    SearchJobs {
        query: String,
        #[serde(default)]
        location: Option<String>,
        #[serde(default)]
        limit: Option<usize>,
    },
    /// Ordinal follow-up against a previously shown list: "tell me more
    /// about the second one".
    FollowUp { kind: ResultKind, ordinal: usize },
    /// Persists searched postings by their list ordinals ("save jobs 1
    /// and 3"); an empty list means save everything shown.
    SaveJobs {
        #[serde(default)]
        ordinals: Vec<usize>,
    },
    StartMatching,
    /// Free-text answer to whatever prompt the workflow is showing.
    WorkflowInput { input: String },
    DataQuery { question: String },
    RefineMatch { resume_id: i64, job_id: i64 },
    ShowMatches {
        #[serde(default)]
        resume_id: Option<i64>,
        #[serde(default)]
        limit: Option<i64>,
    },
    Reset,
}

#[derive(Debug, Serialize)]
pub struct FailedJob {
    pub title: String,
    pub company: String,
    pub error: String,
}

/// Structured reply to one request. The HTTP layer serializes this
/// as-is; the UI renders per-variant.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ChatOutcome {
    JobResults { jobs: Vec<JobPosting> },
    /// Postings written to the jobs table, now eligible for matching.
    JobsSaved { jobs: Vec<JobPosting> },
    RowDetail { row: CachedRow },
    /// Matching started: pick a résumé by ordinal (newest first).
    ResumePrompt { resumes: Vec<ResumeSummary> },
    /// Résumé locked in: pick which jobs to score (1 = all,
    /// 2 = unmatched, or a keyword).
    FilterPrompt { resume: ResumeSummary },
    MatchReport {
        matches: Vec<MatchSummary>,
        failed: Vec<FailedJob>,
    },
    QueryResults {
        sql: String,
        rows: Vec<serde_json::Value>,
    },
    Refined {
        record: MatchRecord,
        status: RefineStatus,
        iterations: usize,
    },
    SavedMatches { matches: Vec<MatchSummary> },
    ResetDone,
}

pub async fn dispatch(
    deps: &Deps,
    state: &mut ConversationState,
    request: ChatRequest,
) -> Result<ChatOutcome, AppError> {
    state.turns += 1;

    match request {
        ChatRequest::SearchJobs {
            query,
            location,
            limit,
        } => search_jobs(deps, state, &query, location.as_deref(), limit).await,
        ChatRequest::FollowUp { kind, ordinal } => follow_up(state, kind, ordinal),
        ChatRequest::SaveJobs { ordinals } => save_jobs(deps, state, ordinals).await,
        ChatRequest::StartMatching => start_matching(deps, state).await,
        ChatRequest::WorkflowInput { input } => workflow_input(deps, state, &input).await,
        ChatRequest::DataQuery { question } => data_query(deps, state, &question).await,
        ChatRequest::RefineMatch { resume_id, job_id } => {
            refine_match(deps, state, resume_id, job_id).await
        }
        ChatRequest::ShowMatches { resume_id, limit } => {
            show_matches(deps, state, resume_id, limit).await
        }
        ChatRequest::Reset => {
            state.reset();
            Ok(ChatOutcome::ResetDone)
        }
    }
}

async fn search_jobs(
    deps: &Deps,
    state: &mut ConversationState,
    query: &str,
    location: Option<&str>,
    limit: Option<usize>,
) -> Result<ChatOutcome, AppError> {
    if query.trim().is_empty() {
        return Err(AppError::Validation("search query cannot be empty".to_string()));
    }
    let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

    let jobs = deps.jobs.search(query.trim(), location, limit).await?;

    if let Some(loc) = location {
        state.preferences.learn_location(loc);
    }
    state.cache.store(
        ResultKind::Search,
        jobs.iter().cloned().map(CachedRow::Job).collect(),
    );
    Ok(ChatOutcome::JobResults { jobs })
}

/// Persists cached search hits so the matching workflow can cover them.
/// Each saved row replaces its cache entry, so follow-ups and repeat
/// saves see the stored posting (with its real id) from then on.
async fn save_jobs(
    deps: &Deps,
    state: &mut ConversationState,
    ordinals: Vec<usize>,
) -> Result<ChatOutcome, AppError> {
    let ordinals = if ordinals.is_empty() {
        match state.cache.len(ResultKind::Search) {
            0 => {
                // Surfaces NoResults (nothing listed) or OutOfRange
                // (an empty list was shown).
                state.cache.resolve(ResultKind::Search, 1)?;
                Vec::new()
            }
            n => (1..=n).collect(),
        }
    } else {
        ordinals
    };

    let mut saved = Vec::new();
    for ordinal in ordinals {
        let row = state.cache.resolve(ResultKind::Search, ordinal)?.clone();
        let job = match row {
            CachedRow::Job(job) => job,
            _ => {
                return Err(AppError::InvalidSelection(
                    "The listed results are not job postings".to_string(),
                ))
            }
        };
        // Already persisted rows (ids from the jobs table) are not
        // duplicated.
        if job.id != 0 {
            saved.push(job);
            continue;
        }
        let stored = deps.store.insert_job(&job).await?;
        state
            .cache
            .replace(ResultKind::Search, ordinal, CachedRow::Job(stored.clone()))?;
        saved.push(stored);
    }

    info!("Saved {} searched posting(s)", saved.len());
    Ok(ChatOutcome::JobsSaved { jobs: saved })
}

fn follow_up(
    state: &mut ConversationState,
    kind: ResultKind,
    ordinal: usize,
) -> Result<ChatOutcome, AppError> {
    let row = state.cache.resolve(kind, ordinal)?.clone();

    // A follow-up shifts the conversational focus.
    match &row {
        CachedRow::Resume(resume) => state.active_resume_ref = Some(resume.id),
        CachedRow::Job(job) if job.id != 0 => state.active_job_ref = Some(job.id),
        CachedRow::Match(summary) => {
            state.active_resume_ref = Some(summary.resume_id);
            state.active_job_ref = Some(summary.job_id);
        }
        _ => {}
    }

    Ok(ChatOutcome::RowDetail { row })
}

async fn start_matching(
    deps: &Deps,
    state: &mut ConversationState,
) -> Result<ChatOutcome, AppError> {
    let resumes = deps.store.list_resumes().await?;
    if resumes.is_empty() {
        return Err(AppError::NotFound(
            "No saved resumes to match against".to_string(),
        ));
    }

    state.cache.store(
        ResultKind::Search,
        resumes.iter().cloned().map(CachedRow::Resume).collect(),
    );
    state.workflow = Workflow::AwaitingResumeSelection;
    Ok(ChatOutcome::ResumePrompt { resumes })
}

async fn workflow_input(
    deps: &Deps,
    state: &mut ConversationState,
    input: &str,
) -> Result<ChatOutcome, AppError> {
    match state.workflow.clone() {
        Workflow::Idle => Err(AppError::InvalidSelection(
            "No selection is pending in this conversation".to_string(),
        )),
        Workflow::AwaitingResumeSelection => select_resume(deps, state, input).await,
        Workflow::AwaitingJobFilter { resume } => apply_filter(deps, state, resume, input).await,
    }
}

/// `AwaitingResumeSelection` → `AwaitingJobFilter`. On any resolution
/// failure the workflow state is untouched and the caller reprompts.
async fn select_resume(
    deps: &Deps,
    state: &mut ConversationState,
    input: &str,
) -> Result<ChatOutcome, AppError> {
    let selection = parse_resume_selection(input).ok_or_else(|| {
        AppError::InvalidSelection(format!(
            "Could not understand '{input}' as a resume choice; answer with a number"
        ))
    })?;

    let resume = match selection {
        ResumeSelection::Ordinal(ordinal) => {
            match state.cache.resolve(ResultKind::Search, ordinal)? {
                CachedRow::Resume(resume) => resume.clone(),
                _ => {
                    return Err(AppError::InvalidSelection(
                        "The listed results are not resumes; start matching again".to_string(),
                    ))
                }
            }
        }
        ResumeSelection::ActiveResume => {
            let id = state.active_resume_ref.ok_or_else(|| {
                AppError::InvalidSelection(
                    "No resume is in focus yet; pick one by number".to_string(),
                )
            })?;
            let doc = deps
                .store
                .get_resume(id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Resume {id} no longer exists")))?;
            ResumeSummary {
                id: doc.id,
                name: doc.name,
            }
        }
    };

    state.active_resume_ref = Some(resume.id);
    state.workflow = Workflow::AwaitingJobFilter {
        resume: resume.clone(),
    };
    Ok(ChatOutcome::FilterPrompt { resume })
}

/// `AwaitingJobFilter` → `Idle`, running the batch on the way out.
async fn apply_filter(
    deps: &Deps,
    state: &mut ConversationState,
    resume: ResumeSummary,
    input: &str,
) -> Result<ChatOutcome, AppError> {
    let filter = parse_job_filter(input).ok_or_else(|| {
        AppError::InvalidSelection(
            "Answer with 1 (all jobs), 2 (unmatched only), or a keyword".to_string(),
        )
    })?;

    if let JobFilter::Keyword(keyword) = &filter {
        state.preferences.learn_job_type(keyword);
    }

    let doc = deps
        .store
        .get_resume(resume.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {} no longer exists", resume.id)))?;

    let jobs = deps.store.list_jobs(resume.id, &filter).await?;
    if jobs.is_empty() {
        // Stay in the filter prompt so the user can widen the filter.
        return Err(AppError::NotFound(
            "No saved jobs matched that filter; try a different one".to_string(),
        ));
    }

    info!(
        "Matching resume {} against {} job(s)",
        resume.id,
        jobs.len()
    );
    let report = score_batch(deps.scoring.clone(), deps.store.clone(), &doc, jobs).await;

    let matches: Vec<MatchSummary> = report
        .scored
        .iter()
        .map(|(record, job)| MatchSummary {
            resume_id: record.resume_id,
            job_id: record.job_id,
            title: job.title.clone(),
            company: job.company.clone(),
            location: job.location.clone(),
            overall_score: record.overall_score,
            reasoning: record.reasoning.clone(),
        })
        .collect();
    let failed = report
        .failed
        .into_iter()
        .map(|(job, error)| FailedJob {
            title: job.title,
            company: job.company,
            error,
        })
        .collect();

    state.cache.store(
        ResultKind::Match,
        matches.iter().cloned().map(CachedRow::Match).collect(),
    );
    state.workflow = Workflow::Idle;
    Ok(ChatOutcome::MatchReport { matches, failed })
}

async fn data_query(
    deps: &Deps,
    state: &mut ConversationState,
    question: &str,
) -> Result<ChatOutcome, AppError> {
    let (sql, rows) = run_query(question, &deps.llm, &deps.store).await?;

    state.cache.store(
        ResultKind::Query,
        rows.iter().cloned().map(CachedRow::Query).collect(),
    );
    Ok(ChatOutcome::QueryResults { sql, rows })
}

async fn refine_match(
    deps: &Deps,
    state: &mut ConversationState,
    resume_id: i64,
    job_id: i64,
) -> Result<ChatOutcome, AppError> {
    let resume = deps
        .store
        .get_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    let job = deps
        .store
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    let outcome = refine(
        deps.scoring.as_ref(),
        deps.critic.as_ref(),
        &resume.text,
        &job_prompt_text(&job),
        RefineConfig::default(),
        &CancelFlag::new(),
    )
    .await?;

    let record = build_record(resume_id, job_id, &outcome.final_analysis);
    deps.store.upsert_match(&record).await?;

    state.active_resume_ref = Some(resume_id);
    state.active_job_ref = Some(job_id);
    Ok(ChatOutcome::Refined {
        record,
        status: outcome.status,
        iterations: outcome.iterations(),
    })
}

async fn show_matches(
    deps: &Deps,
    state: &mut ConversationState,
    resume_id: Option<i64>,
    limit: Option<i64>,
) -> Result<ChatOutcome, AppError> {
    let resume_id = resume_id.or(state.active_resume_ref).ok_or_else(|| {
        AppError::Validation("No resume specified and none in focus".to_string())
    })?;
    let limit = limit.unwrap_or(DEFAULT_MATCHES_SHOWN).clamp(1, 100);

    let matches = deps.store.top_matches(resume_id, limit).await?;

    state.active_resume_ref = Some(resume_id);
    state.cache.store(
        ResultKind::Match,
        matches.iter().cloned().map(CachedRow::Match).collect(),
    );
    Ok(ChatOutcome::SavedMatches { matches })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::oracle::{Critique, OracleError, ScoreCard};
    use crate::store::memory::MemoryStore;
    use async_trait::async_trait;

    /// Provider returning a fixed page of postings.
    struct CannedProvider(Vec<JobPosting>);

    #[async_trait]
    impl JobProvider for CannedProvider {
        async fn search(
            &self,
            _query: &str,
            _location: Option<&str>,
            limit: usize,
        ) -> Result<Vec<JobPosting>, AppError> {
            let mut jobs = self.0.clone();
            jobs.truncate(limit);
            Ok(jobs)
        }
    }

    /// Oracle scoring every pair the same, except titles containing
    /// "broken" which never parse.
    struct FixedOracle;

    #[async_trait]
    impl ScoringOracle for FixedOracle {
        async fn score(
            &self,
            _resume: &str,
            job: &str,
            _guidance: &[String],
            _strict: bool,
        ) -> Result<ScoreCard, OracleError> {
            if job.contains("broken") {
                return Err(OracleError::Malformed("no json".to_string()));
            }
            Ok(ScoreCard {
                skill_alignment: 80,
                experience_match: 70,
                role_fit: 60,
                cultural_fit: None,
                summary: "solid fit".to_string(),
            })
        }
    }

    struct HappyCritic;

    #[async_trait]
    impl CriticOracle for HappyCritic {
        async fn critique(&self, _analysis: &ScoreCard) -> Result<Critique, OracleError> {
            Ok(Critique {
                quality_score: 90,
                suggestions: vec![],
            })
        }
    }

    fn posting(title: &str) -> JobPosting {
        JobPosting {
            id: 0,
            title: title.to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            link: String::new(),
            description: String::new(),
        }
    }

    fn deps_with(store: MemoryStore, provider_jobs: Vec<JobPosting>) -> (Deps, Arc<MemoryStore>) {
        let store = Arc::new(store);
        let deps = Deps {
            store: store.clone(),
            jobs: Arc::new(CannedProvider(provider_jobs)),
            scoring: Arc::new(FixedOracle),
            critic: Arc::new(HappyCritic),
            llm: LlmClient::new("test-key".to_string()),
        };
        (deps, store)
    }

    #[tokio::test]
    async fn test_search_caches_results_for_ordinal_follow_up() {
        let (deps, _) = deps_with(
            MemoryStore::default(),
            vec![posting("Data Engineer"), posting("Analyst")],
        );
        let mut state = ConversationState::default();

        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::SearchJobs {
                query: "data".to_string(),
                location: Some("Berlin".to_string()),
                limit: None,
            },
        )
        .await
        .unwrap();

        assert!(matches!(outcome, ChatOutcome::JobResults { ref jobs } if jobs.len() == 2));
        assert!(state.preferences.locations.contains("Berlin"));

        let detail = dispatch(
            &deps,
            &mut state,
            ChatRequest::FollowUp {
                kind: ResultKind::Search,
                ordinal: 2,
            },
        )
        .await
        .unwrap();
        match detail {
            ChatOutcome::RowDetail {
                row: CachedRow::Job(job),
            } => assert_eq!(job.title, "Analyst"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_save_jobs_persists_selected_postings_for_matching() {
        let store = MemoryStore::default().with_resume(1, "resume", "Rust, SQL");
        let (deps, store) = deps_with(
            store,
            vec![posting("Data Engineer"), posting("Analyst"), posting("SRE")],
        );
        let mut state = ConversationState::default();

        dispatch(
            &deps,
            &mut state,
            ChatRequest::SearchJobs {
                query: "data".to_string(),
                location: None,
                limit: None,
            },
        )
        .await
        .unwrap();

        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::SaveJobs {
                ordinals: vec![1, 3],
            },
        )
        .await
        .unwrap();

        match outcome {
            ChatOutcome::JobsSaved { jobs } => {
                assert_eq!(jobs.len(), 2);
                assert!(jobs.iter().all(|j| j.id != 0));
                assert_eq!(jobs[0].title, "Data Engineer");
                assert_eq!(jobs[1].title, "SRE");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.jobs.lock().unwrap().len(), 2);

        // The saved postings are now in scope for the matching workflow.
        dispatch(&deps, &mut state, ChatRequest::StartMatching)
            .await
            .unwrap();
        dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "1".to_string(),
            },
        )
        .await
        .unwrap();
        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "all".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(outcome, ChatOutcome::MatchReport { ref matches, .. } if matches.len() == 2));
    }

    #[tokio::test]
    async fn test_save_all_jobs_with_empty_ordinals_is_idempotent() {
        let (deps, store) = deps_with(
            MemoryStore::default(),
            vec![posting("Data Engineer"), posting("Analyst")],
        );
        let mut state = ConversationState::default();

        dispatch(
            &deps,
            &mut state,
            ChatRequest::SearchJobs {
                query: "data".to_string(),
                location: None,
                limit: None,
            },
        )
        .await
        .unwrap();

        for _ in 0..2 {
            let outcome = dispatch(
                &deps,
                &mut state,
                ChatRequest::SaveJobs { ordinals: vec![] },
            )
            .await
            .unwrap();
            assert!(matches!(outcome, ChatOutcome::JobsSaved { ref jobs } if jobs.len() == 2));
        }

        // The second pass sees the replaced cache rows and inserts nothing.
        assert_eq!(store.jobs.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_save_jobs_without_search_results_errors() {
        let (deps, _) = deps_with(MemoryStore::default(), vec![posting("Data Engineer")]);
        let mut state = ConversationState::default();

        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::SaveJobs { ordinals: vec![] },
        )
        .await;
        assert!(matches!(result, Err(AppError::NoResults(ResultKind::Search))));

        dispatch(
            &deps,
            &mut state,
            ChatRequest::SearchJobs {
                query: "data".to_string(),
                location: None,
                limit: None,
            },
        )
        .await
        .unwrap();
        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::SaveJobs { ordinals: vec![5] },
        )
        .await;
        assert!(matches!(result, Err(AppError::OutOfRange { ordinal: 5, len: 1 })));
    }

    #[tokio::test]
    async fn test_follow_up_without_results_is_no_results() {
        let (deps, _) = deps_with(MemoryStore::default(), vec![]);
        let mut state = ConversationState::default();

        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::FollowUp {
                kind: ResultKind::Match,
                ordinal: 1,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::NoResults(ResultKind::Match))));
    }

    #[tokio::test]
    async fn test_full_matching_workflow_end_to_end() {
        let store = MemoryStore::default()
            .with_resume(1, "2024 resume", "Rust, SQL")
            .with_job(10, "Backend Engineer", "Acme")
            .with_job(11, "Data Analyst", "Globex");
        let (deps, store) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        let outcome = dispatch(&deps, &mut state, ChatRequest::StartMatching)
            .await
            .unwrap();
        assert!(matches!(outcome, ChatOutcome::ResumePrompt { ref resumes } if resumes.len() == 1));
        assert_eq!(state.workflow, Workflow::AwaitingResumeSelection);

        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "first".to_string(),
            },
        )
        .await
        .unwrap();
        assert!(matches!(outcome, ChatOutcome::FilterPrompt { .. }));
        assert!(matches!(state.workflow, Workflow::AwaitingJobFilter { .. }));
        assert_eq!(state.active_resume_ref, Some(1));

        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "all".to_string(),
            },
        )
        .await
        .unwrap();
        match outcome {
            ChatOutcome::MatchReport { matches, failed } => {
                assert_eq!(matches.len(), 2);
                assert!(failed.is_empty());
                // 0.4*80 + 0.3*70 + 0.3*60 = 71
                assert_eq!(matches[0].overall_score, 71);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(state.workflow.is_idle());
        assert_eq!(store.match_count(), 2);
        assert_eq!(state.cache.len(ResultKind::Match), 2);
    }

    #[tokio::test]
    async fn test_invalid_selection_leaves_workflow_unchanged() {
        let store = MemoryStore::default().with_resume(1, "resume", "text");
        let (deps, _) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        dispatch(&deps, &mut state, ChatRequest::StartMatching)
            .await
            .unwrap();

        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "the blue one".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidSelection(_))));
        assert_eq!(state.workflow, Workflow::AwaitingResumeSelection);

        // Out-of-range ordinal also keeps the prompt open.
        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "9".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::OutOfRange { ordinal: 9, len: 1 })));
        assert_eq!(state.workflow, Workflow::AwaitingResumeSelection);
    }

    #[tokio::test]
    async fn test_workflow_input_while_idle_is_invalid() {
        let (deps, _) = deps_with(MemoryStore::default(), vec![]);
        let mut state = ConversationState::default();

        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "1".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::InvalidSelection(_))));
        assert!(state.workflow.is_idle());
    }

    #[tokio::test]
    async fn test_batch_continues_past_failed_job() {
        let store = MemoryStore::default()
            .with_resume(1, "resume", "text")
            .with_job(10, "broken posting", "Acme")
            .with_job(11, "Backend Engineer", "Acme");
        let (deps, store) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        dispatch(&deps, &mut state, ChatRequest::StartMatching)
            .await
            .unwrap();
        dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "1".to_string(),
            },
        )
        .await
        .unwrap();
        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "all".to_string(),
            },
        )
        .await
        .unwrap();

        match outcome {
            ChatOutcome::MatchReport { matches, failed } => {
                assert_eq!(matches.len(), 1);
                assert_eq!(failed.len(), 1);
                assert_eq!(failed[0].title, "broken posting");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.match_count(), 1);
    }

    #[tokio::test]
    async fn test_keyword_filter_learns_job_type_preference() {
        let store = MemoryStore::default()
            .with_resume(1, "resume", "text")
            .with_job(10, "Data Scientist", "Acme");
        let (deps, _) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        dispatch(&deps, &mut state, ChatRequest::StartMatching)
            .await
            .unwrap();
        dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "1".to_string(),
            },
        )
        .await
        .unwrap();
        dispatch(
            &deps,
            &mut state,
            ChatRequest::WorkflowInput {
                input: "data".to_string(),
            },
        )
        .await
        .unwrap();

        assert!(state.preferences.job_types.contains("data"));
    }

    #[tokio::test]
    async fn test_rescoring_same_pair_overwrites_not_appends() {
        let store = MemoryStore::default()
            .with_resume(1, "resume", "text")
            .with_job(10, "Backend Engineer", "Acme");
        let (deps, store) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        for _ in 0..2 {
            dispatch(&deps, &mut state, ChatRequest::StartMatching)
                .await
                .unwrap();
            dispatch(
                &deps,
                &mut state,
                ChatRequest::WorkflowInput {
                    input: "1".to_string(),
                },
            )
            .await
            .unwrap();
            dispatch(
                &deps,
                &mut state,
                ChatRequest::WorkflowInput {
                    input: "all".to_string(),
                },
            )
            .await
            .unwrap();
        }

        assert_eq!(store.match_count(), 1);
    }

    #[tokio::test]
    async fn test_refine_match_upserts_and_sets_focus() {
        let store = MemoryStore::default()
            .with_resume(1, "resume", "text")
            .with_job(10, "Backend Engineer", "Acme");
        let (deps, store) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::RefineMatch {
                resume_id: 1,
                job_id: 10,
            },
        )
        .await
        .unwrap();

        match outcome {
            ChatOutcome::Refined {
                record,
                status,
                iterations,
            } => {
                assert_eq!(status, RefineStatus::Converged);
                assert_eq!(iterations, 1);
                assert_eq!(record.overall_score, 71);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(store.match_count(), 1);
        assert_eq!(state.active_resume_ref, Some(1));
        assert_eq!(state.active_job_ref, Some(10));
    }

    #[tokio::test]
    async fn test_refine_match_unknown_resume_is_not_found() {
        let (deps, _) = deps_with(MemoryStore::default(), vec![]);
        let mut state = ConversationState::default();

        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::RefineMatch {
                resume_id: 99,
                job_id: 1,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_show_matches_uses_active_resume_when_unspecified() {
        let store = MemoryStore::default()
            .with_resume(1, "resume", "text")
            .with_job(10, "Backend Engineer", "Acme");
        let (deps, _) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        // Nothing in focus and no id given: the request is unanswerable.
        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::ShowMatches {
                resume_id: None,
                limit: None,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        dispatch(
            &deps,
            &mut state,
            ChatRequest::RefineMatch {
                resume_id: 1,
                job_id: 10,
            },
        )
        .await
        .unwrap();

        let outcome = dispatch(
            &deps,
            &mut state,
            ChatRequest::ShowMatches {
                resume_id: None,
                limit: None,
            },
        )
        .await
        .unwrap();
        match outcome {
            ChatOutcome::SavedMatches { matches } => {
                assert_eq!(matches.len(), 1);
                assert_eq!(matches[0].job_id, 10);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(state.cache.len(ResultKind::Match), 1);
    }

    #[tokio::test]
    async fn test_reset_returns_workflow_to_idle() {
        let store = MemoryStore::default().with_resume(1, "resume", "text");
        let (deps, _) = deps_with(store, vec![]);
        let mut state = ConversationState::default();

        dispatch(&deps, &mut state, ChatRequest::StartMatching)
            .await
            .unwrap();
        assert!(!state.workflow.is_idle());

        let outcome = dispatch(&deps, &mut state, ChatRequest::Reset).await.unwrap();
        assert!(matches!(outcome, ChatOutcome::ResetDone));
        assert!(state.workflow.is_idle());
        assert_eq!(state.cache.len(ResultKind::Search), 0);
    }

    #[tokio::test]
    async fn test_empty_search_query_is_rejected() {
        let (deps, _) = deps_with(MemoryStore::default(), vec![]);
        let mut state = ConversationState::default();

        let result = dispatch(
            &deps,
            &mut state,
            ChatRequest::SearchJobs {
                query: "   ".to_string(),
                location: None,
                limit: None,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn test_chat_request_wire_format() {
        let req: ChatRequest = serde_json::from_value(serde_json::json!({
            "action": "search_jobs",
            "query": "rust engineer",
            "location": "Remote"
        }))
        .unwrap();
        assert!(matches!(req, ChatRequest::SearchJobs { .. }));

        let req: ChatRequest = serde_json::from_value(serde_json::json!({
            "action": "follow_up",
            "kind": "match",
            "ordinal": 2
        }))
        .unwrap();
        assert!(matches!(
            req,
            ChatRequest::FollowUp {
                kind: ResultKind::Match,
                ordinal: 2
            }
        ));
    }
}
