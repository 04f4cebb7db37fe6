//! Multi-step matching workflow machine.
//!
//! Exactly one state is active per session. `AwaitingJobFilter` always
//! carries a concrete selected résumé; there is no "awaiting filter with
//! no résumé" state to get stuck in.

use serde::Serialize;

use crate::models::resume::ResumeSummary;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Workflow {
    #[default]
    Idle,
    AwaitingResumeSelection,
    AwaitingJobFilter {
        resume: ResumeSummary,
    },
}

impl Workflow {
    pub fn is_idle(&self) -> bool {
        matches!(self, Workflow::Idle)
    }
}

/// A parsed résumé-selection input: a 1-based ordinal into the listed
/// résumés, or a reference to the session's active résumé ("my resume").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeSelection {
    Ordinal(usize),
    ActiveResume,
}

/// Parses selection phrasing the way users actually answer the prompt:
/// "1", "first", "the second one", "latest", "my resume".
///
/// "latest" maps to ordinal 1 because résumé lists are ordered newest
/// first. Returns `None` when the input is not recognizable; the caller
/// reports `InvalidSelection` and the workflow state stays put.
pub fn parse_resume_selection(input: &str) -> Option<ResumeSelection> {
    let normalized = input.trim().to_lowercase();
    let normalized = normalized
        .trim_start_matches("the ")
        .trim_end_matches(" one")
        .trim_end_matches(" resume")
        .trim();

    let ordinal = match normalized {
        "1" | "first" => 1,
        "2" | "second" => 2,
        "3" | "third" => 3,
        "latest" | "most recent" | "newest" | "last" => 1,
        "my" | "my resume" | "active" | "current" => return Some(ResumeSelection::ActiveResume),
        other => other.parse::<usize>().ok()?,
    };

    Some(ResumeSelection::Ordinal(ordinal))
}

/// Which jobs a matching run should cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobFilter {
    All,
    /// Jobs with no stored match for the selected résumé yet.
    Unmatched,
    Keyword(String),
}

/// Parses a job-filter answer. Numbers mirror the menu shown when the
/// résumé was selected (1 = all, 2 = unmatched); anything else is a
/// keyword filter. Empty input is not a valid filter.
pub fn parse_job_filter(input: &str) -> Option<JobFilter> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.to_lowercase().as_str() {
        "1" | "all" | "all jobs" | "everything" | "every job" => Some(JobFilter::All),
        "2" | "unmatched" | "only unmatched" | "new jobs" => Some(JobFilter::Unmatched),
        _ => Some(JobFilter::Keyword(trimmed.to_string())),
    }
}
