//! Per-session conversation state. One value per session, owned by the
//! registry and never shared across sessions.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::session::cache::ResultCache;
use crate::session::workflow::Workflow;

/// Preferences learned from the conversation. Append-only and
/// deduplicated; a reset does not discard them.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Preferences {
    pub locations: BTreeSet<String>,
    pub job_types: BTreeSet<String>,
    pub companies: BTreeSet<String>,
}

impl Preferences {
    pub fn learn_location(&mut self, location: &str) {
        let trimmed = location.trim();
        if !trimmed.is_empty() {
            self.locations.insert(trimmed.to_string());
        }
    }

    pub fn learn_job_type(&mut self, job_type: &str) {
        let trimmed = job_type.trim();
        if !trimmed.is_empty() {
            self.job_types.insert(trimmed.to_string());
        }
    }

    pub fn learn_company(&mut self, company: &str) {
        let trimmed = company.trim();
        if !trimmed.is_empty() {
            self.companies.insert(trimmed.to_string());
        }
    }
}

#[derive(Debug)]
pub struct ConversationState {
    /// Last résumé the user focused on; read by ordinal-free follow-ups
    /// like "my resume".
    pub active_resume_ref: Option<i64>,
    /// Last job the user focused on.
    pub active_job_ref: Option<i64>,
    pub cache: ResultCache,
    pub workflow: Workflow,
    pub preferences: Preferences,
    pub started_at: DateTime<Utc>,
    pub turns: u64,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            active_resume_ref: None,
            active_job_ref: None,
            cache: ResultCache::default(),
            workflow: Workflow::default(),
            preferences: Preferences::default(),
            started_at: Utc::now(),
            turns: 0,
        }
    }
}

impl ConversationState {
    /// Explicit reset: back to `Idle`, caches and focus dropped.
    /// Preferences persist — they are learned, not in-progress state.
    pub fn reset(&mut self) {
        self.active_resume_ref = None;
        self.active_job_ref = None;
        self.cache.clear();
        self.workflow = Workflow::Idle;
    }

    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            active_resume_ref: self.active_resume_ref,
            active_job_ref: self.active_job_ref,
            workflow: self.workflow.clone(),
            preferences: self.preferences.clone(),
            started_at: self.started_at,
            turns: self.turns,
        }
    }
}

/// What the UI shows in its "conversation context" panel.
#[derive(Debug, Clone, Serialize)]
pub struct ContextSnapshot {
    pub active_resume_ref: Option<i64>,
    pub active_job_ref: Option<i64>,
    pub workflow: Workflow,
    pub preferences: Preferences,
    pub started_at: DateTime<Utc>,
    pub turns: u64,
}
