//! Result cache — holds the most recent list-shaped results per kind,
//! addressable by 1-based ordinal.
//!
//! Each list-producing operation replaces the cache for its kind
//! wholesale. Old ordinals are invalidated the moment a new list lands;
//! there is no versioning.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::job::JobPosting;
use crate::models::match_record::MatchSummary;
use crate::models::resume::ResumeSummary;

/// Which family of results a cached list belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Search,
    Match,
    Query,
}

impl std::fmt::Display for ResultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultKind::Search => write!(f, "search"),
            ResultKind::Match => write!(f, "match"),
            ResultKind::Query => write!(f, "query"),
        }
    }
}

/// One row of a cached result list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CachedRow {
    Job(JobPosting),
    Resume(ResumeSummary),
    Match(MatchSummary),
    /// A row returned by the read-only query pipeline, kept as JSON since
    /// the column set is query-dependent.
    Query(serde_json::Value),
}

#[derive(Debug, Default)]
pub struct ResultCache {
    search: Option<Vec<CachedRow>>,
    matches: Option<Vec<CachedRow>>,
    query: Option<Vec<CachedRow>>,
}

impl ResultCache {
    /// Replaces the cached list for `kind`. Insertion order is display
    /// order; ordinals are stable until the next `store` for this kind.
    pub fn store(&mut self, kind: ResultKind, rows: Vec<CachedRow>) {
        *self.slot_mut(kind) = Some(rows);
    }

    /// Resolves a 1-based ordinal against the cached list for `kind`.
    ///
    /// `NoResults` means no list of this kind was ever stored in the
    /// session; `OutOfRange` means a list exists but the ordinal misses it.
    pub fn resolve(&self, kind: ResultKind, ordinal: usize) -> Result<&CachedRow, AppError> {
        let rows = self.slot(kind).as_ref().ok_or(AppError::NoResults(kind))?;
        if ordinal < 1 || ordinal > rows.len() {
            return Err(AppError::OutOfRange {
                ordinal,
                len: rows.len(),
            });
        }
        Ok(&rows[ordinal - 1])
    }

    /// Swaps the row at a 1-based ordinal in place, keeping display
    /// order and the other ordinals untouched.
    pub fn replace(
        &mut self,
        kind: ResultKind,
        ordinal: usize,
        row: CachedRow,
    ) -> Result<(), AppError> {
        let rows = self
            .slot_mut(kind)
            .as_mut()
            .ok_or(AppError::NoResults(kind))?;
        if ordinal < 1 || ordinal > rows.len() {
            return Err(AppError::OutOfRange {
                ordinal,
                len: rows.len(),
            });
        }
        rows[ordinal - 1] = row;
        Ok(())
    }

    pub fn len(&self, kind: ResultKind) -> usize {
        self.slot(kind).as_ref().map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.search = None;
        self.matches = None;
        self.query = None;
    }

    fn slot(&self, kind: ResultKind) -> &Option<Vec<CachedRow>> {
        match kind {
            ResultKind::Search => &self.search,
            ResultKind::Match => &self.matches,
            ResultKind::Query => &self.query,
        }
    }

    fn slot_mut(&mut self, kind: ResultKind) -> &mut Option<Vec<CachedRow>> {
        match kind {
            ResultKind::Search => &mut self.search,
            ResultKind::Match => &mut self.matches,
            ResultKind::Query => &mut self.query,
        }
    }
}
