use serde::{Deserialize, Serialize};

/// A résumé as listed for selection (no body text).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResumeSummary {
    pub id: i64,
    pub name: String,
}

/// A résumé with its full text, as fed to the scoring oracle.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResumeDoc {
    pub id: i64,
    pub name: String,
    pub text: String,
}
