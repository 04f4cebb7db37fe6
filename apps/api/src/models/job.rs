use serde::{Deserialize, Serialize};

/// A job posting, either freshly fetched from the search provider or
/// loaded from the `jobs` table.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct JobPosting {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub description: String,
}
