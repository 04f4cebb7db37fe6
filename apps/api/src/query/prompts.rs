//! Prompt for SQL generation over the saved-data schema.

pub const SQL_GENERATION_SYSTEM: &str = "You are a SQL expert. You translate questions about \
a user's saved jobs, resumes, and match results into a single read-only SQL query.";

/// The fixed read-only schema exposed to the generator. Kept as a literal
/// rather than introspected at runtime: the query surface is a contract,
/// not whatever happens to be in the database.
///
/// Column names here must survive the safety gate's substring denylist
/// (so `saved_at`, never `created_at`); otherwise the generator is
/// steered into queries the gate is guaranteed to reject.
pub const SCHEMA: &str = r#"Table: resumes
  - id (BIGINT) [PRIMARY KEY]
  - name (TEXT)
  - text (TEXT)
  - saved_at (TIMESTAMPTZ)

Table: jobs
  - id (BIGINT) [PRIMARY KEY]
  - title (TEXT)
  - company (TEXT)
  - location (TEXT)
  - link (TEXT)
  - description (TEXT)
  - saved_at (TIMESTAMPTZ)

Table: resume_job_matches
  - resume_id (BIGINT) [references resumes.id]
  - job_id (BIGINT) [references jobs.id]
  - overall_score (INT)
  - skill_alignment (INT)
  - experience_match (INT)
  - role_fit (INT)
  - cultural_fit (INT, nullable)
  - reasoning (TEXT)
  - matched_at (TIMESTAMPTZ)
  - unique on (resume_id, job_id)"#;

pub const SQL_GENERATION_TEMPLATE: &str = r#"Given the following database schema and a user question, generate a safe SQL SELECT query.

DATABASE SCHEMA:

{schema}

User Question: {question}

RULES:
1. Generate ONLY a SELECT query (no modifications of any kind)
2. Return ONLY the SQL query, nothing else
3. Use standard PostgreSQL syntax
4. Limit results to 50 rows maximum using a LIMIT clause
5. Do not use semicolons, comments, or multiple statements
6. Do not include markdown formatting or code blocks

SQL Query:"#;

pub fn sql_generation_prompt(question: &str) -> String {
    SQL_GENERATION_TEMPLATE
        .replace("{schema}", SCHEMA)
        .replace("{question}", question)
}
