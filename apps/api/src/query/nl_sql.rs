//! NL→SQL pipeline: question → generated SELECT → safety gate → store.
//!
//! The guard is the only thing standing between model output and the
//! database, so generation never bypasses `sanitize_generated_sql`.

use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::AppError;
use crate::llm_client::{strip_code_fences, LlmClient};
use crate::query::guard::{validate, Verdict};
use crate::query::prompts::{sql_generation_prompt, SQL_GENERATION_SYSTEM};
use crate::store::Store;

/// Cleans raw model output into an executable query, or rejects it.
///
/// Models habitually terminate the statement with a single `;` even when
/// told not to, so one trailing separator is trimmed before validation.
/// Any separator that survives the trim still rejects.
pub fn sanitize_generated_sql(raw: &str) -> Result<String, AppError> {
    let sql = strip_code_fences(raw).trim();
    let sql = sql.strip_suffix(';').unwrap_or(sql).trim_end();

    if sql.is_empty() {
        return Err(AppError::Rejected("generator returned no query".to_string()));
    }

    match validate(sql) {
        Verdict::Safe => Ok(sql.to_string()),
        Verdict::Rejected(reason) => Err(AppError::Rejected(reason)),
    }
}

/// Answers a natural-language question about saved data. Returns the rows
/// as JSON objects (column set depends on the generated query).
pub async fn run_query(
    question: &str,
    llm: &LlmClient,
    store: &Arc<dyn Store>,
) -> Result<(String, Vec<serde_json::Value>), AppError> {
    if question.trim().is_empty() {
        return Err(AppError::Validation("question cannot be empty".to_string()));
    }

    let prompt = sql_generation_prompt(question);
    let response = llm
        .call(&prompt, SQL_GENERATION_SYSTEM)
        .await
        .map_err(|e| AppError::OracleUnavailable(format!("SQL generation failed: {e}")))?;

    let raw = response
        .text()
        .ok_or_else(|| AppError::OracleUnavailable("SQL generator returned no text".to_string()))?;
    debug!("Generated SQL (raw): {raw}");

    let sql = sanitize_generated_sql(raw)?;
    info!("Executing validated query: {sql}");

    let rows = store.execute_readonly(&sql).await?;
    Ok((sql, rows))
}
