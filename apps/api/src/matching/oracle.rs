//! Oracle seams for scoring and critique.
//!
//! The oracles are opaque: the core only sees the typed payloads below.
//! Carried in `AppState` as `Arc<dyn ScoringOracle>` / `Arc<dyn
//! CriticOracle>` so tests swap in deterministic implementations.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::{LlmClient, LlmError};
use crate::matching::prompts::{critic_prompt, scoring_prompt, CRITIC_SYSTEM, SCORING_SYSTEM};

#[derive(Debug, Error)]
pub enum OracleError {
    /// The oracle answered, but the payload is unusable (bad JSON,
    /// missing fields). A stricter re-request may fix this.
    #[error("oracle returned malformed output: {0}")]
    Malformed(String),

    /// Transport failure (network, timeout, rate-limit exhaustion).
    /// Retrying the same request is the transport's job, not ours.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}

impl From<LlmError> for OracleError {
    fn from(e: LlmError) -> Self {
        if e.is_transport() {
            OracleError::Unavailable(e.to_string())
        } else {
            OracleError::Malformed(e.to_string())
        }
    }
}

/// One analysis of a résumé against a job: the four sub-dimension scores
/// (cultural fit optional) and a prose summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreCard {
    pub skill_alignment: i32,
    pub experience_match: i32,
    pub role_fit: i32,
    #[serde(default)]
    pub cultural_fit: Option<i32>,
    #[serde(default)]
    pub summary: String,
}

impl ScoreCard {
    /// All produced dimensions must land in 0..=100.
    pub fn in_range(&self) -> bool {
        let dims = [
            Some(self.skill_alignment),
            Some(self.experience_match),
            Some(self.role_fit),
            self.cultural_fit,
        ];
        dims.into_iter()
            .flatten()
            .all(|score| (0..=100).contains(&score))
    }
}

/// Critic verdict on an analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Critique {
    pub quality_score: i32,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

#[async_trait]
pub trait ScoringOracle: Send + Sync {
    /// Scores a résumé against a job. `guidance` carries accumulated
    /// critique suggestions (empty outside the refinement loop);
    /// `strict` requests a stricter output format after a malformed
    /// first attempt.
    async fn score(
        &self,
        resume_text: &str,
        job_text: &str,
        guidance: &[String],
        strict: bool,
    ) -> Result<ScoreCard, OracleError>;
}

#[async_trait]
pub trait CriticOracle: Send + Sync {
    async fn critique(&self, analysis: &ScoreCard) -> Result<Critique, OracleError>;
}

/// LLM-backed scoring oracle.
pub struct LlmScoringOracle(pub LlmClient);

#[async_trait]
impl ScoringOracle for LlmScoringOracle {
    async fn score(
        &self,
        resume_text: &str,
        job_text: &str,
        guidance: &[String],
        strict: bool,
    ) -> Result<ScoreCard, OracleError> {
        let prompt = scoring_prompt(resume_text, job_text, guidance, strict);
        Ok(self.0.call_json::<ScoreCard>(&prompt, SCORING_SYSTEM).await?)
    }
}

/// LLM-backed critic.
pub struct LlmCriticOracle(pub LlmClient);

#[async_trait]
impl CriticOracle for LlmCriticOracle {
    async fn critique(&self, analysis: &ScoreCard) -> Result<Critique, OracleError> {
        let analysis_json = serde_json::to_string_pretty(analysis)
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        let prompt = critic_prompt(&analysis_json);
        Ok(self.0.call_json::<Critique>(&prompt, CRITIC_SYSTEM).await?)
    }
}
