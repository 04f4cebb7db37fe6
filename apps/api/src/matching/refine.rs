//! Self-critique refinement loop.
//!
//! Each iteration is a full two-oracle round trip: the scoring oracle
//! produces an analysis conditioned on all guidance gathered so far, the
//! critic grades it. Guidance accumulates and never resets. The loop stops
//! on a good-enough grade, on iteration exhaustion, or when the caller or
//! the oracle pulls the plug between iterations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::errors::AppError;
use crate::matching::oracle::{CriticOracle, Critique, ScoreCard, ScoringOracle};
use crate::matching::scorer::score_with_retry;

pub const DEFAULT_MAX_ITERATIONS: usize = 3;
pub const DEFAULT_QUALITY_THRESHOLD: i32 = 85;

#[derive(Debug, Clone, Copy)]
pub struct RefineConfig {
    pub max_iterations: usize,
    pub quality_threshold: i32,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
        }
    }
}

/// Cooperative cancellation flag, checked between iterations only —
/// never mid-oracle-call.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One completed iteration: the analysis and the grade it received.
#[derive(Debug, Clone, Serialize)]
pub struct RefinementStep {
    pub analysis: ScoreCard,
    pub critique: Critique,
}

/// How the run ended. Callers use this to tell a converged analysis from
/// a best-effort one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefineStatus {
    /// The critic's grade met the threshold.
    Converged,
    /// Iteration cap hit; the final analysis is the last one produced.
    Exhausted,
    /// Cancelled or oracle lost mid-run; the final analysis is the best
    /// graded so far.
    Aborted,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefineOutcome {
    pub final_analysis: ScoreCard,
    pub status: RefineStatus,
    pub trace: Vec<RefinementStep>,
}

impl RefineOutcome {
    pub fn iterations(&self) -> usize {
        self.trace.len()
    }
}

/// Runs the loop. Errors only when not even one analysis could be
/// produced; any later failure degrades to `Aborted` with the best
/// analysis so far.
pub async fn refine(
    scoring: &dyn ScoringOracle,
    critic: &dyn CriticOracle,
    resume_text: &str,
    job_text: &str,
    config: RefineConfig,
    cancel: &CancelFlag,
) -> Result<RefineOutcome, AppError> {
    let mut guidance: Vec<String> = Vec::new();
    let mut trace: Vec<RefinementStep> = Vec::new();
    // Best analysis by critic grade, for aborted runs.
    let mut best: Option<(i32, ScoreCard)> = None;

    for iteration in 0..config.max_iterations.max(1) {
        if iteration > 0 && cancel.is_cancelled() {
            info!("Refinement cancelled after {iteration} iteration(s)");
            return Ok(aborted(best, trace));
        }

        debug!(
            "Refinement iteration {}/{} ({} guidance items)",
            iteration + 1,
            config.max_iterations,
            guidance.len()
        );

        let analysis = match score_with_retry(scoring, resume_text, job_text, &guidance).await {
            Ok(card) => card,
            Err(e) if trace.is_empty() => return Err(e),
            Err(e) => {
                warn!("Refinement aborted mid-run: {e}");
                return Ok(aborted(best, trace));
            }
        };

        let critique = match critic.critique(&analysis).await {
            Ok(c) => c,
            Err(e) => {
                warn!("Critic failed, keeping best analysis so far: {e}");
                // The ungraded analysis still beats nothing at all.
                let fallback = best
                    .map(|(_, card)| card)
                    .unwrap_or_else(|| analysis.clone());
                return Ok(RefineOutcome {
                    final_analysis: fallback,
                    status: RefineStatus::Aborted,
                    trace,
                });
            }
        };

        let quality = critique.quality_score;
        if best.as_ref().map_or(true, |(q, _)| quality > *q) {
            best = Some((quality, analysis.clone()));
        }

        trace.push(RefinementStep {
            analysis: analysis.clone(),
            critique: critique.clone(),
        });

        if quality >= config.quality_threshold {
            info!(
                "Refinement converged at iteration {} (quality {quality})",
                iteration + 1
            );
            return Ok(RefineOutcome {
                final_analysis: analysis,
                status: RefineStatus::Converged,
                trace,
            });
        }

        guidance.extend(critique.suggestions);
    }

    // Threshold never met: best-effort, not an error. The last analysis
    // produced is the final one.
    let final_analysis = trace
        .last()
        .map(|step| step.analysis.clone())
        .expect("loop ran at least once");
    Ok(RefineOutcome {
        final_analysis,
        status: RefineStatus::Exhausted,
        trace,
    })
}

fn aborted(best: Option<(i32, ScoreCard)>, trace: Vec<RefinementStep>) -> RefineOutcome {
    let final_analysis = best
        .map(|(_, card)| card)
        .or_else(|| trace.last().map(|s| s.analysis.clone()))
        .expect("aborted only after at least one iteration");
    RefineOutcome {
        final_analysis,
        status: RefineStatus::Aborted,
        trace,
    }
}
