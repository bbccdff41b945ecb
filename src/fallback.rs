//! Fallback controller: quality gating around the orchestrator.
//!
//! Strict mode rejects any result scoring below the configured threshold,
//! even one the orchestrator marked successful. Graceful mode never
//! re-checks the threshold on a returned result; it only intervenes when the
//! orchestrator call itself errored (an authentication/precondition
//! failure), substituting a templated degraded result.

use std::sync::Arc;

use crate::error::PipelineError;
use crate::orchestrator::PipelineOrchestrator;
use crate::quality;
use crate::types::{
    CallerIdentity, FallbackMode, PipelineConfig, PipelineRequest, PipelineResult, PipelineStatus,
};

/// Quality score pinned onto a gracefully degraded result.
const DEGRADED_QUALITY_SCORE: f64 = 0.4;

/// A pipeline result annotated with its quality assessment.
#[derive(Debug, Clone)]
pub struct GuardedResult {
    pub result: PipelineResult,
    pub quality_score: f64,
    pub passes_threshold: bool,
}

/// Wraps the orchestrator with the graceful/strict fallback policy.
pub struct FallbackController {
    orchestrator: Arc<PipelineOrchestrator>,
}

impl FallbackController {
    pub fn new(orchestrator: Arc<PipelineOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Execute the flow and apply the configured fallback policy.
    pub async fn execute_advanced_flow(
        &self,
        identity: &CallerIdentity,
        request: &PipelineRequest,
        config: &PipelineConfig,
    ) -> Result<GuardedResult, PipelineError> {
        match self.orchestrator.execute(identity, request, config).await {
            Ok(result) => {
                let quality_score = quality::score(&result);
                let passes_threshold = quality_score >= config.quality_threshold;

                if config.fallback_mode == FallbackMode::Strict && !passes_threshold {
                    tracing::warn!(
                        quality_score,
                        threshold = config.quality_threshold,
                        "strict mode rejected result below threshold"
                    );
                    return Err(PipelineError::QualityBelowThreshold {
                        score: quality_score,
                        threshold: config.quality_threshold,
                    });
                }

                Ok(GuardedResult {
                    result,
                    quality_score,
                    passes_threshold,
                })
            }
            Err(err) => match config.fallback_mode {
                FallbackMode::Strict => Err(err),
                FallbackMode::Graceful => {
                    tracing::warn!(error = %err, "graceful mode substituting degraded result");
                    Ok(self.degraded(request, &err, config.quality_threshold))
                }
            },
        }
    }

    /// Templated degraded result for graceful mode: well-formed, references
    /// the original query, explains the degraded state.
    fn degraded(
        &self,
        request: &PipelineRequest,
        err: &PipelineError,
        threshold: f64,
    ) -> GuardedResult {
        let final_response = format!(
            "The advanced research flow is temporarily unavailable ({err}). \
             Your query \"{}\" was answered in degraded mode without live web \
             intelligence — please retry shortly for a full analysis.",
            request.user_query,
        );

        let result = PipelineResult::assemble(
            final_response,
            Vec::new(),
            Vec::new(),
            0.0,
            0,
            PipelineStatus::Partial,
        );

        GuardedResult {
            result,
            quality_score: DEGRADED_QUALITY_SCORE,
            passes_threshold: DEGRADED_QUALITY_SCORE >= threshold,
        }
    }
}
