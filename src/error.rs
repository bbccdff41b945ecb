//! Flow-level error taxonomy.
//!
//! Only precondition failures and strict-mode quality rejections surface as
//! `Err`. Stage invocation failures become a `Failed`-status
//! [`PipelineResult`](crate::types::PipelineResult) so callers always receive
//! a well-formed object from `execute`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller did not supply a usable identity token. Raised before any
    /// stage runs; always propagates.
    #[error("authentication required: no valid identity token supplied")]
    AuthenticationRequired,

    /// Request precondition violated (e.g. empty user query). Raised before
    /// any stage runs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Strict mode only: the computed quality score fell below the
    /// configured threshold. Carries both values so the caller can decide
    /// what to do next.
    #[error("quality below threshold: scored {score:.3}, required {threshold:.3}")]
    QualityBelowThreshold { score: f64, threshold: f64 },
}

impl PipelineError {
    /// Short code for logging.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::InvalidRequest(_) => "invalid_request",
            Self::QualityBelowThreshold { .. } => "quality_below_threshold",
        }
    }
}
