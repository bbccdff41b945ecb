//! Post-hoc quality scoring of a completed pipeline result.
//!
//! Pure and deterministic: no network calls, no side effects, same input
//! always yields the same output. The score is computed on demand and never
//! persisted.

use crate::types::{PipelineResult, PipelineStatus};

/// Response length above which the length bonus applies.
const LONG_RESPONSE_CHARS: usize = 200;

/// Score a completed result on [0, 1].
///
/// Weighted rubric:
/// - status: success 0.4, partial 0.2, failed 0.0
/// - +0.2 when any web sources were surfaced
/// - +0.2 × confidence_score
/// - +0.1 when the response exceeds 200 characters
/// - +0.1 when the response carries a quantitative signal (percent sign,
///   currency sign, or digits)
pub fn score(result: &PipelineResult) -> f64 {
    let mut score = match result.status {
        PipelineStatus::Success => 0.4,
        PipelineStatus::Partial => 0.2,
        PipelineStatus::Failed => 0.0,
    };

    if !result.metadata.web_sources.is_empty() {
        score += 0.2;
    }

    score += 0.2 * result.metadata.confidence_score.clamp(0.0, 1.0);

    if result.final_response.chars().count() > LONG_RESPONSE_CHARS {
        score += 0.1;
    }

    if has_quantitative_signal(&result.final_response) {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

fn has_quantitative_signal(text: &str) -> bool {
    text.chars()
        .any(|c| c.is_ascii_digit() || matches!(c, '%' | '$' | '€' | '£'))
}
