//! The three stage handlers of the tripartite flow.
//!
//! Each stage builds its prompt, makes exactly one gateway call, and returns
//! a [`StageOutcome`](crate::types::StageOutcome) plus its typed payload.
//! Prompt assembly is kept provider-agnostic; the gateway decides transport.

pub mod interpret;
pub mod search;
pub mod style;

use crate::gateway::{ChatModel, ChatResponse};
use crate::types::{ContextLevel, StageKind, StageOutcome};

pub use interpret::{InterpretationFields, ParsedInterpretation};

/// Build a stage outcome from a gateway response.
fn outcome_from_response(stage: StageKind, model: &ChatModel, resp: &ChatResponse) -> StageOutcome {
    StageOutcome {
        stage,
        model: model.model_id().to_string(),
        output: resp.content.clone(),
        tokens_used: resp.total_tokens(),
        cost_nanodollars: resp.cost_nanodollars,
        latency_ms: resp.latency.as_millis() as u64,
    }
}

/// Depth directive woven into every stage's system prompt.
fn depth_directive(level: ContextLevel) -> &'static str {
    match level {
        ContextLevel::Basic => "Keep the analysis concise and high-level.",
        ContextLevel::Enhanced => {
            "Provide substantive analysis with supporting detail where it adds value."
        }
        ContextLevel::Elite => {
            "Provide exhaustive, expert-grade analysis. Surface second-order implications \
             and quantify wherever possible."
        }
    }
}
