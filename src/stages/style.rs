//! Stage 3: response synthesis.
//!
//! Combines the original query, Stage 1's interpretation, and Stage 2's raw
//! findings into one user-facing answer. The output format (dated "as of"
//! opener, at least three quantitative data points, closing sources line) is
//! requested via the prompt; the stage accepts whatever text the provider
//! returns.

use chrono::Utc;

use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, Message, ProviderError};
use crate::types::{PipelineRequest, StageKind, StageOutcome};

use super::{depth_directive, outcome_from_response};

fn build_messages(
    req: &PipelineRequest,
    interpretation: Option<&str>,
    findings: Option<&str>,
) -> Vec<Message> {
    let today = Utc::now().format("%Y-%m-%d");

    let system = format!(
        "You are the response synthesizer for {}. {} \
         Format requirements:\n\
         - Open with \"As of {today}\".\n\
         - Include at least three quantitative data points.\n\
         - Close with a \"Sources:\" line listing where the findings came from.",
        req.agent_type.focus(),
        depth_directive(req.context_level),
    );

    let mut user = format!("## Original question\n\n{}\n", req.user_query);
    if let Some(interp) = interpretation {
        user.push_str(&format!("\n## Query interpretation\n\n{interp}\n"));
    }
    if let Some(findings) = findings {
        user.push_str(&format!("\n## Web research findings\n\n{findings}\n"));
    }
    user.push_str(
        "\nSynthesize one coherent answer to the original question from the \
         material above. Produce ONLY the answer — no meta-commentary.",
    );

    vec![Message::system(system), Message::user(user)]
}

/// Run Stage 3: one synthesis call combining the prior stages' outputs.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &ChatModel,
    req: &PipelineRequest,
    interpretation: Option<&str>,
    findings: Option<&str>,
    attribution: Attribution,
) -> Result<StageOutcome, ProviderError> {
    let chat_req = ChatRequest::new(
        model.clone(),
        build_messages(req, interpretation, findings),
        attribution,
    )
    .temperature(0.4)
    .max_tokens(4096);

    let resp = gateway.chat(chat_req).await?;

    Ok(outcome_from_response(StageKind::Style, model, &resp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentType, ContextLevel};

    fn request() -> PipelineRequest {
        PipelineRequest {
            user_query: "competitor pricing for Acme Corp".into(),
            agent_type: AgentType::Cir,
            session_config: None,
            context_level: ContextLevel::Enhanced,
        }
    }

    #[test]
    fn prompt_contains_both_prior_outputs() {
        let messages = build_messages(&request(), Some("INTERP-OUT"), Some("SEARCH-OUT"));
        let user = &messages[1].content;
        assert!(user.contains("competitor pricing for Acme Corp"));
        assert!(user.contains("INTERP-OUT"));
        assert!(user.contains("SEARCH-OUT"));
    }

    #[test]
    fn prompt_mandates_format_contract() {
        let messages = build_messages(&request(), None, None);
        let system = &messages[0].content;
        assert!(system.contains("As of"));
        assert!(system.contains("three quantitative data points"));
        assert!(system.contains("Sources:"));
    }
}
