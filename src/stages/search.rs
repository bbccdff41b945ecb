//! Stage 2: web intelligence retrieval.
//!
//! One web-augmented provider call using Stage 1's optimized query. Output
//! is opaque text passed verbatim to Stage 3; citations surface through
//! `ChatResponse::web`.

use crate::gateway::{
    Attribution, ChatGateway, ChatModel, ChatRequest, Message, ProviderError, WebSearchData,
};
use crate::types::{PipelineRequest, StageKind, StageOutcome};

use super::{depth_directive, outcome_from_response};

fn build_messages(req: &PipelineRequest, optimized_query: &str) -> Vec<Message> {
    let mut constraints = String::from(
        "Constraints:\n\
         - Prefer data published within the last 30 days.\n\
         - Every claim should carry a quantitative figure where one exists.\n",
    );

    if let Some(session) = &req.session_config {
        match (&session.company_name, &session.industry) {
            (Some(company), Some(industry)) => constraints.push_str(&format!(
                "- Prefer competitive and market context naming {company} and the {industry} industry.\n"
            )),
            (Some(company), None) => constraints.push_str(&format!(
                "- Prefer competitive context naming {company}.\n"
            )),
            (None, Some(industry)) => constraints.push_str(&format!(
                "- Prefer market context for the {industry} industry.\n"
            )),
            (None, None) => {}
        }
    }

    let system = format!(
        "You are a web research specialist for {}. {} \
         Search the web and report the findings with figures and sources.",
        req.agent_type.focus(),
        depth_directive(req.context_level),
    );

    vec![
        Message::system(system),
        Message::user(format!("{optimized_query}\n\n{constraints}")),
    ]
}

/// Run Stage 2: one web-search-capable provider call.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &ChatModel,
    req: &PipelineRequest,
    optimized_query: &str,
    attribution: Attribution,
) -> Result<(StageOutcome, Option<WebSearchData>), ProviderError> {
    let chat_req = ChatRequest::new(
        model.clone(),
        build_messages(req, optimized_query),
        attribution,
    )
    .temperature(0.3)
    .max_tokens(2048)
    .with_web_search();

    let resp = gateway.chat(chat_req).await?;
    let web = resp.web.clone();

    Ok((outcome_from_response(StageKind::Search, model, &resp), web))
}
