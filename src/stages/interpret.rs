//! Stage 1: query interpretation.
//!
//! Enriches the raw user query into a structured search brief via one
//! provider call. The reply is expected to carry five labeled fields; a
//! parse miss is non-fatal — the raw query stands in for the optimized one
//! and the pipeline continues.

use crate::gateway::{Attribution, ChatGateway, ChatModel, ChatRequest, Message, ProviderError};
use crate::types::{PipelineRequest, StageKind, StageOutcome};

use super::{depth_directive, outcome_from_response};

/// The five fields Stage 1 asks the model to produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterpretationFields {
    pub intent: Option<String>,
    /// The search query Stage 2 will run. Always present in this variant.
    pub optimized_query: String,
    pub keywords: Vec<String>,
    pub recency_window: Option<String>,
    pub data_sought: Option<String>,
}

/// Outcome of parsing the Stage 1 reply.
///
/// The optimized query is the only field the downstream stages depend on;
/// when it cannot be located the whole reply is treated as a parse failure
/// and the raw user query is used instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedInterpretation {
    Fields(InterpretationFields),
    ParseFailure,
}

impl ParsedInterpretation {
    /// The query Stage 2 should run, falling back to the raw user query.
    pub fn optimized_query<'a>(&'a self, raw_query: &'a str) -> &'a str {
        match self {
            ParsedInterpretation::Fields(f) => &f.optimized_query,
            ParsedInterpretation::ParseFailure => raw_query,
        }
    }
}

/// Labels accepted for the optimized-query field, checked in order.
const QUERY_LABELS: &[&str] = &["optimized query", "optimized search query", "search query"];

/// Extract the value of a `LABEL: value` line, case-insensitive on the label.
fn field_value<'a>(lines: &'a [&'a str], label: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let (head, tail) = line.split_once(':')?;
        if head.trim().eq_ignore_ascii_case(label) {
            let v = tail.trim();
            (!v.is_empty()).then_some(v)
        } else {
            None
        }
    })
}

/// Best-effort extraction of the five labeled fields from model free text.
pub fn parse_reply(text: &str) -> ParsedInterpretation {
    let lines: Vec<&str> = text.lines().map(|l| l.trim_start_matches(['-', '*', ' '])).collect();

    let optimized_query = QUERY_LABELS
        .iter()
        .find_map(|label| field_value(&lines, label));

    let Some(optimized_query) = optimized_query else {
        return ParsedInterpretation::ParseFailure;
    };

    let keywords = field_value(&lines, "keywords")
        .map(|v| {
            v.split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    ParsedInterpretation::Fields(InterpretationFields {
        intent: field_value(&lines, "intent").map(str::to_string),
        optimized_query: optimized_query.to_string(),
        keywords,
        recency_window: field_value(&lines, "recency").map(str::to_string),
        data_sought: field_value(&lines, "data type").map(str::to_string),
    })
}

fn build_messages(req: &PipelineRequest) -> Vec<Message> {
    let mut context = String::new();
    if let Some(session) = &req.session_config {
        if let Some(company) = &session.company_name {
            context.push_str(&format!("\nCompany: {company}"));
        }
        if let Some(industry) = &session.industry {
            context.push_str(&format!("\nIndustry: {industry}"));
        }
    }

    let system = format!(
        "You are a query interpreter for an AI research assistant focused on {}. \
         {} \
         Restate the user's need as a structured search brief with exactly these \
         labeled lines:\n\
         INTENT: <what the user is trying to learn>\n\
         OPTIMIZED QUERY: <a single search query tuned for web research>\n\
         KEYWORDS: <comma-separated key terms>\n\
         RECENCY: <how fresh the data must be>\n\
         DATA TYPE: <the kind of data sought, e.g. pricing, market share>",
        req.agent_type.focus(),
        depth_directive(req.context_level),
    );

    let user = if context.is_empty() {
        format!("Query: {}", req.user_query)
    } else {
        format!("Query: {}\n\nSession context:{context}", req.user_query)
    };

    vec![Message::system(system), Message::user(user)]
}

/// Run Stage 1: one provider call plus best-effort field extraction.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &ChatModel,
    req: &PipelineRequest,
    attribution: Attribution,
) -> Result<(StageOutcome, ParsedInterpretation), ProviderError> {
    let chat_req = ChatRequest::new(model.clone(), build_messages(req), attribution)
        .temperature(0.2)
        .max_tokens(512);

    let resp = gateway.chat(chat_req).await?;
    let parsed = parse_reply(&resp.content);

    if parsed == ParsedInterpretation::ParseFailure {
        tracing::debug!(stage = "interpret", "field extraction missed; using raw query");
    }

    Ok((outcome_from_response(StageKind::Interpret, model, &resp), parsed))
}
