//! Pipeline orchestrator: interpret → search → style.
//!
//! One `execute` call is one linear sequence of up to three dependent
//! provider calls. Separate executions share nothing; the token/cost/latency
//! accumulator is local to a single run. A failing stage terminates the
//! execution immediately — no internal retry, no skipping ahead — and is
//! surfaced as a well-formed `Failed` result rather than an error.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::error::PipelineError;
use crate::gateway::{Attribution, ChatGateway, ChatModel, ProviderError};
use crate::progress::{NoopObserver, PipelineObserver, PipelineState, StageTransition};
use crate::stages::{self, ParsedInterpretation};
use crate::types::{
    CallerIdentity, PipelineConfig, PipelineRequest, PipelineResult, PipelineStatus, StageKind,
    StageOutcome,
};

/// Confidence reported when no web search data is available on a
/// non-failed result.
const NEUTRAL_CONFIDENCE: f64 = 0.5;

/// Which provider backs each stage, fixed at construction.
///
/// Stage identity is decided here by dependency injection, never by model
/// strings threaded through prompts. The gateway is shared; the models
/// differ per stage (Stage 2 needs a web-search-capable one).
#[derive(Clone)]
pub struct StageBackends {
    pub gateway: Arc<dyn ChatGateway>,
    pub interpret_model: ChatModel,
    pub search_model: ChatModel,
    pub style_model: ChatModel,
}

impl StageBackends {
    /// Default OpenRouter model assignment: a cheap interpreter, a
    /// web-search-capable retriever, a strong synthesizer.
    pub fn openrouter_defaults(gateway: Arc<dyn ChatGateway>) -> Self {
        Self {
            gateway,
            interpret_model: ChatModel::openrouter("openai/gpt-4o-mini"),
            search_model: ChatModel::openrouter("perplexity/sonar"),
            style_model: ChatModel::openrouter("anthropic/claude-sonnet-4-5"),
        }
    }
}

/// Sequences the three stages and accumulates telemetry.
pub struct PipelineOrchestrator {
    backends: StageBackends,
    observer: Arc<dyn PipelineObserver>,
}

impl PipelineOrchestrator {
    pub fn new(backends: StageBackends) -> Self {
        Self {
            backends,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run the flow for one request.
    ///
    /// `Err` only for precondition violations (missing identity token, empty
    /// query), raised before any stage runs. Stage-level provider failures
    /// come back as `Ok` with `status == Failed` and a templated
    /// `final_response` naming the failing stage.
    pub async fn execute(
        &self,
        identity: &CallerIdentity,
        request: &PipelineRequest,
        config: &PipelineConfig,
    ) -> Result<PipelineResult, PipelineError> {
        if !identity.is_authenticated() {
            return Err(PipelineError::AuthenticationRequired);
        }
        if request.user_query.trim().is_empty() {
            return Err(PipelineError::InvalidRequest(
                "user_query must be non-empty".into(),
            ));
        }

        let execution_id = Uuid::new_v4();
        let start = Instant::now();
        let mut state = PipelineState::Idle;
        let mut outcomes: Vec<StageOutcome> = Vec::with_capacity(3);

        tracing::debug!(%execution_id, agent = ?request.agent_type, "execution started");

        // --- Stage 1: interpret ---
        let mut interpretation = ParsedInterpretation::ParseFailure;
        let mut interpretation_text: Option<String> = None;

        if config.interpret {
            self.advance(&mut state, PipelineState::Interpreting, None).await;
            let attribution = self.attribution("stages::interpret", identity, execution_id);
            match stages::interpret::run(
                self.backends.gateway.as_ref(),
                &self.backends.interpret_model,
                request,
                attribution,
            )
            .await
            {
                Ok((outcome, parsed)) => {
                    interpretation_text = Some(outcome.output.clone());
                    interpretation = parsed;
                    outcomes.push(outcome);
                }
                Err(err) => {
                    return Ok(self
                        .fail(&mut state, request, outcomes, StageKind::Interpret, &err, start)
                        .await);
                }
            }
        }

        let optimized_query = interpretation
            .optimized_query(&request.user_query)
            .to_string();

        // --- Stage 2: search ---
        let mut findings: Option<String> = None;
        let mut web_sources: Vec<String> = Vec::new();
        let mut web_confidence: Option<f64> = None;

        if config.search {
            self.advance(&mut state, PipelineState::Searching, None).await;
            let attribution = self.attribution("stages::search", identity, execution_id);
            match stages::search::run(
                self.backends.gateway.as_ref(),
                &self.backends.search_model,
                request,
                &optimized_query,
                attribution,
            )
            .await
            {
                Ok((outcome, web)) => {
                    findings = Some(outcome.output.clone());
                    if let Some(web) = web {
                        web_sources = web.sources;
                        web_confidence = Some(web.confidence);
                    }
                    outcomes.push(outcome);
                }
                Err(err) => {
                    return Ok(self
                        .fail(&mut state, request, outcomes, StageKind::Search, &err, start)
                        .await);
                }
            }
        }

        // --- Stage 3: style ---
        let mut final_response: Option<String> = None;

        if config.style {
            self.advance(&mut state, PipelineState::Styling, None).await;
            let attribution = self.attribution("stages::style", identity, execution_id);
            match stages::style::run(
                self.backends.gateway.as_ref(),
                &self.backends.style_model,
                request,
                interpretation_text.as_deref(),
                findings.as_deref(),
                attribution,
            )
            .await
            {
                Ok(outcome) => {
                    if !outcome.output.trim().is_empty() {
                        final_response = Some(outcome.output.clone());
                    }
                    outcomes.push(outcome);
                }
                Err(err) => {
                    return Ok(self
                        .fail(&mut state, request, outcomes, StageKind::Style, &err, start)
                        .await);
                }
            }
        }

        // A disabled style stage promotes the last executed output; an empty
        // synthesis reply degrades to a templated message instead of an
        // empty final_response.
        let (final_response, status) = match final_response {
            Some(text) => (text, PipelineStatus::Success),
            None => match outcomes.last() {
                Some(last) if !last.output.trim().is_empty() => {
                    (last.output.clone(), PipelineStatus::Success)
                }
                _ => (
                    format!(
                        "No stage produced content for \"{}\". Please retry your query.",
                        request.user_query
                    ),
                    PipelineStatus::Partial,
                ),
            },
        };

        let confidence = web_confidence.unwrap_or(NEUTRAL_CONFIDENCE);
        let elapsed_ms = start.elapsed().as_millis() as u64;

        self.advance(&mut state, PipelineState::Complete, None).await;
        tracing::debug!(%execution_id, elapsed_ms, stages = outcomes.len(), "execution complete");

        Ok(PipelineResult::assemble(
            final_response,
            outcomes,
            web_sources,
            confidence,
            elapsed_ms,
            status,
        ))
    }

    fn attribution(
        &self,
        caller: &'static str,
        identity: &CallerIdentity,
        execution_id: Uuid,
    ) -> Attribution {
        Attribution::new(caller)
            .with_user(identity.user_id)
            .with_execution(execution_id)
    }

    async fn advance(
        &self,
        state: &mut PipelineState,
        next: PipelineState,
        detail: Option<String>,
    ) {
        debug_assert!(
            state.can_transition_to(next),
            "illegal transition {state:?} -> {next:?}"
        );
        *state = next;
        let transition = match detail {
            Some(d) => StageTransition::with_detail(next, d),
            None => StageTransition::entered(next),
        };
        self.observer.on_transition(transition).await;
    }

    /// Convert a stage failure into a well-formed `Failed` result.
    async fn fail(
        &self,
        state: &mut PipelineState,
        request: &PipelineRequest,
        outcomes: Vec<StageOutcome>,
        stage: StageKind,
        err: &ProviderError,
        start: Instant,
    ) -> PipelineResult {
        tracing::warn!(stage = stage.as_str(), error = %err, "stage failed; terminating execution");
        self.advance(
            state,
            PipelineState::Failed,
            Some(format!("{}: {err}", stage.as_str())),
        )
        .await;

        let final_response = format!(
            "The {} stage could not be completed: {err}. \
             Your query \"{}\" was not fully processed — please retry.",
            stage.as_str(),
            request.user_query,
        );

        PipelineResult::assemble(
            final_response,
            outcomes,
            Vec::new(),
            0.0,
            start.elapsed().as_millis() as u64,
            PipelineStatus::Failed,
        )
    }
}
