//! End-to-end flow tests against a scripted in-process gateway.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use tripartite::gateway::{
    ChatGateway, ChatRequest, ChatResponse, FinishReason, ProviderError, Role, WebSearchData,
};
use tripartite::progress::{PipelineObserver, PipelineState, StageTransition};
use tripartite::{
    AgentType, CallerIdentity, ContextLevel, PipelineConfig, PipelineError, PipelineOrchestrator,
    PipelineRequest, PipelineStatus, StageBackends, StageKind,
};

/// One canned reply per stage, keyed by the caller attribution string.
struct ScriptedGateway {
    interpret_reply: String,
    search_reply: Result<String, String>,
    style_reply: String,
    web: Option<WebSearchData>,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedGateway {
    fn new(interpret: &str, search: &str, style: &str) -> Self {
        Self {
            interpret_reply: interpret.into(),
            search_reply: Ok(search.into()),
            style_reply: style.into(),
            web: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn with_failing_search(mut self, message: &str) -> Self {
        self.search_reply = Err(message.into());
        self
    }

    fn with_web(mut self, sources: Vec<&str>, confidence: f64) -> Self {
        self.web = Some(WebSearchData {
            sources: sources.into_iter().map(String::from).collect(),
            confidence,
        });
        self
    }

    fn recorded_calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    fn response(content: &str, tokens_in: u32, tokens_out: u32, nanos: i64) -> ChatResponse {
        ChatResponse {
            content: content.into(),
            input_tokens: tokens_in,
            output_tokens: tokens_out,
            cost_nanodollars: nanos,
            latency: Duration::from_millis(3),
            finish_reason: FinishReason::Stop,
            web: None,
        }
    }
}

#[async_trait]
impl ChatGateway for ScriptedGateway {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let caller = req.attribution.caller;
        self.calls.lock().unwrap().push(req);
        match caller {
            "stages::interpret" => Ok(Self::response(&self.interpret_reply, 10, 5, 100)),
            "stages::search" => match &self.search_reply {
                Ok(content) => {
                    let mut resp = Self::response(content, 20, 40, 2_000);
                    resp.web = self.web.clone();
                    Ok(resp)
                }
                Err(msg) => Err(ProviderError::provider("scripted", msg.clone(), true)),
            },
            "stages::style" => Ok(Self::response(&self.style_reply, 30, 70, 30_000)),
            other => panic!("unexpected caller: {other}"),
        }
    }
}

fn request() -> PipelineRequest {
    PipelineRequest {
        user_query: "competitor pricing for Acme Corp".into(),
        agent_type: AgentType::Cir,
        session_config: None,
        context_level: ContextLevel::Elite,
    }
}

fn identity() -> CallerIdentity {
    CallerIdentity::new(Uuid::new_v4(), "token-ok")
}

fn orchestrator(gateway: Arc<ScriptedGateway>) -> PipelineOrchestrator {
    PipelineOrchestrator::new(StageBackends::openrouter_defaults(gateway))
}

fn user_content(req: &ChatRequest) -> String {
    req.messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn deterministic_flow_returns_final_out() {
    let gateway = Arc::new(ScriptedGateway::new("INTERP-OUT", "SEARCH-OUT", "FINAL-OUT"));
    let result = orchestrator(gateway)
        .execute(&identity(), &request(), &PipelineConfig::default())
        .await
        .unwrap();

    assert_eq!(result.final_response, "FINAL-OUT");
    assert_eq!(result.stage_outcomes.len(), 3);
    assert_eq!(result.status, PipelineStatus::Success);
}

#[tokio::test]
async fn stage_order_and_prompt_threading() {
    let gateway = Arc::new(ScriptedGateway::new(
        "OPTIMIZED QUERY: OPT-QUERY-123",
        "SEARCH-OUT",
        "FINAL-OUT",
    ));
    orchestrator(gateway.clone())
        .execute(&identity(), &request(), &PipelineConfig::default())
        .await
        .unwrap();

    let calls = gateway.recorded_calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].attribution.caller, "stages::interpret");
    assert_eq!(calls[1].attribution.caller, "stages::search");
    assert_eq!(calls[2].attribution.caller, "stages::style");

    // Stage 2's prompt carries Stage 1's parsed optimized query.
    assert!(user_content(&calls[1]).contains("OPT-QUERY-123"));
    assert!(calls[1].web_search);

    // Stage 3's prompt carries both prior raw outputs.
    let style_prompt = user_content(&calls[2]);
    assert!(style_prompt.contains("OPTIMIZED QUERY: OPT-QUERY-123"));
    assert!(style_prompt.contains("SEARCH-OUT"));
}

#[tokio::test]
async fn unparseable_interpretation_falls_back_to_raw_query() {
    let gateway = Arc::new(ScriptedGateway::new("INTERP-OUT", "SEARCH-OUT", "FINAL-OUT"));
    let result = orchestrator(gateway.clone())
        .execute(&identity(), &request(), &PipelineConfig::default())
        .await
        .unwrap();

    // Parse miss is non-fatal; the raw query flows into Stage 2.
    assert_eq!(result.status, PipelineStatus::Success);
    let calls = gateway.recorded_calls();
    assert!(user_content(&calls[1]).contains("competitor pricing for Acme Corp"));
}

#[tokio::test]
async fn token_and_cost_conservation() {
    let gateway = Arc::new(
        ScriptedGateway::new("INTERP-OUT", "SEARCH-OUT", "FINAL-OUT")
            .with_web(vec!["https://example.com/report"], 0.8),
    );
    let result = orchestrator(gateway)
        .execute(&identity(), &request(), &PipelineConfig::default())
        .await
        .unwrap();

    let token_sum: u32 = result.stage_outcomes.iter().map(|o| o.tokens_used).sum();
    assert_eq!(result.metadata.total_tokens, token_sum);
    assert_eq!(token_sum, 15 + 60 + 100);

    // 100 + 2_000 + 30_000 nanodollars
    assert_eq!(result.metadata.total_cost, "0.000032");
    assert_eq!(
        result.metadata.web_sources,
        vec!["https://example.com/report"]
    );
    assert!((result.metadata.confidence_score - 0.8).abs() < 1e-9);
}

#[tokio::test]
async fn failed_stage_yields_wellformed_failed_result() {
    let gateway = Arc::new(
        ScriptedGateway::new("INTERP-OUT", "", "FINAL-OUT")
            .with_failing_search("upstream unavailable"),
    );
    let result = orchestrator(gateway.clone())
        .execute(&identity(), &request(), &PipelineConfig::default())
        .await
        .unwrap();

    assert_eq!(result.status, PipelineStatus::Failed);
    assert!(!result.final_response.is_empty());
    assert!(result.final_response.contains("search"));
    assert!(result.final_response.contains("upstream unavailable"));
    assert!(result.final_response.contains("competitor pricing for Acme Corp"));

    // Only the interpret stage executed; telemetry covers exactly that.
    assert_eq!(result.stage_outcomes.len(), 1);
    assert_eq!(result.stage_outcomes[0].stage, StageKind::Interpret);
    assert_eq!(result.metadata.total_tokens, 15);
    assert_eq!(result.metadata.confidence_score, 0.0);

    // Stage 3 never ran.
    assert_eq!(gateway.recorded_calls().len(), 2);
}

#[tokio::test]
async fn empty_token_is_rejected_before_any_stage() {
    let gateway = Arc::new(ScriptedGateway::new("a", "b", "c"));
    let bad_identity = CallerIdentity::new(Uuid::new_v4(), "");
    let err = orchestrator(gateway.clone())
        .execute(&bad_identity, &request(), &PipelineConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::AuthenticationRequired));
    assert!(gateway.recorded_calls().is_empty());
}

#[tokio::test]
async fn empty_query_is_rejected_before_any_stage() {
    let gateway = Arc::new(ScriptedGateway::new("a", "b", "c"));
    let mut req = request();
    req.user_query = "   ".into();
    let err = orchestrator(gateway.clone())
        .execute(&identity(), &req, &PipelineConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::InvalidRequest(_)));
    assert!(gateway.recorded_calls().is_empty());
}

#[tokio::test]
async fn disabled_search_stage_is_skipped_not_reordered() {
    let gateway = Arc::new(ScriptedGateway::new("INTERP-OUT", "SEARCH-OUT", "FINAL-OUT"));
    let config = PipelineConfig {
        search: false,
        ..Default::default()
    };
    let result = orchestrator(gateway.clone())
        .execute(&identity(), &request(), &config)
        .await
        .unwrap();

    assert_eq!(result.stage_outcomes.len(), 2);
    assert_eq!(result.stage_outcomes[0].stage, StageKind::Interpret);
    assert_eq!(result.stage_outcomes[1].stage, StageKind::Style);
    // No web data: neutral confidence.
    assert!((result.metadata.confidence_score - 0.5).abs() < 1e-9);
    assert!(result.metadata.web_sources.is_empty());
}

/// Observer that records every transition it sees.
#[derive(Default)]
struct RecordingObserver {
    transitions: Mutex<Vec<StageTransition>>,
}

#[async_trait]
impl PipelineObserver for RecordingObserver {
    async fn on_transition(&self, transition: StageTransition) {
        self.transitions.lock().unwrap().push(transition);
    }
}

#[tokio::test]
async fn observer_sees_happy_path_transitions() {
    let gateway = Arc::new(ScriptedGateway::new("INTERP-OUT", "SEARCH-OUT", "FINAL-OUT"));
    let observer = Arc::new(RecordingObserver::default());
    let orchestrator = PipelineOrchestrator::new(StageBackends::openrouter_defaults(gateway))
        .with_observer(observer.clone());

    orchestrator
        .execute(&identity(), &request(), &PipelineConfig::default())
        .await
        .unwrap();

    let states: Vec<PipelineState> = observer
        .transitions
        .lock()
        .unwrap()
        .iter()
        .map(|t| t.state)
        .collect();
    assert_eq!(
        states,
        vec![
            PipelineState::Interpreting,
            PipelineState::Searching,
            PipelineState::Styling,
            PipelineState::Complete,
        ]
    );
}

#[tokio::test]
async fn observer_sees_failed_terminal_state_with_detail() {
    let gateway =
        Arc::new(ScriptedGateway::new("INTERP-OUT", "", "FINAL-OUT").with_failing_search("boom"));
    let observer = Arc::new(RecordingObserver::default());
    let orchestrator = PipelineOrchestrator::new(StageBackends::openrouter_defaults(gateway))
        .with_observer(observer.clone());

    orchestrator
        .execute(&identity(), &request(), &PipelineConfig::default())
        .await
        .unwrap();

    let transitions = observer.transitions.lock().unwrap();
    let last = transitions.last().unwrap();
    assert_eq!(last.state, PipelineState::Failed);
    assert!(last.detail.as_deref().unwrap().contains("search"));
}
