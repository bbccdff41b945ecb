//! Request, result, and configuration types for the tripartite flow.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::gateway::pricing::nanos_to_usd_string;

// =============================================================================
// Request side
// =============================================================================

/// Which specialist agent the caller is addressing.
///
/// The agent identity shapes the Stage 1 interpretation prompt; it does not
/// select providers (that is the orchestrator's `StageBackends`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    Clipogino,
    Cdv,
    Cir,
    Cia,
    ResearchEngine,
    EnhancedContentGenerator,
}

impl AgentType {
    /// Short description injected into stage prompts.
    pub fn focus(&self) -> &'static str {
        match self {
            AgentType::Clipogino => "professional development and career mentoring",
            AgentType::Cdv => "competitive discovery and validation",
            AgentType::Cir => "competitive intelligence retrieval",
            AgentType::Cia => "competitive intelligence analysis",
            AgentType::ResearchEngine => "deep research synthesis",
            AgentType::EnhancedContentGenerator => "high-quality content generation",
        }
    }
}

/// Caller-specified enrichment depth, forwarded to every provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextLevel {
    Basic,
    Enhanced,
    Elite,
}

impl ContextLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContextLevel::Basic => "basic",
            ContextLevel::Enhanced => "enhanced",
            ContextLevel::Elite => "elite",
        }
    }
}

/// Optional business context supplied with a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    #[serde(default)]
    pub analysis_focus: Option<String>,
    #[serde(default)]
    pub objectives: Option<String>,
}

/// One user interaction's worth of input. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRequest {
    /// The raw user query. Must be non-empty.
    pub user_query: String,
    /// Target agent persona.
    pub agent_type: AgentType,
    /// Optional structured business context.
    #[serde(default)]
    pub session_config: Option<SessionConfig>,
    /// Enrichment depth.
    pub context_level: ContextLevel,
}

/// Caller-supplied identity. Authentication itself is an external
/// collaborator; the flow only checks that a token is present before any
/// stage runs.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub user_id: Uuid,
    pub access_token: String,
}

impl CallerIdentity {
    pub fn new(user_id: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
        }
    }

    /// Whether the identity satisfies the precondition for execution.
    pub fn is_authenticated(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Fallback policy applied around the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackMode {
    /// Convert orchestrator errors into degraded-but-valid results.
    Graceful,
    /// Reject any result scoring below the configured threshold.
    Strict,
}

/// Per-execution configuration: stage enable flags and fallback policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Run Stage 1 (query interpretation).
    #[serde(default = "default_true")]
    pub interpret: bool,
    /// Run Stage 2 (web intelligence retrieval).
    #[serde(default = "default_true")]
    pub search: bool,
    /// Run Stage 3 (response synthesis).
    #[serde(default = "default_true")]
    pub style: bool,
    /// Fallback policy.
    #[serde(default = "default_fallback_mode")]
    pub fallback_mode: FallbackMode,
    /// Quality threshold in [0, 1], enforced in strict mode only.
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
}

fn default_true() -> bool {
    true
}

fn default_fallback_mode() -> FallbackMode {
    FallbackMode::Graceful
}

fn default_quality_threshold() -> f64 {
    0.7
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            interpret: true,
            search: true,
            style: true,
            fallback_mode: FallbackMode::Graceful,
            quality_threshold: 0.7,
        }
    }
}

// =============================================================================
// Result side
// =============================================================================

/// The three stages, in their fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Interpret,
    Search,
    Style,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Interpret => "interpret",
            StageKind::Search => "search",
            StageKind::Style => "style",
        }
    }
}

/// Telemetry for one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: StageKind,
    /// Model that backed this stage.
    pub model: String,
    /// Raw provider output text.
    pub output: String,
    /// Tokens consumed (input + output).
    pub tokens_used: u32,
    /// Cost in nanodollars (1e-9 USD).
    pub cost_nanodollars: i64,
    /// Wall-clock latency.
    pub latency_ms: u64,
}

/// Terminal status of one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    Success,
    Partial,
    Failed,
}

/// Aggregated telemetry across the stages that actually executed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    /// Sum of `tokens_used` over executed stages.
    pub total_tokens: u32,
    /// Sum of stage costs, rendered as a decimal USD string.
    pub total_cost: String,
    /// Web source URLs surfaced by Stage 2 (possibly empty).
    pub web_sources: Vec<String>,
    /// Confidence in the findings, clamped to [0, 1].
    pub confidence_score: f64,
    /// End-to-end wall-clock time.
    pub processing_time_ms: u64,
}

/// The single result handed back to the caller. Always well-formed:
/// `final_response` is never empty, even on total failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    pub final_response: String,
    /// One entry per executed stage, in execution order. Length ≤ 3.
    pub stage_outcomes: Vec<StageOutcome>,
    pub metadata: PipelineMetadata,
    pub status: PipelineStatus,
}

impl PipelineResult {
    /// Build metadata from accumulated stage outcomes.
    pub(crate) fn assemble(
        final_response: String,
        stage_outcomes: Vec<StageOutcome>,
        web_sources: Vec<String>,
        confidence_score: f64,
        processing_time_ms: u64,
        status: PipelineStatus,
    ) -> Self {
        let total_tokens = stage_outcomes
            .iter()
            .fold(0u32, |acc, o| acc.saturating_add(o.tokens_used));
        let total_nanos = stage_outcomes
            .iter()
            .fold(0i64, |acc, o| acc.saturating_add(o.cost_nanodollars));

        Self {
            final_response,
            stage_outcomes,
            metadata: PipelineMetadata {
                total_tokens,
                total_cost: nanos_to_usd_string(total_nanos),
                web_sources,
                confidence_score: confidence_score.clamp(0.0, 1.0),
                processing_time_ms,
            },
            status,
        }
    }
}
