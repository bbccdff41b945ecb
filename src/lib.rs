#![forbid(unsafe_code)]

//! # tripartite
//!
//! A three-stage AI research flow: one user query becomes one synthesized,
//! telemetry-annotated answer via three dependent provider calls —
//! **interpret** (structure the query into a search brief), **search**
//! (web-augmented retrieval), and **style** (synthesis into a final
//! response). An orchestrator sequences the stages and accumulates
//! token/cost/latency; a fallback controller applies a graceful-or-strict
//! quality policy over a deterministic [0,1] quality score.
//!
//! Rendering, persistence, and authentication live outside this crate: the
//! core consumes a generic [`gateway::ChatGateway`] capability and hands
//! back a typed [`types::PipelineResult`].

pub mod error;
pub mod fallback;
pub mod gateway;
pub mod orchestrator;
pub mod progress;
pub mod quality;
pub mod stages;
pub mod types;

pub use error::PipelineError;
pub use fallback::{FallbackController, GuardedResult};
pub use gateway::{Attribution, ChatGateway, ProviderGateway, UsageSink};
pub use orchestrator::{PipelineOrchestrator, StageBackends};
pub use progress::{NoopObserver, PipelineObserver, PipelineState, StageTransition, StderrObserver};
pub use types::{
    AgentType, CallerIdentity, ContextLevel, FallbackMode, PipelineConfig, PipelineRequest,
    PipelineResult, PipelineStatus, SessionConfig, StageKind, StageOutcome,
};
