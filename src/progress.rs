//! Pipeline state machine and progress observation.
//!
//! The orchestrator drives an explicit enumerated state machine:
//! idle → interpreting → searching → styling → complete on the happy path,
//! any stage error → failed. Complete and failed are terminal; a new
//! execution always starts at idle. Transitions are surfaced to callers
//! through the [`PipelineObserver`] trait for progress display; the
//! orchestrator never reads them back for decisions.

use crate::types::StageKind;

/// Execution state of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Interpreting,
    Searching,
    Styling,
    Complete,
    Failed,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Interpreting => "interpreting",
            PipelineState::Searching => "searching",
            PipelineState::Styling => "styling",
            PipelineState::Complete => "complete",
            PipelineState::Failed => "failed",
        }
    }

    /// Whether this state ends the execution.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Complete | PipelineState::Failed)
    }

    /// Whether `next` is a legal successor of this state.
    ///
    /// Stage states may be skipped (a disabled stage) but never reordered,
    /// and any non-terminal state may fail.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        match self {
            Idle => matches!(next, Interpreting | Searching | Styling | Complete),
            Interpreting => matches!(next, Searching | Styling | Complete),
            Searching => matches!(next, Styling | Complete),
            Styling => matches!(next, Complete),
            Complete | Failed => false,
        }
    }

    /// The state entered when the given stage starts.
    pub fn for_stage(stage: StageKind) -> Self {
        match stage {
            StageKind::Interpret => PipelineState::Interpreting,
            StageKind::Search => PipelineState::Searching,
            StageKind::Style => PipelineState::Styling,
        }
    }
}

/// A single observed transition.
#[derive(Debug, Clone)]
pub struct StageTransition {
    pub state: PipelineState,
    /// Human-readable detail, e.g. the failing stage and error on `Failed`.
    pub detail: Option<String>,
}

impl StageTransition {
    pub fn entered(state: PipelineState) -> Self {
        Self {
            state,
            detail: None,
        }
    }

    pub fn with_detail(state: PipelineState, detail: impl Into<String>) -> Self {
        Self {
            state,
            detail: Some(detail.into()),
        }
    }
}

/// Callers implement this to drive progress display or notifications.
///
/// Observer failures must not affect the execution; implementations should
/// swallow their own errors.
#[async_trait::async_trait]
pub trait PipelineObserver: Send + Sync {
    async fn on_transition(&self, transition: StageTransition);
}

/// Observer that discards all transitions.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait::async_trait]
impl PipelineObserver for NoopObserver {
    async fn on_transition(&self, _transition: StageTransition) {}
}

/// Observer that prints coarse progress to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrObserver;

#[async_trait::async_trait]
impl PipelineObserver for StderrObserver {
    async fn on_transition(&self, transition: StageTransition) {
        match transition.detail {
            Some(detail) => eprintln!("[flow] {} — {}", transition.state.as_str(), detail),
            None => eprintln!("[flow] {}", transition.state.as_str()),
        }
    }
}
