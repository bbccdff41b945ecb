//! Provider gateway for OpenRouter chat completions.

pub mod error;
pub mod openrouter;
pub mod pricing;
pub mod types;
pub mod usage;

use std::sync::Arc;

use openrouter::{ChatProvider, OpenRouterAdapter};
use usage::{CallStatus, ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use error::{ErrorContext, ProviderError};
pub use pricing::*;
pub use types::*;
pub use usage::{NoopUsageSink, StderrUsageSink, UsageSink};

/// The "invoke an AI provider" capability the flow consumes.
///
/// Stage handlers and the orchestrator only see this trait; tests inject
/// scripted in-process implementations.
#[async_trait::async_trait]
pub trait ChatGateway: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Production gateway: an OpenRouter adapter plus a usage sink.
///
/// There is no retry loop here. A failed call surfaces to the stage, which
/// terminates the execution; retrying means a fresh `execute` by the caller.
pub struct ProviderGateway<U: UsageSinkTrait> {
    openrouter: OpenRouterAdapter,
    usage_sink: Arc<U>,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> ChatGateway for ProviderGateway<U> {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        ProviderGateway::chat(self, req).await
    }
}

impl<U: UsageSinkTrait> ProviderGateway<U> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, ProviderError> {
        let openrouter = OpenRouterAdapter::from_env()?;
        Ok(Self {
            openrouter,
            usage_sink,
        })
    }

    pub fn with_adapter(openrouter: OpenRouterAdapter, usage_sink: Arc<U>) -> Self {
        Self {
            openrouter,
            usage_sink,
        }
    }

    pub async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        match self.openrouter.chat(&req).await {
            Ok(resp) => {
                self.record_usage(&req, &resp, CallStatus::Success, None)
                    .await;
                Ok(resp)
            }
            Err(err) => {
                let code = err.code().to_string();
                self.record_usage(&req, &ChatResponse::empty(), CallStatus::Error, Some(code))
                    .await;
                Err(err)
            }
        }
    }

    async fn record_usage(
        &self,
        req: &ChatRequest,
        resp: &ChatResponse,
        status: CallStatus,
        error_code: Option<String>,
    ) {
        let record = ProviderCallRecord::new(
            req.model.provider(),
            "chat/completions",
            req.model.model_id(),
            req.attribution.caller,
        )
        .tokens(resp.input_tokens as i32, resp.output_tokens as i32)
        .cost(resp.cost_nanodollars)
        .user(req.attribution.user_id)
        .execution(req.attribution.execution_id)
        .latency(resp.latency.as_millis() as i32);

        let record = if status == CallStatus::Error {
            record.error(error_code.unwrap_or_else(|| "provider_error".to_string()))
        } else {
            record
        };

        self.usage_sink.record(record).await;
    }
}

impl ChatResponse {
    fn empty() -> Self {
        Self {
            content: String::new(),
            input_tokens: 0,
            output_tokens: 0,
            cost_nanodollars: 0,
            latency: std::time::Duration::from_millis(0),
            finish_reason: FinishReason::Unknown("error".to_string()),
            web: None,
        }
    }
}
