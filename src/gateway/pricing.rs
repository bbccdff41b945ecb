//! Model pricing registry.
//!
//! Centralized pricing data for the models the flow dispatches to.
//! Costs are in nanodollars (1e-9 USD) per token.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Pricing information for a model.
#[derive(Debug, Clone, Copy)]
pub struct ModelPricing {
    /// Provider name.
    pub provider: &'static str,
    /// Cost per input token in nanodollars.
    pub input_nanos_per_token: i64,
    /// Cost per output token in nanodollars.
    pub output_nanos_per_token: i64,
}

impl ModelPricing {
    const fn new(provider: &'static str, input: i64, output: i64) -> Self {
        Self {
            provider,
            input_nanos_per_token: input,
            output_nanos_per_token: output,
        }
    }

    /// Calculate cost for a request.
    pub fn calculate_cost(&self, input_tokens: u32, output_tokens: u32) -> i64 {
        (input_tokens as i64) * self.input_nanos_per_token
            + (output_tokens as i64) * self.output_nanos_per_token
    }
}

// =============================================================================
// PRICING DATA
// =============================================================================

// OpenRouter pricing (verify periodically against OpenRouter model pages)
// GPT-4o-mini: $0.15/1M input, $0.60/1M output
// GPT-5-mini: $0.25/1M input, $2.00/1M output
// Claude 3.5 Sonnet: $3.00/1M input, $15.00/1M output
// Claude Sonnet 4.5: $3.00/1M input, $15.00/1M output
// Perplexity Sonar: $1.00/1M input, $1.00/1M output
// Perplexity Sonar Pro: $3.00/1M input, $15.00/1M output

const GPT_4O_MINI: ModelPricing = ModelPricing::new("openrouter", 150, 600);
const GPT_5_MINI: ModelPricing = ModelPricing::new("openrouter", 250, 2_000);
const CLAUDE_35_SONNET: ModelPricing = ModelPricing::new("openrouter", 3_000, 15_000);
const CLAUDE_SONNET_45: ModelPricing = ModelPricing::new("openrouter", 3_000, 15_000);
const SONAR: ModelPricing = ModelPricing::new("openrouter", 1_000, 1_000);
const SONAR_PRO: ModelPricing = ModelPricing::new("openrouter", 3_000, 15_000);

static PRICING_MAP: OnceLock<HashMap<&'static str, ModelPricing>> = OnceLock::new();

fn init_pricing() -> HashMap<&'static str, ModelPricing> {
    let mut map = HashMap::new();

    map.insert("openai/gpt-4o-mini", GPT_4O_MINI);
    map.insert("openai/gpt-4o-mini-2024-07-18", GPT_4O_MINI);
    map.insert("openai/gpt-5-mini", GPT_5_MINI);
    map.insert("anthropic/claude-3-5-sonnet", CLAUDE_35_SONNET);
    map.insert("anthropic/claude-sonnet-4-5", CLAUDE_SONNET_45);
    map.insert("perplexity/sonar", SONAR);
    map.insert("perplexity/sonar-pro", SONAR_PRO);

    map
}

/// Get pricing for a model.
pub fn get_pricing(model_id: &str) -> Option<ModelPricing> {
    let map = PRICING_MAP.get_or_init(init_pricing);
    map.get(model_id).copied()
}

/// Get pricing for a model, falling back to a default.
pub fn get_pricing_or_default(model_id: &str, default: ModelPricing) -> ModelPricing {
    get_pricing(model_id).unwrap_or(default)
}

/// Calculate chat cost.
pub fn chat_cost(model: &str, input_tokens: u32, output_tokens: u32) -> i64 {
    // Default to a mid-range model if unknown
    let default = ModelPricing::new("unknown", 1_000, 5_000);
    let pricing = get_pricing(model).unwrap_or(default);
    pricing.calculate_cost(input_tokens, output_tokens)
}

/// Render a nanodollar amount as a decimal USD string, e.g. "0.004800".
///
/// The outer result contract reports cost as a decimal string; everything
/// internal stays in integer nanodollars.
pub fn nanos_to_usd_string(nanodollars: i64) -> String {
    format!("{:.6}", nanodollars as f64 / 1_000_000_000.0)
}
