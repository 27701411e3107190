//! Model catalogue and per-token pricing.
//!
//! Prices are fixed at process start; there is no live repricing.

use std::collections::HashMap;

/// Tokens charged when an invocation does not specify `maxTokens`.
pub const DEFAULT_MAX_TOKENS: i64 = 50;

/// Price applied to models missing from the table.
pub const DEFAULT_CREDITS_PER_TOKEN: i64 = 1;

pub const CLAUDE_3_HAIKU: &str = "anthropic.claude-3-haiku-20240307-v1:0";
pub const LLAMA3_70B_INSTRUCT: &str = "meta.llama3-70b-instruct-v1:0";

/// Models a user may deploy.
pub const SUPPORTED_MODELS: [&str; 2] = [CLAUDE_3_HAIKU, LLAMA3_70B_INSTRUCT];

/// Regions advertised by the deployment options endpoint.
pub const SUPPORTED_REGIONS: [&str; 2] = ["ap-south-1", "us-west-1"];

pub fn is_supported_model(model_name: &str) -> bool {
    SUPPORTED_MODELS.contains(&model_name)
}

/// Static mapping from model identifier to credits charged per token.
#[derive(Debug, Clone)]
pub struct PricingTable {
    credits_per_token: HashMap<String, i64>,
}

impl PricingTable {
    pub fn new(entries: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self {
            credits_per_token: entries.into_iter().collect(),
        }
    }

    /// Credits per token for `model_id`, 1 when the model is not listed.
    pub fn cost_per_token(&self, model_id: &str) -> i64 {
        self.credits_per_token
            .get(model_id)
            .copied()
            .unwrap_or(DEFAULT_CREDITS_PER_TOKEN)
    }

    /// Total price of an invocation.
    ///
    /// Saturates instead of overflowing; a saturated price exceeds every balance and is
    /// rejected by the admission check.
    pub fn total_cost(&self, model_id: &str, max_tokens: Option<i64>) -> i64 {
        let tokens = max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        tokens.saturating_mul(self.cost_per_token(model_id))
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::new([
            (CLAUDE_3_HAIKU.to_string(), 2),
            (LLAMA3_70B_INSTRUCT.to_string(), 1),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_model_prices() {
        let pricing = PricingTable::default();
        assert_eq!(pricing.cost_per_token(CLAUDE_3_HAIKU), 2);
        assert_eq!(pricing.cost_per_token(LLAMA3_70B_INSTRUCT), 1);
    }

    #[test]
    fn test_unknown_model_defaults_to_one() {
        let pricing = PricingTable::default();
        assert_eq!(pricing.cost_per_token("mistral.mistral-large-2402-v1:0"), 1);
        assert_eq!(pricing.total_cost("mistral.mistral-large-2402-v1:0", Some(30)), 30);
    }

    #[test]
    fn test_default_token_count() {
        let pricing = PricingTable::default();
        assert_eq!(pricing.total_cost(CLAUDE_3_HAIKU, None), 100);
        assert_eq!(pricing.total_cost(LLAMA3_70B_INSTRUCT, None), 50);
    }

    #[test]
    fn test_total_cost_saturates() {
        let pricing = PricingTable::default();
        assert_eq!(pricing.total_cost(CLAUDE_3_HAIKU, Some(i64::MAX)), i64::MAX);
    }

    #[test]
    fn test_supported_models() {
        assert!(is_supported_model(LLAMA3_70B_INSTRUCT));
        assert!(!is_supported_model("gpt-4"));
    }
}
