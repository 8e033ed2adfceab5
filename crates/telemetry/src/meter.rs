//! Running token and spend totals for one controller.

use crate::pricing::PricingTable;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Snapshot of a meter's totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostStats {
    /// Rounded to 6 decimal places
    pub total_cost_usd: f64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cached_tokens: u64,
    pub total_tokens: u64,
    pub api_calls: u64,
    pub model: String,
}

/// Accumulates usage across calls.
///
/// Totals only ever grow; [`CostMeter::reset`] is the single way back to
/// zero. Clearing a conversation does not touch the meter.
#[derive(Debug)]
pub struct CostMeter {
    pricing: PricingTable,
    model: String,
    total_cost: f64,
    input_tokens: u64,
    output_tokens: u64,
    cached_tokens: u64,
    api_calls: u64,
}

impl CostMeter {
    pub fn new(pricing: PricingTable, model: impl Into<String>) -> Self {
        Self {
            pricing,
            model: model.into(),
            total_cost: 0.0,
            input_tokens: 0,
            output_tokens: 0,
            cached_tokens: 0,
            api_calls: 0,
        }
    }

    /// Record one vendor call and return its cost.
    pub fn record(
        &mut self,
        prompt_tokens: u64,
        completion_tokens: u64,
        cached_tokens: u64,
        model: &str,
    ) -> f64 {
        let cost = self
            .pricing
            .compute_cost(model, prompt_tokens, completion_tokens, cached_tokens);

        self.total_cost += cost;
        self.input_tokens += prompt_tokens;
        self.output_tokens += completion_tokens;
        self.cached_tokens += cached_tokens;
        self.api_calls += 1;

        info!(
            model,
            prompt_tokens,
            completion_tokens,
            cached_tokens,
            cost_usd = cost,
            total_cost_usd = self.total_cost,
            "API call cost"
        );
        cost
    }

    pub fn stats(&self) -> CostStats {
        CostStats {
            total_cost_usd: (self.total_cost * 1e6).round() / 1e6,
            total_input_tokens: self.input_tokens,
            total_output_tokens: self.output_tokens,
            total_cached_tokens: self.cached_tokens,
            total_tokens: self.input_tokens + self.output_tokens,
            api_calls: self.api_calls,
            model: self.model.clone(),
        }
    }

    /// Zero every counter.
    pub fn reset(&mut self) {
        tracing::debug!("Resetting cost tracking");
        self.total_cost = 0.0;
        self.input_tokens = 0;
        self.output_tokens = 0;
        self.cached_tokens = 0;
        self.api_calls = 0;
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }
}
