//! Versioned pricing table for vendor models.
//!
//! Prices are in USD per 1 million tokens. Lookup is an explicit three-tier
//! function: exact name, then longest prefix/substring key, then a fixed
//! fallback model. Custom entries can be layered on at startup from config.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock};
use tracing::warn;

/// Version tag of the built-in table.
pub const DEFAULT_PRICING_VERSION: &str = "2026-01";

/// Model whose prices apply when nothing else matches.
pub const FALLBACK_MODEL: &str = "gpt-4.1";

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input: f64,
    /// Price per 1M cached input tokens, when the vendor discounts them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_input: Option<f64>,
    /// Price per 1M output tokens. Unbilled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<f64>,
}

impl ModelPricing {
    pub const fn new(input: f64, cached_input: Option<f64>, output: Option<f64>) -> Self {
        Self {
            input,
            cached_input,
            output,
        }
    }

    /// Compute cost for one call.
    ///
    /// Cached tokens are a subset of prompt tokens. They use the cached rate
    /// when one exists; the remainder uses the input rate.
    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64, cached_tokens: u64) -> f64 {
        let cached = cached_tokens.min(prompt_tokens);
        let input_cost = match self.cached_input {
            Some(cached_rate) if cached > 0 => {
                cached as f64 * cached_rate + (prompt_tokens - cached) as f64 * self.input
            }
            _ => prompt_tokens as f64 * self.input,
        };
        let output_cost = completion_tokens as f64 * self.output.unwrap_or(0.0);
        (input_cost + output_cost) / 1_000_000.0
    }
}

/// Which tier of the lookup produced a price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "tier", content = "key", rename_all = "snake_case")]
pub enum PriceMatch {
    Exact(String),
    Prefix(String),
    Fallback(String),
}

/// Thread-safe pricing table with built-in defaults and custom overrides.
pub struct PricingTable {
    version: String,
    prices: RwLock<HashMap<String, ModelPricing>>,
    warned: Mutex<HashSet<String>>,
}

impl PricingTable {
    /// Create a pricing table with built-in model prices.
    pub fn with_defaults() -> Self {
        let table = Self::empty(DEFAULT_PRICING_VERSION);
        {
            let mut prices = table.prices.write().unwrap_or_else(PoisonError::into_inner);
            for (name, pricing) in DEFAULT_PRICES {
                prices.insert((*name).to_string(), *pricing);
            }
        }
        table
    }

    /// Create an empty pricing table.
    pub fn empty(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            prices: RwLock::new(HashMap::new()),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Built-in prices with custom entries layered on top.
    pub fn with_overrides(
        version: Option<String>,
        overrides: impl IntoIterator<Item = (String, ModelPricing)>,
    ) -> Self {
        let mut table = Self::with_defaults();
        if let Some(version) = version {
            table.version = version;
        }
        for (model, pricing) in overrides {
            table.set(model, pricing);
        }
        table
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Exact-key lookup. Returns None if not found.
    pub fn get(&self, model: &str) -> Option<ModelPricing> {
        self.read().get(&model.to_lowercase()).copied()
    }

    /// Add or update pricing for a model.
    pub fn set(&self, model: impl Into<String>, pricing: ModelPricing) {
        let mut prices = self.prices.write().unwrap_or_else(PoisonError::into_inner);
        prices.insert(model.into().to_lowercase(), pricing);
    }

    /// Resolve pricing for a model name.
    ///
    /// 1. exact (case-insensitive) key
    /// 2. the longest key the name starts with or contains
    ///    (`gpt-4o-mini-2024-07-18` → `gpt-4o-mini`)
    /// 3. [`FALLBACK_MODEL`], with a warning logged once per model name
    pub fn lookup(&self, model: &str) -> (PriceMatch, ModelPricing) {
        let model_lower = model.to_lowercase();
        let prices = self.read();

        if let Some(p) = prices.get(&model_lower) {
            return (PriceMatch::Exact(model_lower), *p);
        }

        let best = prices
            .iter()
            .filter(|(key, _)| model_lower.starts_with(key.as_str()) || model_lower.contains(key.as_str()))
            .max_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| b.cmp(a)));
        if let Some((key, p)) = best {
            return (PriceMatch::Prefix(key.clone()), *p);
        }

        let fallback = prices
            .get(FALLBACK_MODEL)
            .copied()
            .unwrap_or(FALLBACK_PRICING);
        drop(prices);

        let first_time = self
            .warned
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(model_lower);
        if first_time {
            warn!(model, fallback = FALLBACK_MODEL, "Unknown model pricing, using fallback");
        }
        (PriceMatch::Fallback(FALLBACK_MODEL.to_string()), fallback)
    }

    /// Compute cost for a model call.
    pub fn compute_cost(
        &self,
        model: &str,
        prompt_tokens: u64,
        completion_tokens: u64,
        cached_tokens: u64,
    ) -> f64 {
        let (_, pricing) = self.lookup(model);
        pricing.cost(prompt_tokens, completion_tokens, cached_tokens)
    }

    /// List all known model names.
    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of models in the pricing table.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, ModelPricing>> {
        self.prices.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for PricingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricingTable")
            .field("version", &self.version)
            .field("models", &self.len())
            .finish()
    }
}

const FALLBACK_PRICING: ModelPricing = ModelPricing::new(3.0, Some(0.75), Some(12.0));

const DEFAULT_PRICES: &[(&str, ModelPricing)] = &[
    // ── OpenAI ─────────────────────────────────────────────────
    ("gpt-5.2", ModelPricing::new(1.75, Some(0.175), Some(14.0))),
    ("gpt-5.2-pro", ModelPricing::new(21.0, None, Some(168.0))),
    ("gpt-5-mini", ModelPricing::new(0.25, Some(0.025), Some(2.0))),
    ("gpt-4.1", ModelPricing::new(3.0, Some(0.75), Some(12.0))),
    ("gpt-4.1-mini", ModelPricing::new(0.8, Some(0.2), Some(3.2))),
    ("gpt-4.1-nano", ModelPricing::new(0.2, Some(0.05), Some(0.8))),
    ("o4-mini", ModelPricing::new(4.0, Some(1.0), Some(16.0))),
    ("gpt-realtime", ModelPricing::new(4.0, Some(0.4), Some(16.0))),
    ("gpt-realtime-mini", ModelPricing::new(0.6, Some(0.06), Some(2.4))),
    ("gpt-image-1.5", ModelPricing::new(5.0, Some(1.25), Some(10.0))),
    ("gpt-image-1", ModelPricing::new(5.0, Some(1.25), None)),
    ("gpt-image-1-mini", ModelPricing::new(2.0, Some(0.2), None)),
    ("gpt-4o", ModelPricing::new(2.5, Some(0.25), Some(10.0))),
    ("gpt-4o-mini", ModelPricing::new(0.15, Some(0.015), Some(0.6))),
    ("gpt-4-turbo", ModelPricing::new(10.0, Some(1.0), Some(30.0))),
    ("gpt-3.5-turbo", ModelPricing::new(0.5, Some(0.25), Some(1.5))),
    // ── Anthropic ──────────────────────────────────────────────
    ("claude-sonnet-4", ModelPricing::new(3.0, Some(0.3), Some(15.0))),
    ("claude-opus-4", ModelPricing::new(15.0, Some(1.5), Some(75.0))),
    ("claude-haiku-4", ModelPricing::new(1.0, Some(0.1), Some(5.0))),
    ("claude-3-5-haiku", ModelPricing::new(0.8, Some(0.08), Some(4.0))),
    // ── Google ─────────────────────────────────────────────────
    ("gemini-2.5-pro", ModelPricing::new(1.25, Some(0.31), Some(10.0))),
    ("gemini-2.5-flash", ModelPricing::new(0.3, Some(0.075), Some(2.5))),
    ("gemini-2.0-flash", ModelPricing::new(0.1, Some(0.025), Some(0.4))),
];
