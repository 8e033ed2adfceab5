//! Cost tracking for BenchPilot controllers.
//!
//! A versioned model pricing table with an explicit three-tier lookup, and a
//! per-controller meter that accumulates tokens and spend across calls.

pub mod meter;
pub mod pricing;

pub use meter::{CostMeter, CostStats};
pub use pricing::{ModelPricing, PriceMatch, PricingTable};
