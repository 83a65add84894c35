// src/services/pricing.rs
//! Cost estimation for completion token usage.
//!
//! Estimates only; the provider's invoice is the source of truth.

use crate::services::openai::Usage;

pub trait PricingStrategy: Send + Sync {
    /// Estimated cost in USD for one call.
    fn estimate(&self, usage: &Usage) -> f64;
}

/// Splits the total token count into a fixed input/output share and prices each
/// side at its own per-1K rate.
#[derive(Debug, Clone)]
pub struct FlatSplitPricing {
    pub input_share: f64,
    pub input_per_1k: f64,
    pub output_per_1k: f64,
}

impl Default for FlatSplitPricing {
    fn default() -> Self {
        Self {
            input_share: 0.7,
            input_per_1k: 0.00015,
            output_per_1k: 0.0006,
        }
    }
}

impl PricingStrategy for FlatSplitPricing {
    fn estimate(&self, usage: &Usage) -> f64 {
        let total = f64::from(usage.total_tokens);
        let input_tokens = total * self.input_share;
        let output_tokens = total * (1.0 - self.input_share);

        let cost = (input_tokens / 1000.0) * self.input_per_1k
            + (output_tokens / 1000.0) * self.output_per_1k;

        round_to(cost, 4)
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
