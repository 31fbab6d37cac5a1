//! Strategy weight tables and risk/reward parameters.
//!
//! These types are data, not behavior (spec Non-goal ii): the orchestrator
//! reads a [`StrategyConfig`] the way it reads any other configuration, and
//! never computes weights itself.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Per-category weights used to combine individual indicator votes into one
/// aggregate score. Does not need to sum to 1.0 — the orchestrator
/// normalizes by the sum of weights actually exercised by enabled
/// indicators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub trend: f64,
    pub momentum: f64,
    pub volatility: f64,
    pub volume: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            trend: 1.0,
            momentum: 1.0,
            volatility: 0.5,
            volume: 0.5,
        }
    }
}

impl CategoryWeights {
    pub fn get(&self, category: &str) -> f64 {
        match category {
            "trend" => self.trend,
            "momentum" => self.momentum,
            "volatility" => self.volatility,
            "volume" => self.volume,
            _ => 0.0,
        }
    }

    /// Overlays any keys present in `overrides` on top of `self`, leaving
    /// unmentioned categories untouched.
    pub fn merged(mut self, overrides: &HashMap<String, f64>) -> Self {
        if let Some(w) = overrides.get("trend") {
            self.trend = *w;
        }
        if let Some(w) = overrides.get("momentum") {
            self.momentum = *w;
        }
        if let Some(w) = overrides.get("volatility") {
            self.volatility = *w;
        }
        if let Some(w) = overrides.get("volume") {
            self.volume = *w;
        }
        self
    }
}

/// A named, persistable bundle of risk and weighting parameters.
///
/// `strategy_id` keys a small built-in table ([`StrategyTable::lookup`]);
/// a request's `strategy_id` field selects one of these as a base before
/// any per-request overrides are applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub strategy_id: i64,
    pub name: String,
    /// Percent of capital risked per position, `0.5..5`.
    pub risk_percent: f64,
    /// Percent of capital a single position may occupy, `5..50`.
    pub position_size_limit: f64,
    /// Reward multiple of risk for the target price, `1..3`.
    pub risk_reward_ratio: f64,
    pub category_weights: CategoryWeights,
    /// Which indicators the orchestrator evaluates for this strategy.
    pub enabled_indicators: HashMap<String, bool>,
    /// `k` in `stop = entry - k * ATR`.
    pub atr_stop_multiplier: f64,
    /// Fallback stop distance (fraction of entry) when ATR is unavailable.
    pub fallback_stop_pct: f64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        let mut enabled_indicators = HashMap::new();
        for name in [
            "sma_crossover",
            "rsi_threshold",
            "bollinger_band",
            "volume_surge",
        ] {
            enabled_indicators.insert(name.to_string(), true);
        }
        Self {
            strategy_id: 1,
            name: "balanced".to_string(),
            risk_percent: 1.0,
            position_size_limit: 20.0,
            risk_reward_ratio: 2.0,
            category_weights: CategoryWeights::default(),
            enabled_indicators,
            atr_stop_multiplier: 2.0,
            fallback_stop_pct: 0.03,
        }
    }
}

/// Validation bounds from the request schema (spec §4.8).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundsViolation {
    pub field: &'static str,
    pub message: String,
}

impl StrategyConfig {
    /// Validates the bounds the request schema documents. Does not check
    /// `strategy_id` — any positive id is accepted and falls back to the
    /// default table entry at lookup time.
    pub fn validate(&self) -> Vec<BoundsViolation> {
        let mut out = Vec::new();
        if !(0.5..=5.0).contains(&self.risk_percent) {
            out.push(BoundsViolation {
                field: "risk_percent",
                message: "must be between 0.5 and 5".to_string(),
            });
        }
        if !(5.0..=50.0).contains(&self.position_size_limit) {
            out.push(BoundsViolation {
                field: "position_size_limit",
                message: "must be between 5 and 50".to_string(),
            });
        }
        if !(1.0..=3.0).contains(&self.risk_reward_ratio) {
            out.push(BoundsViolation {
                field: "risk_reward_ratio",
                message: "must be between 1 and 3".to_string(),
            });
        }
        out
    }

    /// Applies the subset of request-level overrides that were actually
    /// supplied, leaving everything else at the base value.
    pub fn with_overrides(mut self, overrides: &StrategyOverrides) -> Self {
        if let Some(v) = overrides.risk_percent {
            self.risk_percent = v;
        }
        if let Some(v) = overrides.position_size_limit {
            self.position_size_limit = v;
        }
        if let Some(v) = overrides.risk_reward_ratio {
            self.risk_reward_ratio = v;
        }
        if let Some(ref weights) = overrides.category_weights {
            self.category_weights = self.category_weights.merged(weights);
        }
        if let Some(ref indicators) = overrides.enabled_indicators {
            for (k, v) in indicators {
                self.enabled_indicators.insert(k.clone(), *v);
            }
        }
        self
    }
}

/// The subset of an analysis request that overrides a [`StrategyConfig`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyOverrides {
    pub risk_percent: Option<f64>,
    pub position_size_limit: Option<f64>,
    pub risk_reward_ratio: Option<f64>,
    pub category_weights: Option<HashMap<String, f64>>,
    pub enabled_indicators: Option<HashMap<String, bool>>,
}
