//! Strategy weight tables and risk/reward parameters, consumed as
//! configuration by `sja-orchestrator` (spec §4.5, Non-goal ii).

mod types;

pub use types::{BoundsViolation, CategoryWeights, StrategyConfig, StrategyOverrides};

/// A small built-in table of named strategies, keyed by `strategy_id`.
/// Unknown ids fall back to the balanced default (id `1`) rather than
/// failing the request — the weight table is data the orchestrator
/// consumes, not a source of validation errors.
pub struct StrategyTable {
    entries: Vec<StrategyConfig>,
}

impl Default for StrategyTable {
    fn default() -> Self {
        let balanced = StrategyConfig::default();

        let mut aggressive = StrategyConfig {
            strategy_id: 2,
            name: "aggressive".to_string(),
            risk_percent: 3.0,
            position_size_limit: 35.0,
            risk_reward_ratio: 2.5,
            ..balanced.clone()
        };
        aggressive.category_weights = CategoryWeights {
            trend: 1.5,
            momentum: 1.5,
            volatility: 0.3,
            volume: 0.7,
        };

        let mut conservative = StrategyConfig {
            strategy_id: 3,
            name: "conservative".to_string(),
            risk_percent: 0.5,
            position_size_limit: 10.0,
            risk_reward_ratio: 1.5,
            ..balanced.clone()
        };
        conservative.category_weights = CategoryWeights {
            trend: 1.0,
            momentum: 0.5,
            volatility: 1.0,
            volume: 0.3,
        };

        Self {
            entries: vec![balanced, aggressive, conservative],
        }
    }
}

impl StrategyTable {
    pub fn lookup(&self, strategy_id: Option<i64>) -> StrategyConfig {
        let id = strategy_id.unwrap_or(1);
        self.entries
            .iter()
            .find(|c| c.strategy_id == id)
            .cloned()
            .unwrap_or_else(StrategyConfig::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_strategy_id_falls_back_to_balanced() {
        let table = StrategyTable::default();
        let cfg = table.lookup(Some(999));
        assert_eq!(cfg.name, "balanced");
    }

    #[test]
    fn known_strategy_id_resolves_named_entry() {
        let table = StrategyTable::default();
        let cfg = table.lookup(Some(2));
        assert_eq!(cfg.name, "aggressive");
    }

    #[test]
    fn missing_strategy_id_defaults_to_balanced() {
        let table = StrategyTable::default();
        let cfg = table.lookup(None);
        assert_eq!(cfg.strategy_id, 1);
    }
}
