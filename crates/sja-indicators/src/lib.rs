//! Technical-indicator boundary.
//!
//! Each [`Indicator`] is a pure function over an OHLCV window producing a
//! vote and confidence. These four are deliberately simplified reference
//! implementations, not a production signal-processing library — the
//! orchestrator that consumes them does not care how a vote was derived.

use sja_schemas::{IndicatorVote, OhlcvBar};

pub mod atr;
pub mod bollinger;
pub mod rsi;
pub mod sma_crossover;
pub mod volume_surge;

/// A category used for weighted aggregation in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Trend,
    Momentum,
    Volatility,
    Volume,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Trend => "trend",
            Category::Momentum => "momentum",
            Category::Volatility => "volatility",
            Category::Volume => "volume",
        }
    }
}

/// Fault a single indicator can raise against one OHLCV window. Never
/// fatal to the job — the orchestrator turns this into a per-ticker
/// `errors` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorFault {
    InsufficientData { required: usize, available: usize },
}

impl std::fmt::Display for IndicatorFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndicatorFault::InsufficientData { required, available } => write!(
                f,
                "insufficient data: need at least {required} bars, have {available}"
            ),
        }
    }
}

/// A pure `(OHLCV, params) -> {vote, confidence, category}` evaluator.
pub trait Indicator: Send + Sync {
    fn name(&self) -> &'static str;
    fn category(&self) -> Category;
    fn evaluate(&self, bars: &[OhlcvBar]) -> Result<IndicatorVote, IndicatorFault>;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use chrono::Utc;

    pub fn bars(closes: &[f64]) -> Vec<OhlcvBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                ts_utc: Utc::now() - chrono::Duration::days((closes.len() - i) as i64),
                open: close,
                high: close * 1.01,
                low: close * 0.99,
                close,
                volume: 1_000_000.0,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_as_str_matches_weight_table_keys() {
        assert_eq!(Category::Trend.as_str(), "trend");
        assert_eq!(Category::Momentum.as_str(), "momentum");
        assert_eq!(Category::Volatility.as_str(), "volatility");
        assert_eq!(Category::Volume.as_str(), "volume");
    }
}
