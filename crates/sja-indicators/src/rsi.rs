use sja_schemas::{IndicatorVote, OhlcvBar};

use crate::{Category, Indicator, IndicatorFault};

/// Classic Wilder RSI over `period` bars, voted against fixed
/// overbought/oversold thresholds.
pub struct RsiThreshold {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiThreshold {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl Indicator for RsiThreshold {
    fn name(&self) -> &'static str {
        "rsi_threshold"
    }

    fn category(&self) -> Category {
        Category::Momentum
    }

    fn evaluate(&self, bars: &[OhlcvBar]) -> Result<IndicatorVote, IndicatorFault> {
        if bars.len() < self.period + 1 {
            return Err(IndicatorFault::InsufficientData {
                required: self.period + 1,
                available: bars.len(),
            });
        }
        let rsi = compute_rsi(bars, self.period);

        let (vote, confidence) = if rsi < self.oversold {
            (1, ((self.oversold - rsi) / self.oversold).min(1.0))
        } else if rsi > self.overbought {
            (-1, ((rsi - self.overbought) / (100.0 - self.overbought)).min(1.0))
        } else {
            (0, (50.0 - (rsi - 50.0).abs()) / 50.0 * 0.2)
        };

        Ok(IndicatorVote {
            name: self.name().to_string(),
            category: self.category().as_str().to_string(),
            vote,
            confidence,
        })
    }
}

fn compute_rsi(bars: &[OhlcvBar], period: usize) -> f64 {
    let tail = &bars[bars.len() - period - 1..];
    let mut gain_sum = 0.0;
    let mut loss_sum = 0.0;
    for window in tail.windows(2) {
        let delta = window[1].close - window[0].close;
        if delta >= 0.0 {
            gain_sum += delta;
        } else {
            loss_sum -= delta;
        }
    }
    let avg_gain = gain_sum / period as f64;
    let avg_loss = loss_sum / period as f64;
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars;

    #[test]
    fn insufficient_data_is_a_fault() {
        let indicator = RsiThreshold::default();
        let result = indicator.evaluate(&bars(&[1.0, 2.0, 3.0]));
        assert!(matches!(result, Err(IndicatorFault::InsufficientData { .. })));
    }

    #[test]
    fn monotonic_gains_push_rsi_toward_overbought() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let indicator = RsiThreshold::default();
        let vote = indicator.evaluate(&bars(&closes)).unwrap();
        assert_eq!(vote.vote, -1);
    }

    #[test]
    fn monotonic_losses_push_rsi_toward_oversold() {
        let closes: Vec<f64> = (0..20).map(|i| 200.0 - i as f64).collect();
        let indicator = RsiThreshold::default();
        let vote = indicator.evaluate(&bars(&closes)).unwrap();
        assert_eq!(vote.vote, 1);
    }
}
