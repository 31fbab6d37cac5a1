use sja_schemas::{IndicatorVote, OhlcvBar};

use crate::{Category, Indicator, IndicatorFault};

/// Fast/slow simple-moving-average crossover. A dead-band around zero
/// separation avoids flip-flopping on noise.
pub struct SmaCrossover {
    pub fast_period: usize,
    pub slow_period: usize,
}

impl Default for SmaCrossover {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
        }
    }
}

impl Indicator for SmaCrossover {
    fn name(&self) -> &'static str {
        "sma_crossover"
    }

    fn category(&self) -> Category {
        Category::Trend
    }

    fn evaluate(&self, bars: &[OhlcvBar]) -> Result<IndicatorVote, IndicatorFault> {
        if bars.len() < self.slow_period {
            return Err(IndicatorFault::InsufficientData {
                required: self.slow_period,
                available: bars.len(),
            });
        }
        let fast = sma(bars, self.fast_period);
        let slow = sma(bars, self.slow_period);
        let separation = (fast - slow) / slow;

        let dead_band = 0.001;
        let (vote, confidence) = if separation > dead_band {
            (1, (separation * 20.0).min(1.0))
        } else if separation < -dead_band {
            (-1, (-separation * 20.0).min(1.0))
        } else {
            (0, 0.0)
        };

        Ok(IndicatorVote {
            name: self.name().to_string(),
            category: self.category().as_str().to_string(),
            vote,
            confidence,
        })
    }
}

fn sma(bars: &[OhlcvBar], period: usize) -> f64 {
    let tail = &bars[bars.len() - period..];
    tail.iter().map(|b| b.close).sum::<f64>() / period as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars;

    #[test]
    fn insufficient_data_is_a_fault() {
        let indicator = SmaCrossover::default();
        let result = indicator.evaluate(&bars(&[1.0, 2.0]));
        assert!(matches!(result, Err(IndicatorFault::InsufficientData { .. })));
    }

    #[test]
    fn uptrend_votes_positive() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64).collect();
        let indicator = SmaCrossover::default();
        let vote = indicator.evaluate(&bars(&closes)).unwrap();
        assert_eq!(vote.vote, 1);
        assert!(vote.confidence > 0.0);
    }

    #[test]
    fn downtrend_votes_negative() {
        let closes: Vec<f64> = (0..60).map(|i| 200.0 - i as f64).collect();
        let indicator = SmaCrossover::default();
        let vote = indicator.evaluate(&bars(&closes)).unwrap();
        assert_eq!(vote.vote, -1);
    }

    #[test]
    fn flat_series_votes_neutral() {
        let closes = vec![100.0; 60];
        let indicator = SmaCrossover::default();
        let vote = indicator.evaluate(&bars(&closes)).unwrap();
        assert_eq!(vote.vote, 0);
    }
}
