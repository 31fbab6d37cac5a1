use sja_schemas::{IndicatorVote, OhlcvBar};

use crate::{Category, Indicator, IndicatorFault};

/// Position of the last close within a `period`-bar Bollinger band at
/// `std_devs` standard deviations.
pub struct BollingerBandPosition {
    pub period: usize,
    pub std_devs: f64,
}

impl Default for BollingerBandPosition {
    fn default() -> Self {
        Self {
            period: 20,
            std_devs: 2.0,
        }
    }
}

impl Indicator for BollingerBandPosition {
    fn name(&self) -> &'static str {
        "bollinger_band_position"
    }

    fn category(&self) -> Category {
        Category::Volatility
    }

    fn evaluate(&self, bars: &[OhlcvBar]) -> Result<IndicatorVote, IndicatorFault> {
        if bars.len() < self.period {
            return Err(IndicatorFault::InsufficientData {
                required: self.period,
                available: bars.len(),
            });
        }
        let tail = &bars[bars.len() - self.period..];
        let mean = tail.iter().map(|b| b.close).sum::<f64>() / self.period as f64;
        let variance =
            tail.iter().map(|b| (b.close - mean).powi(2)).sum::<f64>() / self.period as f64;
        let std_dev = variance.sqrt();
        let upper = mean + self.std_devs * std_dev;
        let lower = mean - self.std_devs * std_dev;
        let last = tail.last().unwrap().close;

        if upper <= lower {
            return Ok(IndicatorVote {
                name: self.name().to_string(),
                category: self.category().as_str().to_string(),
                vote: 0,
                confidence: 0.0,
            });
        }

        // position in [0,1]: 0 at the lower band, 1 at the upper band.
        let position = ((last - lower) / (upper - lower)).clamp(0.0, 1.0);
        let (vote, confidence) = if position <= 0.2 {
            (1, (0.2 - position) * 5.0)
        } else if position >= 0.8 {
            (-1, (position - 0.8) * 5.0)
        } else {
            (0, 0.0)
        };

        Ok(IndicatorVote {
            name: self.name().to_string(),
            category: self.category().as_str().to_string(),
            vote,
            confidence: confidence.clamp(0.0, 1.0),
        })
    }
}
