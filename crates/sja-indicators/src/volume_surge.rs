use sja_schemas::{IndicatorVote, OhlcvBar};

use crate::{Category, Indicator, IndicatorFault};

/// Flags an above-average volume bar and votes with the direction of that
/// bar's price move.
pub struct VolumeSurge {
    pub period: usize,
    pub surge_ratio: f64,
}

impl Default for VolumeSurge {
    fn default() -> Self {
        Self {
            period: 20,
            surge_ratio: 1.5,
        }
    }
}

impl Indicator for VolumeSurge {
    fn name(&self) -> &'static str {
        "volume_surge"
    }

    fn category(&self) -> Category {
        Category::Volume
    }

    fn evaluate(&self, bars: &[OhlcvBar]) -> Result<IndicatorVote, IndicatorFault> {
        if bars.len() < self.period + 1 {
            return Err(IndicatorFault::InsufficientData {
                required: self.period + 1,
                available: bars.len(),
            });
        }
        let last = bars.last().unwrap();
        let history = &bars[bars.len() - self.period - 1..bars.len() - 1];
        let avg_volume = history.iter().map(|b| b.volume).sum::<f64>() / self.period as f64;

        if avg_volume <= 0.0 || last.volume < avg_volume * self.surge_ratio {
            return Ok(IndicatorVote {
                name: self.name().to_string(),
                category: self.category().as_str().to_string(),
                vote: 0,
                confidence: 0.0,
            });
        }

        let up_bar = last.close >= last.open;
        let surge_magnitude = ((last.volume / avg_volume) - self.surge_ratio).max(0.0);
        let confidence = (surge_magnitude / self.surge_ratio).clamp(0.0, 1.0);

        Ok(IndicatorVote {
            name: self.name().to_string(),
            category: self.category().as_str().to_string(),
            vote: if up_bar { 1 } else { -1 },
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::bars;

    #[test]
    fn insufficient_data_is_a_fault() {
        let indicator = VolumeSurge::default();
        assert!(indicator.evaluate(&bars(&[1.0])).is_err());
    }

    #[test]
    fn surging_up_bar_votes_buy() {
        let mut series = bars(&vec![100.0; 21]);
        let len = series.len();
        series[len - 1].volume = 10_000_000.0;
        series[len - 1].open = 100.0;
        series[len - 1].close = 105.0;
        let indicator = VolumeSurge::default();
        let vote = indicator.evaluate(&series).unwrap();
        assert_eq!(vote.vote, 1);
    }

    #[test]
    fn no_surge_is_neutral() {
        let series = bars(&vec![100.0; 21]);
        let indicator = VolumeSurge::default();
        let vote = indicator.evaluate(&series).unwrap();
        assert_eq!(vote.vote, 0);
    }
}
