//! A configurable fake [`sja_md::Provider`] for exercising the job
//! controller's worker pool without network I/O: per-ticker canned
//! responses, plus hooks for the timeout and error-fault paths.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use sja_md::{DataPeriod, Provider, ProviderError};
use sja_schemas::OhlcvBar;

use crate::bars::sample_ohlcv_series;

/// What [`FakeProvider`] does for one ticker.
pub enum TickerFixture {
    /// Returns these bars immediately.
    Bars(Vec<OhlcvBar>),
    /// Returns this error immediately.
    Error(ProviderError),
    /// Sleeps for `Duration` before returning the bars — used to exercise
    /// the orchestrator's per-ticker timeout.
    Delay(Duration, Vec<OhlcvBar>),
}

/// Deterministic, network-free `Provider` driven entirely by a fixture map.
/// Tickers with no configured fixture fall back to a 10-bar
/// [`sample_ohlcv_series`], so ad-hoc tests don't need to configure every
/// ticker they touch.
pub struct FakeProvider {
    fixtures: Mutex<HashMap<String, TickerFixture>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self {
            fixtures: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_fixture(self, ticker: impl Into<String>, fixture: TickerFixture) -> Self {
        self.fixtures.lock().unwrap().insert(ticker.into(), fixture);
        self
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn fetch_historical(&self, ticker: &str, _period: DataPeriod) -> Result<Vec<OhlcvBar>, ProviderError> {
        let fixture = self.fixtures.lock().unwrap().remove(ticker);
        match fixture {
            Some(TickerFixture::Bars(bars)) => Ok(bars),
            Some(TickerFixture::Error(e)) => Err(e),
            Some(TickerFixture::Delay(delay, bars)) => {
                tokio::time::sleep(delay).await;
                Ok(bars)
            }
            None => Ok(sample_ohlcv_series(10)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn configured_ticker_returns_its_fixture() {
        let provider = FakeProvider::new().with_fixture(
            "ZZZZ",
            TickerFixture::Error(ProviderError::UnknownTicker("ZZZZ".to_string())),
        );
        let result = provider.fetch_historical("ZZZZ", DataPeriod::OneMonth).await;
        assert!(matches!(result, Err(ProviderError::UnknownTicker(_))));
    }

    #[tokio::test]
    async fn unconfigured_ticker_falls_back_to_sample_series() {
        let provider = FakeProvider::new();
        let bars = provider.fetch_historical("AAA", DataPeriod::OneMonth).await.unwrap();
        assert_eq!(bars.len(), 10);
    }
}
