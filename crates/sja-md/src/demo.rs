//! Deterministic synthetic OHLCV provider.
//!
//! Used for local development and for every test that must not depend on
//! an external service (`DATA_FETCH_MODE=demo`, the config default).
//! Bars are derived from a hash of the ticker string, never from
//! wall-clock or a process-global RNG, so a given ticker always produces
//! the same series within a test run.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sja_schemas::OhlcvBar;

use crate::provider::{DataPeriod, Provider, ProviderError};

pub struct DemoProvider;

impl DemoProvider {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DemoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Provider for DemoProvider {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn fetch_historical(
        &self,
        ticker: &str,
        period: DataPeriod,
    ) -> Result<Vec<OhlcvBar>, ProviderError> {
        if ticker.trim().is_empty() {
            return Err(ProviderError::UnknownTicker(ticker.to_string()));
        }
        Ok(synthetic_series(ticker, period.trading_days()))
    }
}

/// A deterministic pseudo-random walk keyed by `ticker`. Not cryptographic;
/// just needs to be reproducible and to vary between tickers.
fn synthetic_series(ticker: &str, len: usize) -> Vec<OhlcvBar> {
    let mut state = fnv1a(ticker.as_bytes()).max(1);
    let mut price = 50.0 + (state % 500) as f64;
    let now = Utc::now();

    (0..len)
        .map(|i| {
            state = xorshift64(state);
            let drift = ((state % 2001) as f64 - 1000.0) / 10_000.0; // [-0.1, 0.1]
            price = (price * (1.0 + drift)).max(1.0);

            state = xorshift64(state);
            let spread = (price * 0.01).max(0.05);
            let high = price + spread * ((state % 100) as f64 / 100.0);
            let low = (price - spread * ((state % 100) as f64 / 100.0)).max(0.01);

            state = xorshift64(state);
            let volume = 100_000.0 + (state % 900_000) as f64;

            OhlcvBar {
                ts_utc: now - Duration::days((len - i) as i64),
                open: price,
                high,
                low,
                close: price,
                volume,
            }
        })
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in bytes {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

fn xorshift64(mut x: u64) -> u64 {
    x ^= x << 13;
    x ^= x >> 7;
    x ^= x << 17;
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_ticker_produces_identical_series() {
        let provider = DemoProvider::new();
        let a = provider
            .fetch_historical("AAA", DataPeriod::OneMonth)
            .await
            .unwrap();
        let b = provider
            .fetch_historical("AAA", DataPeriod::OneMonth)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn different_tickers_diverge() {
        let provider = DemoProvider::new();
        let a = provider
            .fetch_historical("AAA", DataPeriod::OneMonth)
            .await
            .unwrap();
        let b = provider
            .fetch_historical("BBB", DataPeriod::OneMonth)
            .await
            .unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn series_length_matches_period() {
        let provider = DemoProvider::new();
        let bars = provider
            .fetch_historical("AAA", DataPeriod::ThreeMonths)
            .await
            .unwrap();
        assert_eq!(bars.len(), DataPeriod::ThreeMonths.trading_days());
    }

    #[tokio::test]
    async fn empty_ticker_is_rejected() {
        let provider = DemoProvider::new();
        let result = provider.fetch_historical("", DataPeriod::OneMonth).await;
        assert!(matches!(result, Err(ProviderError::UnknownTicker(_))));
    }

    #[tokio::test]
    async fn bars_are_chronologically_ordered() {
        let provider = DemoProvider::new();
        let bars = provider
            .fetch_historical("AAA", DataPeriod::OneMonth)
            .await
            .unwrap();
        for w in bars.windows(2) {
            assert!(w[0].ts_utc < w[1].ts_utc);
        }
    }
}
