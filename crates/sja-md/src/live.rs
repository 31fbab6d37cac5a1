//! Thin HTTP-backed live OHLCV provider.
//!
//! The real upstream data vendor is an external collaborator (spec §1,
//! out of scope): this implementation only needs to shape a GET request
//! and decode a JSON bar array into [`OhlcvBar`] — it is not expected to
//! be feature-complete against any particular vendor's API.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sja_schemas::OhlcvBar;

use crate::provider::{DataPeriod, Provider, ProviderError};

pub struct LiveProvider {
    http: reqwest::Client,
    base_url: String,
}

impl LiveProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    fn bars_url(&self, ticker: &str) -> String {
        format!(
            "{}/ohlcv/{}",
            self.base_url.trim_end_matches('/'),
            urlencode(ticker)
        )
    }
}

#[async_trait]
impl Provider for LiveProvider {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn fetch_historical(
        &self,
        ticker: &str,
        period: DataPeriod,
    ) -> Result<Vec<OhlcvBar>, ProviderError> {
        let resp = self
            .http
            .get(self.bars_url(ticker))
            .query(&[("period", period.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::UnknownTicker(ticker.to_string()));
        }
        if !status.is_success() {
            return Err(ProviderError::Api {
                code: Some(status.as_u16() as i64),
                message: format!("upstream returned {status}"),
            });
        }

        let body: Vec<WireBar> = resp
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        Ok(body.into_iter().map(WireBar::into_bar).collect())
    }
}

#[derive(Debug, Deserialize)]
struct WireBar {
    #[serde(rename = "t")]
    ts_utc: DateTime<Utc>,
    #[serde(rename = "o")]
    open: f64,
    #[serde(rename = "h")]
    high: f64,
    #[serde(rename = "l")]
    low: f64,
    #[serde(rename = "c")]
    close: f64,
    #[serde(rename = "v")]
    volume: f64,
}

impl WireBar {
    fn into_bar(self) -> OhlcvBar {
        OhlcvBar {
            ts_utc: self.ts_utc,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        }
    }
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c.to_string()
            } else {
                format!("%{:02X}", c as u32)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bars_url_encodes_special_characters() {
        let provider = LiveProvider::new("https://example.test");
        assert_eq!(
            provider.bars_url("BRK.B"),
            "https://example.test/ohlcv/BRK.B"
        );
        assert_eq!(
            provider.bars_url("005930.KS"),
            "https://example.test/ohlcv/005930.KS"
        );
    }

    #[tokio::test]
    async fn not_found_maps_to_unknown_ticker() {
        let server = httpmock::MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/ohlcv/ZZZZ");
            then.status(404);
        });
        let provider = LiveProvider::new(server.base_url());
        let result = provider
            .fetch_historical("ZZZZ", DataPeriod::OneMonth)
            .await;
        assert!(matches!(result, Err(ProviderError::UnknownTicker(_))));
    }

    #[tokio::test]
    async fn decodes_bar_array_into_ohlcv() {
        let server = httpmock::MockServer::start();
        let _mock = server.mock(|when, then| {
            when.method(httpmock::Method::GET).path("/ohlcv/AAA");
            then.status(200).json_body(serde_json::json!([
                {"t": "2024-01-01T00:00:00Z", "o": 10.0, "h": 11.0, "l": 9.5, "c": 10.5, "v": 1000.0}
            ]));
        });
        let provider = LiveProvider::new(server.base_url());
        let bars = provider
            .fetch_historical("AAA", DataPeriod::OneMonth)
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 10.5);
    }
}
