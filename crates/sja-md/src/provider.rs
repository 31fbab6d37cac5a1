//! Provider boundary for OHLCV market-data ingestion (spec §4.5 step 1,
//! consumed by `sja-orchestrator` as `fetch(ticker, period) -> OHLCV | error`).
//!
//! This module defines only the request/error types and the [`Provider`]
//! trait. Concrete implementations ([`crate::demo::DemoProvider`],
//! [`crate::live::LiveProvider`]) live in sibling modules.

use std::fmt;

use async_trait::async_trait;
use sja_schemas::OhlcvBar;

/// Lookback window requested for one ticker. Mirrors the request schema's
/// `data_period` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataPeriod {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
}

impl DataPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataPeriod::OneMonth => "1mo",
            DataPeriod::ThreeMonths => "3mo",
            DataPeriod::SixMonths => "6mo",
            DataPeriod::OneYear => "1y",
            DataPeriod::TwoYears => "2y",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1mo" => Some(DataPeriod::OneMonth),
            "3mo" => Some(DataPeriod::ThreeMonths),
            "6mo" => Some(DataPeriod::SixMonths),
            "1y" => Some(DataPeriod::OneYear),
            "2y" => Some(DataPeriod::TwoYears),
            _ => None,
        }
    }

    /// Approximate number of trading days this period covers. Used by the
    /// demo provider to size its synthetic series and as a sanity bound on
    /// live-provider responses.
    pub fn trading_days(&self) -> usize {
        match self {
            DataPeriod::OneMonth => 21,
            DataPeriod::ThreeMonths => 63,
            DataPeriod::SixMonths => 126,
            DataPeriod::OneYear => 252,
            DataPeriod::TwoYears => 504,
        }
    }
}

impl Default for DataPeriod {
    fn default() -> Self {
        DataPeriod::SixMonths
    }
}

/// Errors a [`Provider`] implementation may return. The orchestrator maps
/// any of these to a per-ticker `NoData` fault — never fatal to the job.
#[derive(Debug)]
pub enum ProviderError {
    Transport(String),
    Api { code: Option<i64>, message: String },
    Decode(String),
    Config(String),
    UnknownTicker(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Transport(msg) => write!(f, "transport error: {msg}"),
            ProviderError::Api { code: Some(c), message } => {
                write!(f, "provider api error code={c}: {message}")
            }
            ProviderError::Api { code: None, message } => {
                write!(f, "provider api error: {message}")
            }
            ProviderError::Decode(msg) => write!(f, "decode error: {msg}"),
            ProviderError::Config(msg) => write!(f, "config error: {msg}"),
            ProviderError::UnknownTicker(t) => write!(f, "unknown ticker: {t}"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Upstream OHLCV data-fetch contract. Implementations must be object-safe
/// (`Box<dyn Provider>`) and safe to share across the worker pool's
/// concurrent ticker fetches.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch historical OHLCV bars for one ticker over `period`, oldest
    /// first. An empty result is valid input to the caller (the
    /// orchestrator turns it into `NoData`), not necessarily an error.
    async fn fetch_historical(
        &self,
        ticker: &str,
        period: DataPeriod,
    ) -> Result<Vec<OhlcvBar>, ProviderError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_period_round_trips_through_str() {
        for p in [
            DataPeriod::OneMonth,
            DataPeriod::ThreeMonths,
            DataPeriod::SixMonths,
            DataPeriod::OneYear,
            DataPeriod::TwoYears,
        ] {
            assert_eq!(DataPeriod::parse(p.as_str()), Some(p));
        }
    }

    #[test]
    fn unknown_period_string_is_rejected() {
        assert!(DataPeriod::parse("3d").is_none());
    }

    #[test]
    fn provider_error_display_variants() {
        assert_eq!(
            ProviderError::Transport("timeout".into()).to_string(),
            "transport error: timeout"
        );
        assert_eq!(
            ProviderError::UnknownTicker("ZZZZ".into()).to_string(),
            "unknown ticker: ZZZZ"
        );
    }
}
