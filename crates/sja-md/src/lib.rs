//! OHLCV data-fetch boundary (spec §1 external collaborator iii,
//! consumed as `fetch(ticker, period) -> OHLCV | error`).
//!
//! [`provider::Provider`] is the trait `sja-orchestrator` depends on.
//! [`demo::DemoProvider`] is a deterministic, network-free implementation
//! selected by `DATA_FETCH_MODE=demo` (the config default); [`live::LiveProvider`]
//! is a thin HTTP client selected by `DATA_FETCH_MODE=live`.

pub mod demo;
pub mod live;
pub mod provider;

pub use demo::DemoProvider;
pub use live::LiveProvider;
pub use provider::{DataPeriod, Provider, ProviderError};
