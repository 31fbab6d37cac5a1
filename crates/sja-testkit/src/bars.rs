//! Deterministic synthetic OHLCV series for tests that need market data
//! without depending on `sja-md`'s `DemoProvider` randomization.

use chrono::{Duration, TimeZone, Utc};
use sja_schemas::OhlcvBar;

/// Builds `n` daily bars starting 2024-01-01, closing one cent higher each
/// day. No randomness: callers can assert on exact close prices.
pub fn sample_ohlcv_series(n: usize) -> Vec<OhlcvBar> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.01;
            OhlcvBar {
                ts_utc: start + Duration::days(i as i64),
                open: close - 0.01,
                high: close + 0.02,
                low: close - 0.02,
                close,
                volume: 1_000.0 + i as f64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_is_strictly_increasing_in_time_and_close() {
        let bars = sample_ohlcv_series(10);
        assert_eq!(bars.len(), 10);
        for w in bars.windows(2) {
            assert!(w[0].ts_utc < w[1].ts_utc);
            assert!(w[0].close < w[1].close);
        }
    }
}
