//! Single-ticker analysis pipeline (C6, spec §4.5): fetch OHLCV, run the
//! enabled indicators, aggregate by category weight, derive a verdict, and
//! compute entry/stop/target.

use sja_indicators::{atr::average_true_range, Indicator};
use sja_md::{DataPeriod, Provider, ProviderError};
use sja_schemas::{AnalysisDocument, IndicatorVote, OhlcvBar, Verdict};
use sja_strategy::StrategyConfig;

/// Per-ticker failure. Never fatal to the owning job — the caller records
/// this as an `errors` entry and moves on.
#[derive(Debug)]
pub enum AnalysisFault {
    NoData,
    IndicatorFault(String),
    AggregationFault(String),
}

impl std::fmt::Display for AnalysisFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisFault::NoData => write!(f, "no data"),
            AnalysisFault::IndicatorFault(name) => write!(f, "indicator fault: {name}"),
            AnalysisFault::AggregationFault(msg) => write!(f, "aggregation fault: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisFault {}

impl From<ProviderError> for AnalysisFault {
    fn from(_: ProviderError) -> Self {
        AnalysisFault::NoData
    }
}

fn default_indicators() -> Vec<Box<dyn Indicator>> {
    vec![
        Box::new(sja_indicators::sma_crossover::SmaCrossover::default()),
        Box::new(sja_indicators::rsi::RsiThreshold::default()),
        Box::new(sja_indicators::bollinger::BollingerBandPosition::default()),
        Box::new(sja_indicators::volume_surge::VolumeSurge::default()),
    ]
}

/// Maps an indicator's own module name to the key used in
/// `StrategyConfig::enabled_indicators` (the request schema's shorter
/// spelling, e.g. `bollinger_band` rather than `bollinger_band_position`).
fn enabled_key(indicator_name: &str) -> &str {
    match indicator_name {
        "bollinger_band_position" => "bollinger_band",
        other => other,
    }
}

/// Runs the full pipeline for one ticker. `period` bounds the OHLCV
/// lookback window (spec §4.5 step 1).
pub async fn analyze_ticker(
    provider: &dyn Provider,
    ticker: &str,
    period: DataPeriod,
    strategy: &StrategyConfig,
) -> Result<AnalysisDocument, AnalysisFault> {
    let bars = provider
        .fetch_historical(ticker, period)
        .await
        .map_err(AnalysisFault::from)?;
    if bars.is_empty() {
        return Err(AnalysisFault::NoData);
    }

    let votes = evaluate_indicators(&bars, strategy)?;
    let score = aggregate_score(&votes, strategy)?;
    let verdict = Verdict::from_score(score);
    let (entry, stop, target) = compute_levels(&bars, strategy);

    Ok(AnalysisDocument {
        score,
        verdict: verdict.as_str().to_string(),
        votes,
        entry,
        stop,
        target,
    })
}

/// Step 2: evaluate each indicator enabled by `strategy`. An indicator
/// lacking enough bars is skipped, not fatal, unless every enabled
/// indicator faults — in which case there is nothing to aggregate.
fn evaluate_indicators(
    bars: &[OhlcvBar],
    strategy: &StrategyConfig,
) -> Result<Vec<IndicatorVote>, AnalysisFault> {
    let indicators = default_indicators();
    let mut votes = Vec::new();
    let mut attempted = 0usize;

    for indicator in &indicators {
        let key = enabled_key(indicator.name());
        if !strategy.enabled_indicators.get(key).copied().unwrap_or(false) {
            continue;
        }
        attempted += 1;
        match indicator.evaluate(bars) {
            Ok(vote) => votes.push(vote),
            Err(_fault) => continue,
        }
    }

    if attempted == 0 {
        return Err(AnalysisFault::AggregationFault(
            "no indicators enabled".to_string(),
        ));
    }
    if votes.is_empty() {
        return Err(AnalysisFault::IndicatorFault(
            "all enabled indicators lacked sufficient data".to_string(),
        ));
    }
    Ok(votes)
}

/// Step 3/4: `score = 50 + 50 * (Σ weight_c * Σ vote_i * confidence_i) / (Σ weight_c * count_c)`,
/// clamped to `[0, 100]`.
fn aggregate_score(
    votes: &[IndicatorVote],
    strategy: &StrategyConfig,
) -> Result<f64, AnalysisFault> {
    let weights = &strategy.category_weights;
    let mut weighted_signal = 0.0;
    let mut weighted_count = 0.0;

    for vote in votes {
        let weight = weights.get(&vote.category);
        weighted_signal += weight * (vote.vote as f64) * vote.confidence;
        weighted_count += weight;
    }

    if weighted_count <= 0.0 {
        return Err(AnalysisFault::AggregationFault(
            "category weights for all cast votes sum to zero".to_string(),
        ));
    }

    let score = 50.0 + 50.0 * (weighted_signal / weighted_count);
    Ok(score.clamp(0.0, 100.0))
}

/// Step 5: `entry` is the last close; `stop` comes from ATR when at least
/// 14 bars are available, else a fixed fallback percentage; `target`
/// extends `stop`'s distance by the strategy's risk-reward ratio.
fn compute_levels(bars: &[OhlcvBar], strategy: &StrategyConfig) -> (f64, f64, f64) {
    let entry = bars.last().expect("bars checked non-empty by caller").close;
    let stop = match average_true_range(bars, 14) {
        Some(atr) => entry - strategy.atr_stop_multiplier * atr,
        None => entry * (1.0 - strategy.fallback_stop_pct),
    };
    let target = entry + strategy.risk_reward_ratio * (entry - stop);
    (entry, stop, target)
}
