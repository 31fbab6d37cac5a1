//! Request-schema validation (spec §4.8): bounds-checks and ticker-shape
//! checks shared by the analyze and bulk-analyze handlers.

use sja_md::DataPeriod;
use sja_schemas::api::{AnalyzeRequest, ValidationErrorDetail};
use sja_strategy::{StrategyConfig, StrategyOverrides, StrategyTable};

use crate::error::AppError;

const MAX_AD_HOC_TICKERS: usize = 100;
const MAX_TICKER_LEN: usize = 20;

fn is_valid_ticker(ticker: &str) -> bool {
    !ticker.is_empty()
        && ticker.len() <= MAX_TICKER_LEN
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Validates and normalizes the raw ticker list common to both the
/// single-shot and bulk analyze endpoints. `allow_empty` is `true` for the
/// bulk endpoint, where an empty list means "resolve the catalogue
/// universe" rather than a validation failure.
pub fn validate_tickers(tickers: &[String], allow_empty: bool) -> Result<(), AppError> {
    if tickers.is_empty() && !allow_empty {
        return Err(AppError::Validation(vec![ValidationErrorDetail {
            field: "tickers".to_string(),
            message: "must contain at least one ticker".to_string(),
        }]));
    }
    if !allow_empty && tickers.len() > MAX_AD_HOC_TICKERS {
        return Err(AppError::Validation(vec![ValidationErrorDetail {
            field: "tickers".to_string(),
            message: format!("must contain at most {MAX_AD_HOC_TICKERS} tickers"),
        }]));
    }
    let invalid: Vec<ValidationErrorDetail> = tickers
        .iter()
        .filter(|t| !is_valid_ticker(t))
        .map(|t| ValidationErrorDetail {
            field: "tickers".to_string(),
            message: format!("invalid ticker: {t}"),
        })
        .collect();
    if !invalid.is_empty() {
        return Err(AppError::Validation(invalid));
    }
    Ok(())
}

/// Bounds-checks the numeric request fields (spec §4.8 recognized options)
/// and returns the structured violations as wire-shaped details.
fn validate_bounds(req: &AnalyzeRequest) -> Vec<ValidationErrorDetail> {
    let mut out = Vec::new();
    if let Some(capital) = req.capital {
        if !(capital > 0.0 && capital <= 10_000_000.0) {
            out.push(ValidationErrorDetail {
                field: "capital".to_string(),
                message: "must be between 0 (exclusive) and 10,000,000".to_string(),
            });
        }
    }
    if let Some(risk_percent) = req.risk_percent {
        if !(0.5..=5.0).contains(&risk_percent) {
            out.push(ValidationErrorDetail {
                field: "risk_percent".to_string(),
                message: "must be between 0.5 and 5".to_string(),
            });
        }
    }
    if let Some(limit) = req.position_size_limit {
        if !(5.0..=50.0).contains(&limit) {
            out.push(ValidationErrorDetail {
                field: "position_size_limit".to_string(),
                message: "must be between 5 and 50".to_string(),
            });
        }
    }
    if let Some(ratio) = req.risk_reward_ratio {
        if !(1.0..=3.0).contains(&ratio) {
            out.push(ValidationErrorDetail {
                field: "risk_reward_ratio".to_string(),
                message: "must be between 1 and 3".to_string(),
            });
        }
    }
    if let Some(period) = &req.data_period {
        if DataPeriod::parse(period).is_none() {
            out.push(ValidationErrorDetail {
                field: "data_period".to_string(),
                message: "must be one of 1mo, 3mo, 6mo, 1y, 2y".to_string(),
            });
        }
    }
    out
}

/// The parsed, bounds-checked subset of an [`AnalyzeRequest`] the
/// controller needs to submit a job.
pub struct ParsedAnalyzeRequest {
    pub tickers: Vec<String>,
    pub period: DataPeriod,
    pub strategy: StrategyConfig,
}

/// Validates `req` and resolves it to a [`ParsedAnalyzeRequest`] against
/// the built-in strategy table. `tickers` is the caller's already-chosen
/// ticker source (`req.tickers` for the ad-hoc endpoint, `req.symbols` or
/// `req.tickers` for the bulk endpoint), and `allow_empty` controls
/// whether an empty list is a validation failure or a universe signal.
pub fn parse_analyze_request(
    req: &AnalyzeRequest,
    tickers: Vec<String>,
    allow_empty: bool,
) -> Result<ParsedAnalyzeRequest, AppError> {
    validate_tickers(&tickers, allow_empty)?;

    let mut violations = validate_bounds(req);

    let period = req
        .data_period
        .as_deref()
        .and_then(DataPeriod::parse)
        .unwrap_or_default();

    let table = StrategyTable::default();
    let base = table.lookup(req.strategy_id);
    let overrides = StrategyOverrides {
        risk_percent: req.risk_percent,
        position_size_limit: req.position_size_limit,
        risk_reward_ratio: req.risk_reward_ratio,
        category_weights: req.category_weights.clone(),
        enabled_indicators: req.enabled_indicators.clone(),
    };
    let strategy = base.with_overrides(&overrides);
    violations.extend(strategy.validate().into_iter().map(|v| ValidationErrorDetail {
        field: v.field.to_string(),
        message: v.message,
    }));

    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    Ok(ParsedAnalyzeRequest {
        tickers,
        period,
        strategy,
    })
}

/// Bounds-checks `page`/`per_page` query parameters (spec §6: `per_page`
/// `1..100` default 20, `page >= 1` default 1).
pub fn validate_pagination(page: Option<u32>, per_page: Option<u32>) -> Result<(u32, u32), AppError> {
    let page = page.unwrap_or(1);
    let per_page = per_page.unwrap_or(20);
    let mut violations = Vec::new();
    if page < 1 {
        violations.push(ValidationErrorDetail {
            field: "page".to_string(),
            message: "must be >= 1".to_string(),
        });
    }
    if !(1..=100).contains(&per_page) {
        violations.push(ValidationErrorDetail {
            field: "per_page".to_string(),
            message: "must be between 1 and 100".to_string(),
        });
    }
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }
    Ok((page, per_page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tickers_rejected_when_not_allowed() {
        let result = validate_tickers(&[], false);
        assert!(result.is_err());
    }

    #[test]
    fn empty_tickers_allowed_for_bulk() {
        assert!(validate_tickers(&[], true).is_ok());
    }

    #[test]
    fn malformed_ticker_is_rejected() {
        let result = validate_tickers(&["AAA BBB".to_string()], false);
        assert!(result.is_err());
    }

    #[test]
    fn too_many_tickers_is_rejected() {
        let tickers: Vec<String> = (0..101).map(|i| format!("T{i}")).collect();
        let result = validate_tickers(&tickers, false);
        assert!(result.is_err());
    }

    #[test]
    fn out_of_range_risk_percent_fails_parse() {
        let req = AnalyzeRequest {
            tickers: vec!["AAA".to_string()],
            risk_percent: Some(10.0),
            ..Default::default()
        };
        let result = parse_analyze_request(&req, req.tickers.clone(), false);
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn valid_request_resolves_strategy_and_period() {
        let req = AnalyzeRequest {
            tickers: vec!["AAA".to_string()],
            data_period: Some("1y".to_string()),
            ..Default::default()
        };
        let parsed = parse_analyze_request(&req, req.tickers.clone(), false).unwrap();
        assert_eq!(parsed.period, DataPeriod::OneYear);
        assert_eq!(parsed.tickers, vec!["AAA".to_string()]);
    }

    #[test]
    fn pagination_defaults_apply() {
        let (page, per_page) = validate_pagination(None, None).unwrap();
        assert_eq!(page, 1);
        assert_eq!(per_page, 20);
    }

    #[test]
    fn oversized_per_page_is_rejected() {
        assert!(validate_pagination(Some(1), Some(500)).is_err());
    }
}
