//! Fund configuration validation.
//!
//! Checks every `[fund]` and `[asset.*]` value before a fund is built.

use std::collections::BTreeSet;

use crate::domain::error::FundError;
use crate::domain::fixed_point::{parse_decimal, WAD_DECIMALS};
use crate::ports::config_port::ConfigPort;

pub const FUND_SECTION: &str = "fund";
pub const DEFAULT_PERIOD_DAYS: i64 = 7;
pub const MAX_PERIOD_DAYS: i64 = 3_650;

pub fn asset_section(asset: &str) -> String {
    format!("asset.{asset}")
}

pub fn validate_fund_config(config: &dyn ConfigPort) -> Result<(), FundError> {
    let base = validate_base_asset(config)?;
    read_period_days(config)?;
    read_decimal(config, FUND_SECTION, "base_market_cap")?;
    validate_assets(config, &base)?;
    Ok(())
}

/// Parse an optional WAD-scaled decimal value.
pub fn read_decimal(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<u128>, FundError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => parse_decimal(&raw, WAD_DECIMALS)
            .map(Some)
            .map_err(|reason| FundError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason,
            }),
    }
}

fn validate_base_asset(config: &dyn ConfigPort) -> Result<String, FundError> {
    match config.get_string(FUND_SECTION, "base_asset") {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(FundError::ConfigMissing {
            section: FUND_SECTION.to_string(),
            key: "base_asset".to_string(),
        }),
    }
}

/// Rebalance period in whole days; [`DEFAULT_PERIOD_DAYS`] when absent.
pub fn read_period_days(config: &dyn ConfigPort) -> Result<i64, FundError> {
    let invalid = |reason: String| FundError::ConfigInvalid {
        section: FUND_SECTION.to_string(),
        key: "rebalance_period_days".to_string(),
        reason,
    };
    let days = match config.get_string(FUND_SECTION, "rebalance_period_days") {
        None => DEFAULT_PERIOD_DAYS,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map_err(|_| invalid(format!("{raw:?} is not a whole number of days")))?,
    };
    if days <= 0 || days > MAX_PERIOD_DAYS {
        return Err(invalid(format!(
            "rebalance_period_days must be between 1 and {MAX_PERIOD_DAYS}"
        )));
    }
    Ok(days)
}

fn validate_assets(config: &dyn ConfigPort, base: &str) -> Result<(), FundError> {
    let mut seen = BTreeSet::new();
    for asset in config.get_list(FUND_SECTION, "assets") {
        if asset == base {
            return Err(FundError::ConfigInvalid {
                section: FUND_SECTION.to_string(),
                key: "assets".to_string(),
                reason: format!("base asset {base} must not be listed in assets"),
            });
        }
        if !seen.insert(asset.clone()) {
            return Err(FundError::ConfigInvalid {
                section: FUND_SECTION.to_string(),
                key: "assets".to_string(),
                reason: format!("asset {asset} is listed twice"),
            });
        }
        let section = asset_section(&asset);
        read_decimal(config, &section, "price")?;
        read_decimal(config, &section, "market_cap")?;
    }
    Ok(())
}
