//! Market-cap target allocation and rebalance delta planning.
//!
//! Planning is pure: it reads holdings and oracle values and returns the
//! target quantities plus the signed deltas that reach them. Non-base assets
//! are sized by floor division; the base asset takes whatever value is left
//! so the valued targets add back up to the fund's total value.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::asset::AssetId;
use super::error::FundError;
use super::fixed_point::{mul_div_floor, value_of, WAD};
use super::holdings::HoldingsLedger;
use crate::ports::oracle_port::PriceOracle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Every market cap is zero, so target weights are undefined.
    NoMarketCaps,
    /// The fund holds nothing of value.
    EmptyFund,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalancePlan {
    pub total_value: u128,
    pub targets: BTreeMap<AssetId, u128>,
    /// `target - holding`, zero entries omitted.
    pub deltas: BTreeMap<AssetId, i128>,
    /// Held assets with no usable price, sold down to zero.
    pub divested: Vec<AssetId>,
    /// Σ value(target) at current prices.
    pub target_value: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Planned {
    Ready(RebalancePlan),
    Skipped(SkipReason),
}

/// WAD-scaled market-cap weights over every asset the oracle lists.
/// `None` when all caps are zero.
pub fn target_weights(
    oracle: &dyn PriceOracle,
) -> Result<Option<BTreeMap<AssetId, u128>>, FundError> {
    let caps: Vec<(AssetId, u128)> = oracle
        .assets()
        .into_iter()
        .map(|a| {
            let cap = oracle.market_cap(&a).unwrap_or(0);
            (a, cap)
        })
        .collect();
    let cap_sum = sum(caps.iter().map(|(_, c)| *c))?;
    if cap_sum == 0 {
        return Ok(None);
    }
    caps.into_iter()
        .map(|(asset, cap)| Ok((asset, mul_div_floor(cap, WAD, cap_sum)?)))
        .collect::<Result<BTreeMap<_, _>, FundError>>()
        .map(Some)
}

pub fn plan_rebalance(
    holdings: &HoldingsLedger,
    oracle: &dyn PriceOracle,
    base: &AssetId,
) -> Result<Planned, FundError> {
    let listed = oracle.assets();
    let cap_sum = sum(listed.iter().map(|a| oracle.market_cap(a).unwrap_or(0)))?;
    if cap_sum == 0 {
        return Ok(Planned::Skipped(SkipReason::NoMarketCaps));
    }

    let total_value = holdings.total_value(oracle)?;
    if total_value == 0 {
        return Ok(Planned::Skipped(SkipReason::EmptyFund));
    }

    let universe: BTreeSet<AssetId> = listed
        .into_iter()
        .chain(holdings.assets().cloned())
        .chain(std::iter::once(base.clone()))
        .collect();

    let mut targets = BTreeMap::new();
    let mut divested = Vec::new();
    let mut allocated: u128 = 0;

    for asset in universe.iter().filter(|a| *a != base) {
        let price = oracle.price(asset).unwrap_or(0);
        if price == 0 {
            if holdings.holding_of(asset) > 0 {
                divested.push(asset.clone());
            }
            targets.insert(asset.clone(), 0);
            continue;
        }
        let cap = oracle.market_cap(asset).unwrap_or(0);
        let value_share = mul_div_floor(total_value, cap, cap_sum)?;
        let quantity = mul_div_floor(value_share, WAD, price)?;
        allocated = allocated
            .checked_add(value_of(quantity, price)?)
            .ok_or_else(|| FundError::invalid_state("allocated value overflows"))?;
        targets.insert(asset.clone(), quantity);
    }

    let base_target = total_value.checked_sub(allocated).ok_or_else(|| {
        FundError::invalid_state(format!(
            "allocated {allocated} exceeds total value {total_value}"
        ))
    })?;
    targets.insert(base.clone(), base_target);

    let target_value = sum(
        targets
            .iter()
            .map(|(asset, &qty)| {
                let price = if asset == base {
                    WAD
                } else {
                    oracle.price(asset).unwrap_or(0)
                };
                value_of(qty, price)
            })
            .collect::<Result<Vec<_>, _>>()?,
    )?;
    check_conservation(total_value, target_value, targets.len())?;

    let mut deltas = BTreeMap::new();
    for (asset, &target) in &targets {
        let delta = signed(target)? - signed(holdings.holding_of(asset))?;
        if delta != 0 {
            deltas.insert(asset.clone(), delta);
        }
    }

    debug!(
        "rebalance plan: total value {total_value}, {} targets, {} deltas, {} divested",
        targets.len(),
        deltas.len(),
        divested.len()
    );

    Ok(Planned::Ready(RebalancePlan {
        total_value,
        targets,
        deltas,
        divested,
        target_value,
    }))
}

/// Valued targets may trail the total by at most one raw unit per asset.
fn check_conservation(
    total_value: u128,
    target_value: u128,
    asset_count: usize,
) -> Result<(), FundError> {
    let residual = total_value.abs_diff(target_value);
    if residual > asset_count as u128 {
        return Err(FundError::invalid_state(format!(
            "rebalance targets are worth {target_value} against total value {total_value}"
        )));
    }
    Ok(())
}

fn sum(values: impl IntoIterator<Item = u128>) -> Result<u128, FundError> {
    values
        .into_iter()
        .try_fold(0u128, |acc, v| acc.checked_add(v))
        .ok_or_else(|| FundError::invalid_state("sum overflows u128"))
}

fn signed(quantity: u128) -> Result<i128, FundError> {
    i128::try_from(quantity)
        .map_err(|_| FundError::invalid_state(format!("{quantity} does not fit a signed delta")))
}
