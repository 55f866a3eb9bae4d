//! Per-asset quantities held by the fund.

use std::collections::BTreeMap;

use super::asset::AssetId;
use super::error::FundError;
use super::fixed_point::value_of;
use crate::ports::oracle_port::PriceOracle;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HoldingsLedger {
    holdings: BTreeMap<AssetId, u128>,
}

impl HoldingsLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding_of(&self, asset: &AssetId) -> u128 {
        self.holdings.get(asset).copied().unwrap_or(0)
    }

    /// Overwrite a holding. Only rebalances set holdings directly.
    pub fn set_holding(&mut self, asset: &AssetId, quantity: u128) {
        if quantity == 0 {
            self.holdings.remove(asset);
        } else {
            self.holdings.insert(asset.clone(), quantity);
        }
    }

    pub fn credit(&mut self, asset: &AssetId, quantity: u128) -> Result<(), FundError> {
        let current = self.holding_of(asset);
        let updated = current.checked_add(quantity).ok_or_else(|| {
            FundError::invalid_state(format!("holding of {asset} overflows"))
        })?;
        self.set_holding(asset, updated);
        Ok(())
    }

    pub fn debit(&mut self, asset: &AssetId, quantity: u128) -> Result<(), FundError> {
        let current = self.holding_of(asset);
        let updated = current.checked_sub(quantity).ok_or_else(|| {
            FundError::invalid_state(format!(
                "debit of {quantity} {asset} exceeds holding of {current}"
            ))
        })?;
        self.set_holding(asset, updated);
        Ok(())
    }

    /// Σ holding × price. Assets the oracle does not price are worth zero.
    pub fn total_value(&self, oracle: &dyn PriceOracle) -> Result<u128, FundError> {
        self.holdings.iter().try_fold(0u128, |acc, (asset, &qty)| {
            let price = oracle.price(asset).unwrap_or(0);
            let value = value_of(qty, price)?;
            acc.checked_add(value)
                .ok_or_else(|| FundError::invalid_state("total fund value overflows"))
        })
    }

    pub fn assets(&self) -> impl Iterator<Item = &AssetId> {
        self.holdings.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, u128)> {
        self.holdings.iter().map(|(asset, &qty)| (asset, qty))
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Parallel lists of held assets and quantities, in id order.
    pub fn snapshot(&self) -> (Vec<AssetId>, Vec<u128>) {
        self.holdings
            .iter()
            .map(|(asset, &qty)| (asset.clone(), qty))
            .unzip()
    }
}
