//! Tradable assets and the oracle-fed registry of their prices and caps.

use std::collections::BTreeMap;
use std::fmt;

use super::error::FundError;
use super::fixed_point::WAD;
use crate::ports::oracle_port::PriceOracle;

/// Stable identifier of a tradable asset, e.g. `ETH` or `WBTC`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        AssetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AssetId {
    fn from(id: &str) -> Self {
        AssetId(id.to_string())
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub id: AssetId,
    pub price: u128,
    pub market_cap: u128,
}

/// In-memory oracle state. Values are overwritten on every push; there is no
/// history or staleness tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRegistry {
    base: AssetId,
    assets: BTreeMap<AssetId, Asset>,
}

impl AssetRegistry {
    /// A registry holding only the base asset, priced at par.
    pub fn new(base: AssetId) -> Self {
        let mut assets = BTreeMap::new();
        assets.insert(
            base.clone(),
            Asset {
                id: base.clone(),
                price: WAD,
                market_cap: 0,
            },
        );
        AssetRegistry { base, assets }
    }

    pub fn base(&self) -> &AssetId {
        &self.base
    }

    pub fn register(&mut self, id: AssetId) -> Result<(), FundError> {
        if self.assets.contains_key(&id) {
            return Err(FundError::DuplicateAsset { asset: id });
        }
        self.assets.insert(
            id.clone(),
            Asset {
                id,
                price: 0,
                market_cap: 0,
            },
        );
        Ok(())
    }

    pub fn set_price(&mut self, id: &AssetId, price: u128) -> Result<(), FundError> {
        if *id == self.base {
            return Err(FundError::BasePricePinned { asset: id.clone() });
        }
        self.entry(id).price = price;
        Ok(())
    }

    pub fn set_market_cap(&mut self, id: &AssetId, market_cap: u128) {
        self.entry(id).market_cap = market_cap;
    }

    /// Last pushed price; zero for unregistered ids.
    pub fn price_of(&self, id: &AssetId) -> u128 {
        self.assets.get(id).map_or(0, |a| a.price)
    }

    /// Last pushed market cap; zero for unregistered ids.
    pub fn market_cap_of(&self, id: &AssetId) -> u128 {
        self.assets.get(id).map_or(0, |a| a.market_cap)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.assets.contains_key(id)
    }

    pub fn get(&self, id: &AssetId) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Asset> {
        self.assets.values()
    }

    fn entry(&mut self, id: &AssetId) -> &mut Asset {
        self.assets.entry(id.clone()).or_insert_with(|| Asset {
            id: id.clone(),
            price: 0,
            market_cap: 0,
        })
    }
}

impl PriceOracle for AssetRegistry {
    fn assets(&self) -> Vec<AssetId> {
        self.assets.keys().cloned().collect()
    }

    fn price(&self, asset: &AssetId) -> Option<u128> {
        self.assets.get(asset).map(|a| a.price)
    }

    fn market_cap(&self, asset: &AssetId) -> Option<u128> {
        self.assets.get(asset).map(|a| a.market_cap)
    }
}
