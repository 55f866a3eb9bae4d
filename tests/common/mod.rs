#![allow(dead_code)]

use chrono::NaiveDate;
use indexfund::adapters::paper_settlement::PaperSettlement;
use indexfund::domain::asset::{AssetId, AssetRegistry};
use indexfund::domain::fixed_point::WAD;
use indexfund::domain::fund::{FundConfig, IndexFund};
use indexfund::domain::scheduler::Timestamp;
use indexfund::domain::shares::Address;

pub fn eth() -> AssetId {
    AssetId::from("ETH")
}

pub fn wbtc() -> AssetId {
    AssetId::from("WBTC")
}

pub fn alice() -> Address {
    Address::from("alice")
}

pub fn bob() -> Address {
    Address::from("bob")
}

/// Whole units scaled to WAD.
pub fn units(n: u128) -> u128 {
    n * WAD
}

/// Midnight on 2024-01-01 plus `n` days.
pub fn day(n: i64) -> Timestamp {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + chrono::Duration::days(n)
}

/// WBTC at 2 ETH; caps 1e12 (ETH) and 1.5e12 (WBTC).
pub fn scenario_registry() -> AssetRegistry {
    let mut registry = AssetRegistry::new(eth());
    registry.set_price(&wbtc(), units(2)).unwrap();
    registry.set_market_cap(&eth(), units(1_000_000_000_000));
    registry.set_market_cap(&wbtc(), units(1_500_000_000_000));
    registry
}

/// Alice deposits 1 ETH, Bob 0.5 ETH.
pub fn funded_fund(registry: &AssetRegistry) -> IndexFund {
    let mut fund = IndexFund::new(FundConfig::default());
    fund.deposit(&alice(), units(1), registry).unwrap();
    fund.deposit(&bob(), units(1) / 2, registry).unwrap();
    fund
}

pub fn paper() -> PaperSettlement {
    PaperSettlement::new()
}

/// WAD fraction as f64 for approximate comparisons.
pub fn frac(wad: u128) -> f64 {
    wad as f64 / WAD as f64
}
