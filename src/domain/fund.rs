//! Index fund engine: deposits, withdrawals and rebalances.
//!
//! Every mutating operation validates and computes against staged copies of
//! the ledgers and commits them only after the settlement executor (if any)
//! has succeeded, so a failed call leaves the fund exactly as it was.

use std::collections::BTreeMap;

use chrono::Duration;
use log::{info, warn};

use super::asset::AssetId;
use super::error::FundError;
use super::fixed_point::{mul_div_floor, SHARE_UNIT, WAD};
use super::holdings::HoldingsLedger;
use super::rebalance::{self, plan_rebalance, Planned, SkipReason};
use super::scheduler::{RebalanceScheduler, SchedulerState, Timestamp};
use super::shares::{Address, ShareLedger};
use crate::ports::oracle_port::PriceOracle;
use crate::ports::settlement_port::SettlementPort;

/// Construction parameters, fixed for the life of the fund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FundConfig {
    pub base_asset: AssetId,
    pub rebalance_period: Duration,
}

impl Default for FundConfig {
    fn default() -> Self {
        FundConfig {
            base_asset: AssetId::from("ETH"),
            rebalance_period: Duration::days(7),
        }
    }
}

/// How a withdrawal's payout leaves the fund.
pub enum Settlement<'a> {
    /// Pay every asset out through the executor.
    External(&'a mut dyn SettlementPort),
    /// Accounting only; nothing leaves custody.
    InternalOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepositReceipt {
    pub investor: Address,
    pub amount: u128,
    pub shares_minted: u128,
    pub total_value_before: u128,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalReceipt {
    pub investor: Address,
    pub shares_burned: u128,
    pub paid_out: BTreeMap<AssetId, u128>,
    pub settled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebalanceReport {
    pub at: Timestamp,
    pub total_value: u128,
    pub targets: BTreeMap<AssetId, u128>,
    pub deltas: BTreeMap<AssetId, i128>,
    pub divested: Vec<AssetId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RebalanceOutcome {
    Executed(RebalanceReport),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FundEvent {
    Deposited(DepositReceipt),
    Withdrawn(WithdrawalReceipt),
    Rebalanced(RebalanceReport),
}

/// Oracle view with the base asset pinned at par.
struct BaseAtPar<'a> {
    base: &'a AssetId,
    oracle: &'a dyn PriceOracle,
}

impl PriceOracle for BaseAtPar<'_> {
    fn assets(&self) -> Vec<AssetId> {
        let mut assets = self.oracle.assets();
        if !assets.contains(self.base) {
            assets.push(self.base.clone());
        }
        assets
    }

    fn price(&self, asset: &AssetId) -> Option<u128> {
        if asset == self.base {
            Some(WAD)
        } else {
            self.oracle.price(asset)
        }
    }

    fn market_cap(&self, asset: &AssetId) -> Option<u128> {
        self.oracle.market_cap(asset)
    }
}

#[derive(Debug, Clone)]
pub struct IndexFund {
    config: FundConfig,
    holdings: HoldingsLedger,
    shares: ShareLedger,
    scheduler: RebalanceScheduler,
    history: Vec<FundEvent>,
}

impl IndexFund {
    pub fn new(config: FundConfig) -> Self {
        let scheduler = RebalanceScheduler::new(config.rebalance_period);
        IndexFund {
            config,
            holdings: HoldingsLedger::new(),
            shares: ShareLedger::new(),
            scheduler,
            history: Vec::new(),
        }
    }

    /// Buy shares with `amount` base units at the current value per share.
    ///
    /// The first deposit into an empty fund mints one whole share per whole
    /// base unit. Later deposits mint `amount * total_shares / total_value`,
    /// rounded down.
    pub fn deposit(
        &mut self,
        investor: &Address,
        amount: u128,
        oracle: &dyn PriceOracle,
    ) -> Result<DepositReceipt, FundError> {
        if amount == 0 {
            return Err(FundError::invalid_amount("deposit amount must be positive"));
        }
        let base = &self.config.base_asset;
        if self.holdings.holding_of(base).checked_add(amount).is_none() {
            return Err(FundError::invalid_amount(format!(
                "deposit of {amount} would overflow the {base} holding"
            )));
        }

        let pricing = BaseAtPar {
            base: &self.config.base_asset,
            oracle,
        };
        let total_value_before = self.holdings.total_value(&pricing)?;
        let total_shares = self.shares.total_shares();

        let shares_minted = if total_shares == 0 {
            mul_div_floor(amount, SHARE_UNIT, WAD)?
        } else if total_value_before == 0 {
            return Err(FundError::invalid_state(format!(
                "fund is worth nothing with {total_shares} shares outstanding"
            )));
        } else {
            mul_div_floor(amount, total_shares, total_value_before)?
        };
        if shares_minted == 0 {
            return Err(FundError::invalid_amount(format!(
                "deposit of {amount} is too small to mint a share"
            )));
        }

        let mut holdings = self.holdings.clone();
        holdings.credit(&self.config.base_asset, amount)?;
        let mut shares = self.shares.clone();
        shares.mint(investor, shares_minted)?;

        self.holdings = holdings;
        self.shares = shares;

        info!("{investor} deposited {amount}, minted {shares_minted} shares");
        let receipt = DepositReceipt {
            investor: investor.clone(),
            amount,
            shares_minted,
            total_value_before,
        };
        self.history.push(FundEvent::Deposited(receipt.clone()));
        Ok(receipt)
    }

    /// Burn `shares_amount` of `investor`'s shares for the same fraction of
    /// every holding, rounded down per asset.
    pub fn withdraw(
        &mut self,
        investor: &Address,
        shares_amount: u128,
        settlement: Settlement<'_>,
    ) -> Result<WithdrawalReceipt, FundError> {
        let paid_out = self.preview_withdraw(investor, shares_amount)?;

        let mut holdings = self.holdings.clone();
        for (asset, &quantity) in &paid_out {
            holdings.debit(asset, quantity)?;
        }
        let mut shares = self.shares.clone();
        shares.burn(investor, shares_amount)?;

        let settled = match settlement {
            Settlement::External(executor) => {
                pay_out(executor, investor, &paid_out)?;
                true
            }
            Settlement::InternalOnly => false,
        };

        self.holdings = holdings;
        self.shares = shares;

        info!(
            "{investor} withdrew {shares_amount} shares across {} assets (settled: {settled})",
            paid_out.len()
        );
        let receipt = WithdrawalReceipt {
            investor: investor.clone(),
            shares_burned: shares_amount,
            paid_out,
            settled,
        };
        self.history.push(FundEvent::Withdrawn(receipt.clone()));
        Ok(receipt)
    }

    /// Move holdings to market-cap weights at current prices.
    ///
    /// Fails with [`FundError::NotDue`] while the scheduler is cooling. When
    /// weights are undefined or the fund is empty nothing changes and the
    /// scheduler does not advance.
    pub fn rebalance(
        &mut self,
        now: Timestamp,
        oracle: &dyn PriceOracle,
        executor: &mut dyn SettlementPort,
    ) -> Result<RebalanceOutcome, FundError> {
        if let SchedulerState::Cooling { until } = self.scheduler.state(now) {
            return Err(FundError::NotDue { next_due: until });
        }

        let pricing = BaseAtPar {
            base: &self.config.base_asset,
            oracle,
        };
        let plan = match plan_rebalance(&self.holdings, &pricing, &self.config.base_asset)? {
            Planned::Ready(plan) => plan,
            Planned::Skipped(reason) => {
                warn!("rebalance at {now} skipped: {reason:?}");
                return Ok(RebalanceOutcome::Skipped(reason));
            }
        };

        if !plan.deltas.is_empty() {
            executor.execute_rebalance(&plan.deltas)?;
        }

        let mut holdings = self.holdings.clone();
        for (asset, &target) in &plan.targets {
            holdings.set_holding(asset, target);
        }
        self.holdings = holdings;
        self.scheduler.mark_rebalanced(now);

        info!(
            "rebalanced at {now}: total value {}, {} deltas",
            plan.total_value,
            plan.deltas.len()
        );
        let report = RebalanceReport {
            at: now,
            total_value: plan.total_value,
            targets: plan.targets,
            deltas: plan.deltas,
            divested: plan.divested,
        };
        self.history.push(FundEvent::Rebalanced(report.clone()));
        Ok(RebalanceOutcome::Executed(report))
    }

    /// Per-asset payout a withdrawal of `shares_amount` would produce now.
    pub fn preview_withdraw(
        &self,
        investor: &Address,
        shares_amount: u128,
    ) -> Result<BTreeMap<AssetId, u128>, FundError> {
        if shares_amount == 0 {
            return Err(FundError::invalid_amount("withdrawal must burn at least one share"));
        }
        let available = self.shares.balance_of(investor);
        if available < shares_amount {
            return Err(FundError::InsufficientShares {
                investor: investor.clone(),
                requested: shares_amount,
                available,
            });
        }

        let total_shares = self.shares.total_shares();
        let mut paid_out = BTreeMap::new();
        for (asset, holding) in self.holdings.iter() {
            let quantity = mul_div_floor(holding, shares_amount, total_shares)?;
            if quantity > 0 {
                paid_out.insert(asset.clone(), quantity);
            }
        }
        Ok(paid_out)
    }

    pub fn config(&self) -> &FundConfig {
        &self.config
    }

    pub fn holdings(&self) -> &HoldingsLedger {
        &self.holdings
    }

    pub fn shares(&self) -> &ShareLedger {
        &self.shares
    }

    pub fn scheduler(&self) -> &RebalanceScheduler {
        &self.scheduler
    }

    pub fn scheduler_state(&self, now: Timestamp) -> SchedulerState {
        self.scheduler.state(now)
    }

    pub fn history(&self) -> &[FundEvent] {
        &self.history
    }

    pub fn get_holdings(&self) -> (Vec<AssetId>, Vec<u128>) {
        self.holdings.snapshot()
    }

    pub fn get_shareholders(&self) -> (Vec<Address>, Vec<u128>) {
        self.shares.snapshot()
    }

    pub fn total_shares(&self) -> u128 {
        self.shares.total_shares()
    }

    pub fn balance_of(&self, investor: &Address) -> u128 {
        self.shares.balance_of(investor)
    }

    pub fn share_fraction(&self, investor: &Address) -> Result<u128, FundError> {
        self.shares.share_fraction(investor)
    }

    pub fn total_value(&self, oracle: &dyn PriceOracle) -> Result<u128, FundError> {
        self.holdings.total_value(&BaseAtPar {
            base: &self.config.base_asset,
            oracle,
        })
    }

    /// WAD-scaled base value of one whole share; the genesis rate (par) while
    /// no shares exist.
    pub fn nav_per_share(&self, oracle: &dyn PriceOracle) -> Result<u128, FundError> {
        let total_shares = self.shares.total_shares();
        if total_shares == 0 {
            return Ok(WAD);
        }
        mul_div_floor(self.total_value(oracle)?, SHARE_UNIT, total_shares)
    }

    /// Base value of `investor`'s whole stake at current prices.
    pub fn redeemable_value(
        &self,
        investor: &Address,
        oracle: &dyn PriceOracle,
    ) -> Result<u128, FundError> {
        let total_shares = self.shares.total_shares();
        if total_shares == 0 {
            return Ok(0);
        }
        mul_div_floor(
            self.total_value(oracle)?,
            self.shares.balance_of(investor),
            total_shares,
        )
    }

    pub fn target_weights(
        &self,
        oracle: &dyn PriceOracle,
    ) -> Result<Option<BTreeMap<AssetId, u128>>, FundError> {
        rebalance::target_weights(&BaseAtPar {
            base: &self.config.base_asset,
            oracle,
        })
    }
}

fn pay_out(
    executor: &mut dyn SettlementPort,
    investor: &Address,
    paid_out: &BTreeMap<AssetId, u128>,
) -> Result<(), FundError> {
    for (done, (asset, &quantity)) in paid_out.iter().enumerate() {
        if let Err(err) = executor.transfer_out(asset, quantity, investor) {
            if done > 0 {
                warn!("withdrawal for {investor} aborted after {done} completed transfers: {err}");
            }
            return Err(err.into());
        }
    }
    Ok(())
}
