//! Shared handle serializing access to one fund.
//!
//! Mutations hold the write lock for their whole computation, settlement call
//! included; views take the read lock, so readers never see a half-applied
//! operation.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::error::FundError;
use super::fund::{
    DepositReceipt, FundConfig, IndexFund, RebalanceOutcome, Settlement, WithdrawalReceipt,
};
use super::scheduler::Timestamp;
use super::shares::Address;
use crate::ports::oracle_port::PriceOracle;
use crate::ports::settlement_port::SettlementPort;

#[derive(Clone)]
pub struct FundHandle {
    inner: Arc<RwLock<IndexFund>>,
}

impl FundHandle {
    pub fn new(config: FundConfig) -> Self {
        Self::from_fund(IndexFund::new(config))
    }

    pub fn from_fund(fund: IndexFund) -> Self {
        FundHandle {
            inner: Arc::new(RwLock::new(fund)),
        }
    }

    pub fn deposit(
        &self,
        investor: &Address,
        amount: u128,
        oracle: &dyn PriceOracle,
    ) -> Result<DepositReceipt, FundError> {
        self.write()?.deposit(investor, amount, oracle)
    }

    pub fn withdraw(
        &self,
        investor: &Address,
        shares_amount: u128,
        settlement: Settlement<'_>,
    ) -> Result<WithdrawalReceipt, FundError> {
        self.write()?.withdraw(investor, shares_amount, settlement)
    }

    pub fn rebalance(
        &self,
        now: Timestamp,
        oracle: &dyn PriceOracle,
        executor: &mut dyn SettlementPort,
    ) -> Result<RebalanceOutcome, FundError> {
        self.write()?.rebalance(now, oracle, executor)
    }

    /// Run a read-only query against a fully committed state.
    pub fn read<T>(&self, view: impl FnOnce(&IndexFund) -> T) -> Result<T, FundError> {
        let guard = self.read_guard()?;
        Ok(view(&guard))
    }

    /// Clone the current committed state.
    pub fn snapshot(&self) -> Result<IndexFund, FundError> {
        self.read(IndexFund::clone)
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, IndexFund>, FundError> {
        self.inner.read().map_err(|_| FundError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, IndexFund>, FundError> {
        self.inner.write().map_err(|_| FundError::LockPoisoned)
    }
}
