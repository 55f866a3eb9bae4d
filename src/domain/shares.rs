//! Shareholder balances and total shares outstanding.

use std::collections::BTreeMap;
use std::fmt;

use super::error::FundError;
use super::fixed_point::ratio;

/// Shareholder identity, e.g. an account address or a name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Address(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(address: &str) -> Self {
        Address(address.to_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Balances always sum to `total_shares`; every mutation re-checks it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLedger {
    balances: BTreeMap<Address, u128>,
    total_shares: u128,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mint(&mut self, address: &Address, shares: u128) -> Result<(), FundError> {
        let balance = self.balance_of(address);
        let new_balance = balance
            .checked_add(shares)
            .ok_or_else(|| FundError::invalid_state(format!("balance of {address} overflows")))?;
        let new_total = self
            .total_shares
            .checked_add(shares)
            .ok_or_else(|| FundError::invalid_state("total shares overflow"))?;

        if new_balance > 0 {
            self.balances.insert(address.clone(), new_balance);
        }
        self.total_shares = new_total;
        self.verify_conservation()
    }

    pub fn burn(&mut self, address: &Address, shares: u128) -> Result<(), FundError> {
        let balance = self.balance_of(address);
        if balance < shares {
            return Err(FundError::InsufficientShares {
                investor: address.clone(),
                requested: shares,
                available: balance,
            });
        }
        let new_total = self.total_shares.checked_sub(shares).ok_or_else(|| {
            FundError::invalid_state("burn exceeds total shares outstanding")
        })?;

        let new_balance = balance - shares;
        if new_balance == 0 {
            self.balances.remove(address);
        } else {
            self.balances.insert(address.clone(), new_balance);
        }
        self.total_shares = new_total;
        self.verify_conservation()
    }

    pub fn balance_of(&self, address: &Address) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// WAD-scaled `balance / total_shares`; zero for an empty ledger.
    pub fn share_fraction(&self, address: &Address) -> Result<u128, FundError> {
        ratio(self.balance_of(address), self.total_shares)
    }

    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    pub fn verify_conservation(&self) -> Result<(), FundError> {
        let sum = self
            .balances
            .values()
            .try_fold(0u128, |acc, &b| acc.checked_add(b))
            .ok_or_else(|| FundError::invalid_state("sum of balances overflows"))?;
        if sum != self.total_shares {
            return Err(FundError::invalid_state(format!(
                "share balances sum to {sum} but total_shares is {}",
                self.total_shares
            )));
        }
        Ok(())
    }

    /// Parallel lists of shareholders and balances, in address order.
    pub fn snapshot(&self) -> (Vec<Address>, Vec<u128>) {
        self.balances
            .iter()
            .map(|(address, &shares)| (address.clone(), shares))
            .unzip()
    }
}
