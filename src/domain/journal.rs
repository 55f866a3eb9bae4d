//! Replayable journal of oracle pushes and fund operations.

use log::{error, warn};

use super::asset::{AssetId, AssetRegistry};
use super::error::FundError;
use super::fund::{IndexFund, RebalanceOutcome, Settlement};
use super::scheduler::Timestamp;
use super::shares::Address;
use crate::ports::settlement_port::SettlementPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    SetPrice { asset: AssetId, price: u128 },
    SetMarketCap { asset: AssetId, market_cap: u128 },
    Deposit { investor: Address, amount: u128 },
    Withdraw {
        investor: Address,
        shares: u128,
        settle_externally: bool,
    },
    Rebalance,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    /// Source line, for error reporting.
    pub line: usize,
    pub at: Timestamp,
    pub operation: Operation,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rebalances: usize,
    /// Rebalances rejected because the cooling period had not elapsed.
    pub not_due: usize,
    /// Rebalances that found nothing to do (no caps or an empty fund).
    pub skipped: usize,
}

/// Apply `entries` in order. A premature rebalance is logged and counted;
/// any other failure stops the replay.
pub fn replay(
    fund: &mut IndexFund,
    registry: &mut AssetRegistry,
    settlement: &mut dyn SettlementPort,
    entries: &[JournalEntry],
) -> Result<ReplaySummary, FundError> {
    let mut summary = ReplaySummary::default();
    for entry in entries {
        match apply(fund, registry, settlement, entry, &mut summary) {
            Ok(()) => summary.applied += 1,
            Err(FundError::NotDue { next_due }) => {
                warn!(
                    "journal line {}: rebalance at {} not due until {next_due}",
                    entry.line, entry.at
                );
                summary.not_due += 1;
            }
            Err(err) => {
                error!("journal line {}: {err}", entry.line);
                return Err(err);
            }
        }
    }
    Ok(summary)
}

fn apply(
    fund: &mut IndexFund,
    registry: &mut AssetRegistry,
    settlement: &mut dyn SettlementPort,
    entry: &JournalEntry,
    summary: &mut ReplaySummary,
) -> Result<(), FundError> {
    match &entry.operation {
        Operation::SetPrice { asset, price } => registry.set_price(asset, *price),
        Operation::SetMarketCap { asset, market_cap } => {
            registry.set_market_cap(asset, *market_cap);
            Ok(())
        }
        Operation::Deposit { investor, amount } => {
            fund.deposit(investor, *amount, &*registry).map(|_| ())
        }
        Operation::Withdraw {
            investor,
            shares,
            settle_externally,
        } => {
            let mode = if *settle_externally {
                Settlement::External(&mut *settlement)
            } else {
                Settlement::InternalOnly
            };
            fund.withdraw(investor, *shares, mode).map(|_| ())
        }
        Operation::Rebalance => {
            match fund.rebalance(entry.at, &*registry, settlement)? {
                RebalanceOutcome::Executed(_) => summary.rebalances += 1,
                RebalanceOutcome::Skipped(_) => summary.skipped += 1,
            }
            Ok(())
        }
    }
}
