//! In-memory settlement executor.
//!
//! Records every rebalance and transfer instead of moving real value. Used by
//! the `replay` command and by tests, which can make it fail on demand.

use std::collections::BTreeMap;

use crate::domain::asset::AssetId;
use crate::domain::error::{ExecutionError, TransferError};
use crate::domain::shares::Address;
use crate::ports::settlement_port::SettlementPort;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaperTransfer {
    pub asset: AssetId,
    pub quantity: u128,
    pub recipient: Address,
}

#[derive(Debug, Clone, Default)]
pub struct PaperSettlement {
    executions: Vec<BTreeMap<AssetId, i128>>,
    transfers: Vec<PaperTransfer>,
    execution_failure: Option<String>,
    transfer_failure: Option<AssetId>,
}

impl PaperSettlement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every rebalance with `reason`.
    pub fn with_execution_failure(mut self, reason: &str) -> Self {
        self.execution_failure = Some(reason.to_string());
        self
    }

    /// Reject every transfer of `asset`.
    pub fn with_transfer_failure(mut self, asset: AssetId) -> Self {
        self.transfer_failure = Some(asset);
        self
    }

    pub fn executions(&self) -> &[BTreeMap<AssetId, i128>] {
        &self.executions
    }

    pub fn transfers(&self) -> &[PaperTransfer] {
        &self.transfers
    }

    /// Total quantity per asset paid out to `recipient`.
    pub fn delivered_to(&self, recipient: &Address) -> BTreeMap<AssetId, u128> {
        let mut delivered = BTreeMap::new();
        for t in self.transfers.iter().filter(|t| &t.recipient == recipient) {
            *delivered.entry(t.asset.clone()).or_insert(0) += t.quantity;
        }
        delivered
    }
}

impl SettlementPort for PaperSettlement {
    fn execute_rebalance(
        &mut self,
        deltas: &BTreeMap<AssetId, i128>,
    ) -> Result<(), ExecutionError> {
        if let Some(reason) = &self.execution_failure {
            return Err(ExecutionError {
                reason: reason.clone(),
            });
        }
        self.executions.push(deltas.clone());
        Ok(())
    }

    fn transfer_out(
        &mut self,
        asset: &AssetId,
        quantity: u128,
        recipient: &Address,
    ) -> Result<(), TransferError> {
        if self.transfer_failure.as_ref() == Some(asset) {
            return Err(TransferError {
                asset: asset.clone(),
                quantity,
                recipient: recipient.clone(),
                reason: "transfer rejected".to_string(),
            });
        }
        self.transfers.push(PaperTransfer {
            asset: asset.clone(),
            quantity,
            recipient: recipient.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_executions() {
        let mut settlement = PaperSettlement::new();
        let deltas = BTreeMap::from([(AssetId::from("WBTC"), 5i128), (AssetId::from("ETH"), -10)]);
        settlement.execute_rebalance(&deltas).unwrap();
        assert_eq!(settlement.executions(), &[deltas]);
    }

    #[test]
    fn failing_execution_records_nothing() {
        let mut settlement = PaperSettlement::new().with_execution_failure("pool drained");
        let err = settlement.execute_rebalance(&BTreeMap::new()).unwrap_err();
        assert_eq!(err.reason, "pool drained");
        assert!(settlement.executions().is_empty());
    }

    #[test]
    fn delivered_sums_per_recipient() {
        let mut settlement = PaperSettlement::new();
        let alice = Address::from("alice");
        let eth = AssetId::from("ETH");
        settlement.transfer_out(&eth, 3, &alice).unwrap();
        settlement.transfer_out(&eth, 4, &alice).unwrap();
        settlement
            .transfer_out(&eth, 100, &Address::from("bob"))
            .unwrap();

        assert_eq!(settlement.delivered_to(&alice), BTreeMap::from([(eth, 7)]));
    }

    #[test]
    fn transfer_failure_is_per_asset() {
        let wbtc = AssetId::from("WBTC");
        let mut settlement = PaperSettlement::new().with_transfer_failure(wbtc.clone());
        let alice = Address::from("alice");

        assert!(settlement.transfer_out(&AssetId::from("ETH"), 1, &alice).is_ok());
        let err = settlement.transfer_out(&wbtc, 2, &alice).unwrap_err();
        assert_eq!(err.quantity, 2);
        assert_eq!(settlement.transfers().len(), 1);
    }
}
