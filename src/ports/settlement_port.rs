//! Swap/settlement executor port.

use std::collections::BTreeMap;

use crate::domain::asset::AssetId;
use crate::domain::error::{ExecutionError, TransferError};
use crate::domain::shares::Address;

/// Moves real value on behalf of the fund. Both calls may be slow and may
/// fail; the engine commits nothing until they return `Ok`.
pub trait SettlementPort {
    /// Trade toward the given signed per-asset quantity changes
    /// (positive = buy, negative = sell). Zero deltas are never passed.
    fn execute_rebalance(
        &mut self,
        deltas: &BTreeMap<AssetId, i128>,
    ) -> Result<(), ExecutionError>;

    /// Pay `quantity` of `asset` out to `recipient`.
    fn transfer_out(
        &mut self,
        asset: &AssetId,
        quantity: u128,
        recipient: &Address,
    ) -> Result<(), TransferError>;
}
