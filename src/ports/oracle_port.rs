//! Price and market-cap oracle port.

use crate::domain::asset::AssetId;

/// Read side of the oracle feed, injected into every engine call.
///
/// `None` means the oracle has never heard of the asset, which is distinct
/// from a registered asset priced at zero.
pub trait PriceOracle {
    /// Every asset the oracle knows about, in a stable order.
    fn assets(&self) -> Vec<AssetId>;

    /// Price of one whole unit in base-currency units, WAD-scaled.
    fn price(&self, asset: &AssetId) -> Option<u128>;

    /// Market capitalization, WAD-scaled. Only relative magnitudes matter.
    fn market_cap(&self, asset: &AssetId) -> Option<u128>;
}
