//! Domain error types.

use super::asset::AssetId;
use super::scheduler::Timestamp;
use super::shares::Address;

/// Failure reported by the settlement executor while applying rebalance deltas.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rebalance execution failed: {reason}")]
pub struct ExecutionError {
    pub reason: String,
}

/// Failure reported by the settlement executor while paying out a withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("transfer of {quantity} {asset} to {recipient} failed: {reason}")]
pub struct TransferError {
    pub asset: AssetId,
    pub quantity: u128,
    pub recipient: Address,
    pub reason: String,
}

/// Top-level error type for indexfund.
#[derive(Debug, thiserror::Error)]
pub enum FundError {
    #[error("invalid amount: {reason}")]
    InvalidAmount { reason: String },

    #[error("insufficient shares for {investor}: requested {requested}, available {available}")]
    InsufficientShares {
        investor: Address,
        requested: u128,
        available: u128,
    },

    #[error("invalid state: {reason}")]
    InvalidState { reason: String },

    #[error("rebalance not due until {next_due}")]
    NotDue { next_due: Timestamp },

    #[error("asset {asset} is already registered")]
    DuplicateAsset { asset: AssetId },

    #[error("price of base asset {asset} is fixed at par")]
    BasePricePinned { asset: AssetId },

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("price feed error at line {line}: {reason}")]
    Feed { line: usize, reason: String },

    #[error("journal error at line {line}: {reason}")]
    Journal { line: usize, reason: String },

    #[error("fund lock poisoned")]
    LockPoisoned,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FundError {
    pub(crate) fn invalid_state(reason: impl Into<String>) -> Self {
        FundError::InvalidState {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_amount(reason: impl Into<String>) -> Self {
        FundError::InvalidAmount {
            reason: reason.into(),
        }
    }

    /// Process exit status for the CLI, grouped by error kind.
    pub fn exit_status(&self) -> u8 {
        match self {
            FundError::Io(_) => 1,
            FundError::ConfigParse { .. }
            | FundError::ConfigMissing { .. }
            | FundError::ConfigInvalid { .. } => 2,
            FundError::Feed { .. } | FundError::Journal { .. } => 3,
            FundError::InvalidAmount { .. }
            | FundError::InsufficientShares { .. }
            | FundError::NotDue { .. }
            | FundError::DuplicateAsset { .. }
            | FundError::BasePricePinned { .. } => 4,
            FundError::Execution(_) | FundError::Transfer(_) => 5,
            FundError::InvalidState { .. } | FundError::LockPoisoned => 6,
        }
    }
}

impl From<&FundError> for std::process::ExitCode {
    fn from(err: &FundError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_shares_message() {
        let err = FundError::InsufficientShares {
            investor: Address::from("alice"),
            requested: 10,
            available: 4,
        };
        assert_eq!(
            err.to_string(),
            "insufficient shares for alice: requested 10, available 4"
        );
    }

    #[test]
    fn transfer_error_converts_transparently() {
        let inner = TransferError {
            asset: AssetId::from("WBTC"),
            quantity: 5,
            recipient: Address::from("bob"),
            reason: "bridge offline".into(),
        };
        let err: FundError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert!(matches!(err, FundError::Transfer(_)));
    }

    #[test]
    fn exit_codes_group_by_kind() {
        let cases = [
            (FundError::Io(std::io::Error::other("x")), 1),
            (
                FundError::ConfigMissing {
                    section: "fund".into(),
                    key: "base_asset".into(),
                },
                2,
            ),
            (
                FundError::Journal {
                    line: 3,
                    reason: "bad".into(),
                },
                3,
            ),
            (FundError::invalid_amount("zero"), 4),
            (
                FundError::Execution(ExecutionError {
                    reason: "pool empty".into(),
                }),
                5,
            ),
            (FundError::invalid_state("negative"), 6),
        ];
        for (err, expected) in cases {
            assert_eq!(err.exit_status(), expected, "{err}");
        }
    }
}
