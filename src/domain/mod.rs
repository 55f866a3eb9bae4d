//! Core fund accounting types and logic.

pub mod asset;
pub mod config_validation;
pub mod error;
pub mod fixed_point;
pub mod fund;
pub mod holdings;
pub mod journal;
pub mod rebalance;
pub mod scheduler;
pub mod shared;
pub mod shares;
