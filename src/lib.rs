//! Market-cap weighted index fund accounting engine.
//!
//! Hexagonal architecture: share accounting and rebalancing in [`domain`],
//! oracle/settlement/config seams in [`ports`], concrete implementations in
//! [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
