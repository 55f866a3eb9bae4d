//! Port traits: the seams between the accounting core and the outside world.

pub mod config_port;
pub mod oracle_port;
pub mod settlement_port;
