//! hostnet-ovsmgr - Open vSwitch bridges, ports and flows
//!
//! Wraps `ovs-vsctl` and `ovs-ofctl`: every operation validates its input,
//! builds an argument vector, runs it through a
//! [`CommandRunner`](hostnet_common::CommandRunner) and parses the output.

pub mod commands;
mod ovs_mgr;
pub mod parsers;
mod types;

pub use ovs_mgr::OvsMgr;
pub use types::*;
