//! hostnet-netnsmgr - network namespaces, routes and iptables rules
//!
//! The host namespace and named namespaces are modelled as [`Namespace`];
//! commands addressed at a named namespace run under `ip netns exec`.

pub mod commands;
mod firewall_mgr;
mod netns_mgr;
pub mod parsers;
mod types;

pub use firewall_mgr::FirewallMgr;
pub use netns_mgr::NetnsMgr;
pub use types::*;
