//! Test infrastructure for hostnet managers
//!
//! Provides:
//! - A scripted [`CommandRunner`](hostnet_common::CommandRunner) that answers
//!   from canned tool output and records every invocation
//! - Fixtures of real `ovs-vsctl`, `ovs-ofctl`, `ip` and `iptables` output
//! - Command verification helpers

pub mod fixtures;
mod runner;
mod verification;

pub use fixtures::*;
pub use runner::{Reply, ScriptedRunner};
pub use verification::*;
