//! hostnet-facade - operation surface over host networking state
//!
//! [`Facade`] bundles the OVS, namespace and firewall managers behind one
//! handle built from a shared [`HostnetConfig`](hostnet_common::HostnetConfig).
//! The `hostnetctl` binary drives it from the command line.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use hostnet_common::{config::DEFAULT_CONFIG_PATH, HostnetConfig};
//! use hostnet_facade::Facade;
//!
//! let config = HostnetConfig::load_or_default(DEFAULT_CONFIG_PATH)?;
//! let facade = Facade::new(Arc::new(config));
//! let bridges = facade.list_bridges().await?;
//! ```

pub mod cli;
mod facade;
pub mod logging;

pub use facade::{Ack, Facade};
