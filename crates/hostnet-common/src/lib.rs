//! Common infrastructure for the hostnet managers.
//!
//! - [`shell`]: command invocation and the [`CommandRunner`] seam
//! - [`validate`]: input grammars applied before any command is built
//! - [`error`]: error taxonomy shared by every manager
//! - [`config`]: process configuration loaded once at start-up
//!
//! # Example
//!
//! ```ignore
//! use hostnet_common::{shell::Invocation, validate, CommandRunner, HostnetResult};
//!
//! async fn delete_bridge(runner: &dyn CommandRunner, name: &str) -> HostnetResult<()> {
//!     let name = validate::identifier("bridge", name)?;
//!     runner.run(&Invocation::argv("ovs-vsctl", ["del-br", name])).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod shell;
pub mod validate;

// Re-export commonly used items at crate root
pub use config::HostnetConfig;
pub use error::{HostnetError, HostnetResult};
pub use shell::{CommandRunner, Invocation, ShellRunner};
