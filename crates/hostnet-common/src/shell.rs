//! External command execution for hostnet managers.
//!
//! Commands are described by an [`Invocation`]. The argv form runs the
//! executable directly with an explicit argument list and never touches a
//! shell; the shell form exists for the few lookups that need a pipeline and
//! must only ever be built from validated, [`shellquote`]d tokens.
//!
//! Managers do not call [`ShellRunner`] directly. They hold an
//! `Arc<dyn CommandRunner>` so tests can substitute a scripted runner.
//!
//! # Example
//!
//! ```ignore
//! use hostnet_common::shell::{CommandRunner, Invocation, ShellRunner};
//!
//! let runner = ShellRunner::default();
//! let bridges = runner.run(&Invocation::argv("ovs-vsctl", ["list-br"])).await?;
//! ```

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{HostnetError, HostnetResult};

/// Default shell used for [`Invocation::Shell`] commands.
pub const SH_CMD: &str = "/bin/sh";

/// Regex for characters that need escaping in shell double-quotes.
/// Matches: $, `, ", \, and newline
static SHELL_ESCAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"([$`"\\\n])"#).expect("Invalid regex pattern"));

/// Quotes a string for safe use in shell commands.
///
/// Wraps the string in double quotes and escapes `$`, `` ` ``, `"`, `\` and
/// newline.
///
/// ```
/// use hostnet_common::shell::shellquote;
///
/// assert_eq!(shellquote("vxlan0"), "\"vxlan0\"");
/// assert_eq!(shellquote("with$var"), "\"with\\$var\"");
/// ```
pub fn shellquote(s: &str) -> String {
    let escaped = SHELL_ESCAPE_RE.replace_all(s, r"\$1");
    format!("\"{}\"", escaped)
}

/// A single external command to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Executable plus explicit argument vector; no shell involved.
    Argv {
        /// Executable name or path.
        program: String,
        /// Arguments passed verbatim.
        args: Vec<String>,
    },
    /// Command line interpreted by `sh -c`.
    Shell(String),
}

impl Invocation {
    /// Builds an argv invocation.
    pub fn argv<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Argv {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds a shell invocation.
    pub fn shell(command_line: impl Into<String>) -> Self {
        Self::Shell(command_line.into())
    }

    /// Returns true if this invocation goes through a shell.
    pub fn is_shell(&self) -> bool {
        matches!(self, Invocation::Shell(_))
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::Argv { program, args } => {
                write!(f, "{}", program)?;
                for arg in args {
                    write!(f, " {}", arg)?;
                }
                Ok(())
            }
            Invocation::Shell(line) => write!(f, "{}", line),
        }
    }
}

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct ExecResult {
    /// The exit code of the command (0 = success, -1 = killed by signal).
    pub exit_code: i32,
    /// Standard output with surrounding whitespace trimmed.
    pub stdout: String,
    /// Standard error with surrounding whitespace trimmed.
    pub stderr: String,
}

impl ExecResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Diagnostic text reported for a failed command.
    ///
    /// This is stderr verbatim, or a generic message if stderr was empty.
    pub fn failure_output(&self) -> String {
        if self.stderr.is_empty() {
            format!("command exited with status {}", self.exit_code)
        } else {
            self.stderr.clone()
        }
    }
}

/// Executes an invocation and captures its output.
///
/// Returns `Err` only when the process could not be spawned; a non-zero exit
/// is reported through [`ExecResult::exit_code`].
pub async fn exec(invocation: &Invocation, shell: &str) -> HostnetResult<ExecResult> {
    tracing::debug!(command = %invocation, "Executing command");

    let mut command = match invocation {
        Invocation::Argv { program, args } => {
            let mut command = Command::new(program);
            command.args(args);
            command
        }
        Invocation::Shell(line) => {
            let mut command = Command::new(shell);
            command.arg("-c").arg(line);
            command
        }
    };

    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| HostnetError::Spawn {
            command: invocation.to_string(),
            source: e,
        })?;

    let exit_code = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();

    let result = ExecResult {
        exit_code,
        stdout,
        stderr,
    };

    if result.success() {
        tracing::trace!(command = %invocation, "Command succeeded");
    } else {
        tracing::debug!(
            command = %invocation,
            exit_code = exit_code,
            stderr = %result.stderr,
            "Command failed"
        );
    }

    Ok(result)
}

/// Executes an invocation and returns an error on non-zero exit.
///
/// # Returns
///
/// * `Ok(String)` - trimmed stdout on success
/// * `Err(HostnetError::CommandFailed)` - non-zero exit, carrying stderr
/// * `Err(HostnetError::Spawn)` - the process could not be started
pub async fn exec_or_throw(invocation: &Invocation, shell: &str) -> HostnetResult<String> {
    let result = exec(invocation, shell).await?;
    if result.success() {
        Ok(result.stdout)
    } else {
        Err(HostnetError::CommandFailed {
            command: invocation.to_string(),
            exit_code: result.exit_code,
            output: result.failure_output(),
        })
    }
}

/// Runs external commands on behalf of the managers.
///
/// Implementations must be safe to call concurrently: aggregators issue many
/// independent invocations at once and re-associate results by key.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs the invocation and returns its trimmed stdout.
    async fn run(&self, invocation: &Invocation) -> HostnetResult<String>;
}

/// Production runner backed by `tokio::process`.
#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
}

impl ShellRunner {
    /// Creates a runner that uses `shell` for [`Invocation::Shell`] commands.
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for ShellRunner {
    fn default() -> Self {
        Self::new(SH_CMD)
    }
}

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, invocation: &Invocation) -> HostnetResult<String> {
        exec_or_throw(invocation, &self.shell).await
    }
}
