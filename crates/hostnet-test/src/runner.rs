//! Scripted command runner
//!
//! Replies are keyed by the rendered command line (`Invocation`'s `Display`),
//! so a test scripts exactly what the managers are expected to run.

use async_trait::async_trait;
use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use hostnet_common::{CommandRunner, HostnetError, HostnetResult, Invocation};

use crate::verification::CommandVerifier;

/// Exit code reported for commands nobody scripted.
pub const UNSCRIPTED_EXIT_CODE: i32 = 127;

/// Canned reply for one command line
#[derive(Debug, Clone)]
pub enum Reply {
    /// Successful run with this stdout (trimmed like the real runner)
    Output(String),
    /// Non-zero exit with this stderr
    Fail { exit_code: i32, stderr: String },
    /// Process could not be spawned
    SpawnError,
}

#[derive(Debug, Clone)]
struct Script {
    reply: Reply,
    delay: Option<Duration>,
}

/// A [`CommandRunner`] that answers from a script.
#[derive(Debug, Default)]
pub struct ScriptedRunner {
    scripts: Mutex<HashMap<String, Script>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    /// Create an empty runner; every command fails until scripted
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(self, command: impl Into<String>, reply: Reply, delay: Option<Duration>) -> Self {
        self.scripts
            .lock()
            .expect("scripts lock poisoned")
            .insert(command.into(), Script { reply, delay });
        self
    }

    /// Reply to `command` with `stdout`
    pub fn on(self, command: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.insert(command, Reply::Output(stdout.into()), None)
    }

    /// Reply to `command` with `stdout` after `delay`
    pub fn on_delayed(
        self,
        command: impl Into<String>,
        stdout: impl Into<String>,
        delay: Duration,
    ) -> Self {
        self.insert(command, Reply::Output(stdout.into()), Some(delay))
    }

    /// Make `command` exit with status 1 and `stderr`
    pub fn fail(self, command: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.insert(
            command,
            Reply::Fail {
                exit_code: 1,
                stderr: stderr.into(),
            },
            None,
        )
    }

    /// Make `command` fail to spawn
    pub fn fail_spawn(self, command: impl Into<String>) -> Self {
        self.insert(command, Reply::SpawnError, None)
    }

    /// Every command line run so far, in call order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock poisoned").clone()
    }

    /// Verifier over the commands run so far
    pub fn verifier(&self) -> CommandVerifier {
        CommandVerifier::new(self.calls())
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, invocation: &Invocation) -> HostnetResult<String> {
        let command = invocation.to_string();
        self.calls
            .lock()
            .expect("calls lock poisoned")
            .push(command.clone());

        let script = self
            .scripts
            .lock()
            .expect("scripts lock poisoned")
            .get(&command)
            .cloned();

        let Some(script) = script else {
            tracing::debug!(command = %command, "Unscripted command");
            return Err(HostnetError::CommandFailed {
                command: command.clone(),
                exit_code: UNSCRIPTED_EXIT_CODE,
                output: format!("unscripted command: {}", command),
            });
        };

        if let Some(delay) = script.delay {
            tokio::time::sleep(delay).await;
        }

        match script.reply {
            Reply::Output(stdout) => Ok(stdout.trim().to_string()),
            Reply::Fail { exit_code, stderr } => Err(HostnetError::CommandFailed {
                command,
                exit_code,
                output: if stderr.is_empty() {
                    format!("command exited with status {}", exit_code)
                } else {
                    stderr
                },
            }),
            Reply::SpawnError => Err(HostnetError::Spawn {
                command,
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
        }
    }
}
