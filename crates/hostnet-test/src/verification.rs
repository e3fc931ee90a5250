//! Verification helpers for testing hostnet managers
//!
//! Assertion helpers over the command lines a [`ScriptedRunner`](crate::ScriptedRunner)
//! recorded.

use thiserror::Error;

/// Why a command-log assertion failed
#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("Expected a command containing '{expected}', ran {actual:?}")]
    NotExecuted {
        expected: String,
        actual: Vec<String>,
    },

    #[error("Command containing '{unexpected}' should not have run")]
    UnexpectedlyExecuted { unexpected: String },

    #[error("Expected {expected} commands, found {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Expected '{first}' to run before '{second}'")]
    OrderMismatch { first: String, second: String },
}

/// Result of a command-log assertion
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Assertions over a recorded command log
///
/// Matching is by substring, so a test can name the distinctive part of a
/// command line.
pub struct CommandVerifier {
    captured_commands: Vec<String>,
}

impl CommandVerifier {
    /// Wrap a recorded command log
    pub fn new(captured_commands: Vec<String>) -> Self {
        Self { captured_commands }
    }

    fn position(&self, needle: &str) -> Option<usize> {
        self.captured_commands
            .iter()
            .position(|cmd| cmd.contains(needle))
    }

    /// Some recorded command contains `expected`
    pub fn assert_command_executed(&self, expected: &str) -> VerifyResult<()> {
        if self.position(expected).is_some() {
            Ok(())
        } else {
            Err(VerificationError::NotExecuted {
                expected: expected.to_string(),
                actual: self.captured_commands.clone(),
            })
        }
    }

    /// No recorded command contains `unexpected`
    pub fn assert_command_not_executed(&self, unexpected: &str) -> VerifyResult<()> {
        if self.position(unexpected).is_some() {
            Err(VerificationError::UnexpectedlyExecuted {
                unexpected: unexpected.to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Exactly `expected` commands were recorded
    pub fn assert_command_count(&self, expected: usize) -> VerifyResult<()> {
        let actual = self.captured_commands.len();
        if actual != expected {
            Err(VerificationError::CountMismatch { expected, actual })
        } else {
            Ok(())
        }
    }

    /// Verify that the first command matching `first` ran before the first
    /// command matching `second`
    pub fn assert_command_order(&self, first: &str, second: &str) -> VerifyResult<()> {
        match (self.position(first), self.position(second)) {
            (Some(a), Some(b)) if a < b => Ok(()),
            _ => Err(VerificationError::OrderMismatch {
                first: first.to_string(),
                second: second.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_verifier() {
        let commands = vec![
            "ip netns list".to_string(),
            "ip netns exec blue ip link".to_string(),
        ];

        let verifier = CommandVerifier::new(commands);

        assert!(verifier.assert_command_executed("netns list").is_ok());
        assert!(verifier.assert_command_executed("ip link").is_ok());
        assert!(verifier.assert_command_not_executed("iptables").is_ok());
        assert!(verifier.assert_command_count(2).is_ok());
        assert!(verifier
            .assert_command_order("netns list", "ip link")
            .is_ok());

        assert!(verifier.assert_command_count(3).is_err());
        assert!(verifier.assert_command_executed("nonexistent").is_err());
        assert!(verifier
            .assert_command_order("ip link", "netns list")
            .is_err());
    }
}
