//! Test execution for generated code.
//!
//! The regeneration loop hands generated code and tests to a `TestRunner`
//! and branches on the outcome. The process-backed runner persists both to a
//! scratch directory and invokes the language's interpreter under a bounded
//! timeout; markup languages short-circuit before anything touches disk.

#[cfg(test)]
pub(crate) mod mock;
mod process;

pub(crate) use process::{execute_artifact, ProcessRunner};

use async_trait::async_trait;

use crate::language::Language;

/// Result of running generated tests against generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TestOutcome {
    /// All tests passed (exit status 0).
    Passed,
    /// Tests ran and failed with this exit status.
    Failed { status: i32 },
    /// Markup language: tests skipped by design, counts as success.
    SkippedMarkup,
    /// No execution mapping for the language: skipped, but not a pass.
    Unsupported,
}

/// Errors from the test runner itself (as opposed to failing tests).
#[derive(Debug, thiserror::Error)]
pub(crate) enum RunnerError {
    /// Test execution exceeded the configured timeout.
    #[error("test execution timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// The interpreter/compiler could not be launched.
    #[error("failed to launch '{program}': {message}")]
    Spawn { program: String, message: String },

    /// Scratch file handling failed.
    #[error("scratch file error: {0}")]
    Io(#[from] std::io::Error),

    /// A configured custom test command could not be parsed.
    #[error("invalid test command '{command}': {message}")]
    InvalidCommand { command: String, message: String },
}

impl RunnerError {
    /// Returns true if this is a timeout error.
    #[allow(dead_code)] // Public API for callers
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Runs generated tests against generated code for one language.
#[async_trait]
pub(crate) trait TestRunner: Send + Sync {
    /// Persists `code` and `tests` as needed and reports the outcome.
    async fn run(
        &self,
        code: &str,
        tests: &str,
        language: Language,
    ) -> Result<TestOutcome, RunnerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_error_display_and_kind() {
        let err = RunnerError::Timeout { timeout_secs: 120 };
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "test execution timed out after 120 seconds"
        );
    }

    #[test]
    fn test_spawn_error_is_not_timeout() {
        let err = RunnerError::Spawn {
            program: "python3".to_string(),
            message: "not found".to_string(),
        };
        assert!(!err.is_timeout());
        assert_eq!(err.to_string(), "failed to launch 'python3': not found");
    }

    #[test]
    fn test_outcome_variants_are_distinct() {
        assert_ne!(TestOutcome::Passed, TestOutcome::SkippedMarkup);
        assert_ne!(TestOutcome::SkippedMarkup, TestOutcome::Unsupported);
        assert_eq!(
            TestOutcome::Failed { status: 1 },
            TestOutcome::Failed { status: 1 }
        );
        assert_ne!(
            TestOutcome::Failed { status: 1 },
            TestOutcome::Failed { status: 2 }
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = RunnerError::from(io);
        assert!(matches!(err, RunnerError::Io(_)));
    }
}
