//! Mock test runner for loop testing.
//!
//! Returns scripted outcomes in order (cycling) and counts invocations so
//! tests can assert exactly how many attempts ran.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{RunnerError, TestOutcome, TestRunner};
use crate::language::Language;

/// One scripted runner result.
#[derive(Debug, Clone)]
pub(crate) enum MockOutcome {
    /// Tests pass.
    Pass,
    /// Tests fail with this status.
    Fail(i32),
    /// Markup short-circuit.
    SkippedMarkup,
    /// No execution mapping.
    Unsupported,
    /// Runner-level timeout.
    Timeout,
}

/// A mock test runner with scripted outcomes.
#[derive(Debug, Clone)]
pub(crate) struct MockRunner {
    outcomes: Arc<Vec<MockOutcome>>,
    invocation_count: Arc<AtomicUsize>,
}

impl MockRunner {
    /// Creates a mock returning the given outcomes in order, cycling.
    pub fn new(outcomes: Vec<MockOutcome>) -> Self {
        Self {
            outcomes: Arc::new(outcomes),
            invocation_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mock whose tests always fail with status 1.
    pub fn always_fail() -> Self {
        Self::new(vec![MockOutcome::Fail(1)])
    }

    /// Mock whose tests always pass.
    pub fn always_pass() -> Self {
        Self::new(vec![MockOutcome::Pass])
    }

    /// Number of times `run` was called.
    pub fn invocation_count(&self) -> usize {
        self.invocation_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for MockRunner {
    async fn run(
        &self,
        _code: &str,
        _tests: &str,
        _language: Language,
    ) -> Result<TestOutcome, RunnerError> {
        let count = self.invocation_count.fetch_add(1, Ordering::SeqCst);
        match &self.outcomes[count % self.outcomes.len()] {
            MockOutcome::Pass => Ok(TestOutcome::Passed),
            MockOutcome::Fail(status) => Ok(TestOutcome::Failed { status: *status }),
            MockOutcome::SkippedMarkup => Ok(TestOutcome::SkippedMarkup),
            MockOutcome::Unsupported => Ok(TestOutcome::Unsupported),
            MockOutcome::Timeout => Err(RunnerError::Timeout { timeout_secs: 1 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_runner_cycles_and_counts() {
        let runner = MockRunner::new(vec![MockOutcome::Fail(2), MockOutcome::Pass]);

        let first = runner.run("c", "t", Language::Python).await.unwrap();
        let second = runner.run("c", "t", Language::Python).await.unwrap();
        let third = runner.run("c", "t", Language::Python).await.unwrap();

        assert_eq!(first, TestOutcome::Failed { status: 2 });
        assert_eq!(second, TestOutcome::Passed);
        assert_eq!(third, TestOutcome::Failed { status: 2 });
        assert_eq!(runner.invocation_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_runner_timeout() {
        let runner = MockRunner::new(vec![MockOutcome::Timeout]);
        let result = runner.run("c", "t", Language::Python).await;
        assert!(matches!(result, Err(RunnerError::Timeout { .. })));
    }
}
