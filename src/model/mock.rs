//! Mock model client for testing.
//!
//! Returns scripted responses and tracks invocations so loop tests can
//! assert exactly how many round trips were made.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{ModelClient, ModelError};

/// A single scripted response.
#[derive(Debug, Clone)]
pub(crate) enum MockResponse {
    /// Return the given text.
    Success(String),
    /// Fail as if every transport retry was exhausted.
    Failure(String),
}

/// A mock model client for testing.
///
/// Responses are returned in order and cycle when exhausted.
#[derive(Debug, Clone)]
pub(crate) struct MockModelClient {
    responses: Arc<Vec<MockResponse>>,
    invocation_count: Arc<AtomicUsize>,
}

impl MockModelClient {
    /// Creates a mock returning the given responses in order, cycling.
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(responses),
            invocation_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Mock that always answers with the same text.
    pub fn always_succeed(text: &str) -> Self {
        Self::new(vec![MockResponse::Success(text.to_string())])
    }

    /// Mock that always fails.
    pub fn always_fail(message: &str) -> Self {
        Self::new(vec![MockResponse::Failure(message.to_string())])
    }

    /// Number of times `complete` was called.
    pub fn invocation_count(&self) -> usize {
        self.invocation_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    fn name(&self) -> &'static str {
        "Mock"
    }

    async fn complete(&self, _model: &str, _prompt: &str) -> Result<String, ModelError> {
        let count = self.invocation_count.fetch_add(1, Ordering::SeqCst);
        match &self.responses[count % self.responses.len()] {
            MockResponse::Success(text) => Ok(text.clone()),
            MockResponse::Failure(message) => Err(ModelError::RetriesExhausted {
                attempts: 3,
                message: message.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let client = MockModelClient::always_succeed("output");
        let result = client.complete("m", "p").await.unwrap();
        assert_eq!(result, "output");
        assert_eq!(client.invocation_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let client = MockModelClient::always_fail("boom");
        let result = client.complete("m", "p").await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_mock_cycles_responses() {
        let client = MockModelClient::new(vec![
            MockResponse::Success("first".to_string()),
            MockResponse::Success("second".to_string()),
        ]);

        assert_eq!(client.complete("m", "").await.unwrap(), "first");
        assert_eq!(client.complete("m", "").await.unwrap(), "second");
        assert_eq!(client.complete("m", "").await.unwrap(), "first");
        assert_eq!(client.invocation_count(), 3);
    }
}
