//! Model endpoint clients.
//!
//! Every generation stage is one request/response round trip against a
//! text-generation endpoint. The endpoint speaks Ollama's generate protocol:
//! POST `{model, prompt, stream: true}`, answer streamed as NDJSON records.
//!
//! The client is selected once at startup; tests swap in the mock.

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub(crate) use http::HttpModelClient;

use async_trait::async_trait;

/// Errors from a model round trip.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ModelError {
    /// Every retry failed; carries the last transport error.
    #[error("model request failed after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// The endpoint answered, but with no usable content.
    #[error("model returned no usable content")]
    EmptyResponse,
}

/// A client able to complete a prompt against a named model.
#[async_trait]
pub(crate) trait ModelClient: Send + Sync {
    /// Returns the client name for display.
    fn name(&self) -> &'static str;

    /// Sends `prompt` to `model` and returns the reassembled response text.
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retries_exhausted_display() {
        let err = ModelError::RetriesExhausted {
            attempts: 3,
            message: "connection refused".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "model request failed after 3 attempts: connection refused"
        );
    }

    #[test]
    fn test_empty_response_display() {
        assert_eq!(
            ModelError::EmptyResponse.to_string(),
            "model returned no usable content"
        );
    }
}
