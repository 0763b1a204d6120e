//! Streaming HTTP model client.
//!
//! Posts a generate request and consumes the NDJSON answer incrementally,
//! decoding records as chunks arrive. Transient failures are retried a fixed
//! number of times with a fixed delay before the request is given up.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ModelClient, ModelError};
use crate::config::ModelConfig;
use crate::decode::StreamAccumulator;

/// Model client backed by an HTTP generate endpoint.
pub(crate) struct HttpModelClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpModelClient {
    /// Builds a client from configuration, resolving the API key once.
    pub fn new(config: &ModelConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.resolve_api_key(),
            max_retries: config.max_retries.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        })
    }

    /// One request/response round trip; errors are transport-level strings.
    async fn request_once(&self, model: &str, prompt: &str) -> Result<String, String> {
        let payload = build_payload(model, prompt);

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| format!("request to {} failed: {e}", self.endpoint))?
            .error_for_status()
            .map_err(|e| e.to_string())?;

        let mut accumulator = StreamAccumulator::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| format!("response stream broke: {e}"))?;
            accumulator.push_chunk(&bytes);
        }

        let malformed = accumulator.malformed();
        if malformed > 0 {
            debug!("{malformed} malformed stream records skipped");
        }

        Ok(accumulator.finish())
    }
}

#[async_trait]
impl ModelClient for HttpModelClient {
    fn name(&self) -> &'static str {
        "Http"
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, ModelError> {
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                debug!(
                    "Retrying model request (attempt {attempt}/{}) after {}s",
                    self.max_retries,
                    self.retry_delay.as_secs()
                );
                tokio::time::sleep(self.retry_delay).await;
            }

            match self.request_once(model, prompt).await {
                Ok(text) => return Ok(text),
                Err(message) => {
                    warn!("Model request failed: {message}");
                    last_error = message;
                }
            }
        }

        Err(ModelError::RetriesExhausted {
            attempts: self.max_retries,
            message: last_error,
        })
    }
}

/// Wire payload for the generate endpoint.
fn build_payload(model: &str, prompt: &str) -> serde_json::Value {
    json!({
        "model": model,
        "prompt": prompt,
        "stream": true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let payload = build_payload("llama3.1:8b", "write a haiku");
        assert_eq!(payload["model"], "llama3.1:8b");
        assert_eq!(payload["prompt"], "write a haiku");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload.as_object().unwrap().len(), 3);
    }

    #[test]
    fn test_client_name() {
        let client = HttpModelClient::new(&ModelConfig::default()).unwrap();
        assert_eq!(client.name(), "Http");
    }

    #[test]
    fn test_retries_floor_at_one() {
        let config = ModelConfig {
            max_retries: 0,
            ..ModelConfig::default()
        };
        let client = HttpModelClient::new(&config).unwrap();
        assert_eq!(client.max_retries, 1);
    }
}
