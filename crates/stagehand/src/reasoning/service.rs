//! The external reasoning service seam.
//!
//! Everything that needs analysis text goes through [`ReasoningService`].
//! Errors propagate unchanged: no retry, no rate limiting, no partial
//! results at this layer. Wrap a service in
//! [`Retrying`](super::retry::Retrying) where bounded retry is wanted.

use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tracing::debug;

/// Boxed completion future returned by [`ReasoningService::complete`].
pub type CompletionFuture<'a> = BoxFuture<'a, Result<String, String>>;

/// A collaborator that turns a prompt into free-form analysis text.
pub trait ReasoningService: Send + Sync {
    fn complete(&self, prompt: &str) -> CompletionFuture<'_>;
}

/// HTTP-backed reasoning service.
///
/// POSTs `{"prompt": ...}` to the configured endpoint and returns either the
/// `output` field of a JSON response or the raw body. Non-2xx responses and
/// transport errors become `Err` with the status and body preserved.
pub struct HttpReasoningService {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpReasoningService {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .user_agent("stagehand/0.1")
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("failed to build HTTP client: {e}"))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: None,
        })
    }

    /// Send a bearer token with each request.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

impl ReasoningService for HttpReasoningService {
    fn complete(&self, prompt: &str) -> CompletionFuture<'_> {
        let prompt = prompt.to_string();
        Box::pin(async move {
            debug!("reasoning request: {} chars", prompt.len());
            let start = Instant::now();

            let mut request = self
                .client
                .post(&self.endpoint)
                .json(&serde_json::json!({ "prompt": prompt }));
            if let Some(ref key) = self.api_key {
                request = request.header("Authorization", format!("Bearer {key}"));
            }

            let resp = request
                .send()
                .await
                .map_err(|e| format!("request failed: {e}"))?;
            let status = resp.status();
            let text = resp
                .text()
                .await
                .map_err(|e| format!("failed to read response: {e}"))?;

            debug!(
                "reasoning response: HTTP {status} in {:.1}s ({} bytes)",
                start.elapsed().as_secs_f64(),
                text.len(),
            );

            if !status.is_success() {
                return Err(format!("reasoning service HTTP {status}: {text}"));
            }

            // Structured responses carry the text in `output`; anything else
            // is treated as free-form text.
            if let Ok(value) = serde_json::from_str::<serde_json::Value>(&text)
                && let Some(output) = value.get("output").and_then(|o| o.as_str())
            {
                return Ok(output.to_string());
            }
            Ok(text)
        })
    }
}

/// Closure-backed service, for deterministic local runs and tests.
///
/// # Example
///
/// ```
/// use stagehand::reasoning::{FnService, ReasoningService};
///
/// let service = FnService::new(|prompt| Ok(format!("analysis of: {prompt}")));
/// ```
pub struct FnService<F> {
    f: F,
}

impl<F> FnService<F>
where
    F: Fn(&str) -> Result<String, String> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ReasoningService for FnService<F>
where
    F: Fn(&str) -> Result<String, String> + Send + Sync,
{
    fn complete(&self, prompt: &str) -> CompletionFuture<'_> {
        let result = (self.f)(prompt);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fn_service_passes_prompt_through() {
        let service = FnService::new(|prompt| Ok(format!("echo: {prompt}")));
        let out = service.complete("hello").await.unwrap();
        assert_eq!(out, "echo: hello");
    }

    #[tokio::test]
    async fn fn_service_propagates_errors() {
        let service = FnService::new(|_| Err("reasoning service HTTP 503: down".to_string()));
        let err = service.complete("hello").await.unwrap_err();
        assert!(err.contains("HTTP 503"));
    }
}
