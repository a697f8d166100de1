//! Generation client boundary.
//!
//! The pipeline only needs "prompt in, text out". Two backends implement
//! [`GenerationClient`]: a user-configured local command (prompt on stdin,
//! text on stdout) and the Gemini `generateContent` HTTP API. Both honor a
//! per-call timeout and a [`CancelToken`], reported as distinct error kinds
//! so callers can tell them apart from provider failures.
mod command;
mod gemini;
#[cfg(test)]
pub(crate) mod testing;

pub use command::CommandClient;
pub use gemini::{GeminiClient, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared flag a caller flips to abandon an in-flight generation.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One generation call.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    /// Short label for logs (`strategy`, `combined`, ...).
    pub label: &'a str,
    pub prompt: &'a str,
    pub timeout: Option<Duration>,
    pub cancel: Option<&'a CancelToken>,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(label: &'a str, prompt: &'a str) -> Self {
        Self {
            label,
            prompt,
            timeout: None,
            cancel: None,
        }
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(CancelToken::is_cancelled)
    }
}

/// Failures from the text-generation capability.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("generation cancelled")]
    Cancelled,

    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("malformed request: {0}")]
    InvalidRequest(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GenerationError {
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Timeout { .. } => "timeout",
            GenerationError::Cancelled => "cancelled",
            GenerationError::Authentication(_) => "authentication",
            GenerationError::RateLimited(_) => "rate_limited",
            GenerationError::InvalidRequest(_) => "invalid_request",
            GenerationError::Unavailable(_) => "unavailable",
            GenerationError::Network(_) => "network",
            GenerationError::Provider(_) => "provider",
            GenerationError::EmptyResponse => "empty_response",
            GenerationError::Configuration(_) => "configuration",
        }
    }

    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout { .. }
                | GenerationError::RateLimited(_)
                | GenerationError::Unavailable(_)
                | GenerationError::Network(_)
                | GenerationError::EmptyResponse
        )
    }
}

/// Text-generation capability consumed by the orchestrator.
pub trait GenerationClient {
    /// Submit a prompt and return the generated text.
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError>;
}

impl<C: GenerationClient + ?Sized> GenerationClient for Box<C> {
    fn generate(&self, request: &GenerationRequest<'_>) -> Result<String, GenerationError> {
        (**self).generate(request)
    }
}

/// Trim provider output; blank output is an error.
pub(crate) fn normalize_output(text: &str) -> Result<String, GenerationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_output_trims_and_rejects_blank() {
        assert_eq!(normalize_output("  texto \n").expect("text"), "texto");
        assert!(matches!(
            normalize_output(" \n\t"),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        let mut request = GenerationRequest::new("strategy", "prompt");
        request.cancel = Some(&clone);
        assert!(!request.is_cancelled());
        token.cancel();
        assert!(request.is_cancelled());
    }

    #[test]
    fn timeout_is_distinct_from_provider_errors() {
        let timeout = GenerationError::Timeout { elapsed_ms: 10 };
        let provider = GenerationError::Provider("blocked".to_string());
        assert_ne!(timeout.kind(), provider.kind());
        assert!(timeout.is_retryable());
        assert!(!provider.is_retryable());
    }
}
