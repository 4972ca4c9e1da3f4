//! Provider abstraction for the inference service
//!
//! Defines the `InferenceProvider` trait that decouples the credential scheduler
//! from the wire protocol. The Gemini client implements it over HTTP; tests
//! implement it with scripted replies.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Classification of a non-success upstream reply, driving pool and scheduler decisions.
///
/// - `Throttled` parks the credential for `retry_after` and rotates
/// - `DailyExhausted` and `Unauthorized` retire the credential for the process lifetime
/// - `ModelUnavailable` and `Transient` move on to the next model, no pool action
/// - `CapabilityRejected` triggers the one-time plain-shape retry of the same pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorClassification {
    /// Per-minute rate limit (429 with a retry hint)
    Throttled { retry_after: Duration },
    /// Daily quota fully used (429 with "limit: 0")
    DailyExhausted,
    /// Key rejected (401/403)
    Unauthorized,
    /// Model not served for this key (404)
    ModelUnavailable,
    /// Request feature rejected by the model (400)
    CapabilityRejected,
    /// Anything else: 5xx, timeouts, unexpected statuses
    Transient,
}

/// Shape of the request body sent for one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestShape {
    /// Search-grounded request with tool flags; answer is freeform text ending in a JSON array
    Grounded,
    /// No tools, JSON response mime type; used after a model rejects `Grounded`
    Plain,
}

/// What to ask: the query subject plus an optional disambiguation hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub subject: String,
    pub hint: Option<String>,
}

impl Prompt {
    pub fn new(subject: impl Into<String>, hint: Option<String>) -> Self {
        let hint = hint.filter(|h| !h.trim().is_empty());
        Self {
            subject: subject.into(),
            hint,
        }
    }
}

/// Upstream reply for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// 2xx with the model's answer text
    Text(String),
    /// Non-success HTTP status with the raw error body
    Status { status: u16, body: String },
}

/// Errors that prevent an attempt from producing any reply.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("undecodable response: {0}")]
    Decode(String),
}

/// Result alias for provider operations.
pub type Result<T> = std::result::Result<T, ProviderError>;

/// One inference backend reachable with an API key.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn InferenceProvider>`).
pub trait InferenceProvider: Send + Sync {
    /// Identifier for logging (e.g. "gemini")
    fn id(&self) -> &str;

    /// Send one request for `model` authenticated with `api_key`.
    ///
    /// Non-success statuses are returned as `Reply::Status`, not as errors, so
    /// the caller can classify them.
    fn generate<'a>(
        &'a self,
        api_key: &'a str,
        model: &'a str,
        prompt: &'a Prompt,
        shape: RequestShape,
    ) -> Pin<Box<dyn Future<Output = Result<Reply>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_drops_blank_hint() {
        let prompt = Prompt::new("https://hackerone.com/shopify", Some("   ".into()));
        assert_eq!(prompt.hint, None);

        let prompt = Prompt::new("https://hackerone.com/shopify", Some("shopify".into()));
        assert_eq!(prompt.hint.as_deref(), Some("shopify"));
    }

    #[test]
    fn provider_error_display() {
        let err = ProviderError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport error: connection refused");
        let err = ProviderError::Decode("missing candidates".into());
        assert!(err.to_string().contains("missing candidates"));
    }
}
