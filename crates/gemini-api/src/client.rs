//! HTTP implementation of `InferenceProvider` for Gemini

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use provider::{InferenceProvider, Prompt, ProviderError, Reply, RequestShape};
use tracing::debug;

use crate::constants::{API_KEY_HEADER, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, SYSTEM_PROMPT, USER_AGENT};
use crate::request::GenerateContentRequest;
use crate::response::GenerateContentResponse;

/// Gemini client. One instance is shared by every key; the key is passed per call.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    system_prompt: String,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            system_prompt: SYSTEM_PROMPT.to_string(),
        }
    }

    /// Point the client at another host (tests, regional proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }

    async fn send(
        &self,
        api_key: &str,
        model: &str,
        prompt: &Prompt,
        shape: RequestShape,
    ) -> provider::Result<Reply> {
        let body = GenerateContentRequest::new(&self.system_prompt, prompt, shape);
        let response = self
            .http
            .post(self.endpoint(model))
            .header(API_KEY_HEADER, api_key)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(format!("{model} request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            debug!(model, status = status.as_u16(), "gemini returned error status");
            return Ok(Reply::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decoded = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| ProviderError::Decode(format!("{model} response: {e}")))?;
        decoded
            .answer_text()
            .map(Reply::Text)
            .ok_or_else(|| ProviderError::Decode(format!("{model} response has no candidate text")))
    }
}

impl InferenceProvider for GeminiClient {
    fn id(&self) -> &str {
        "gemini"
    }

    fn generate<'a>(
        &'a self,
        api_key: &'a str,
        model: &'a str,
        prompt: &'a Prompt,
        shape: RequestShape,
    ) -> Pin<Box<dyn Future<Output = provider::Result<Reply>> + Send + 'a>> {
        Box::pin(self.send(api_key, model, prompt, shape))
    }
}
