//! Scripted `InferenceProvider` for scheduler and executor tests

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use provider::{InferenceProvider, Prompt, ProviderError, Reply, RequestShape};

type Responder = dyn Fn(&str, &str, RequestShape) -> provider::Result<Reply> + Send + Sync;

/// One recorded `generate` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub key: String,
    pub model: String,
    pub shape: RequestShape,
}

/// Provider that answers from a closure of `(key, model, shape)` and records calls.
pub struct FakeProvider {
    respond: Box<Responder>,
    calls: Mutex<Vec<Call>>,
}

impl FakeProvider {
    pub fn new(
        respond: impl Fn(&str, &str, RequestShape) -> provider::Result<Reply> + Send + Sync + 'static,
    ) -> Self {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }
}

impl InferenceProvider for FakeProvider {
    fn id(&self) -> &str {
        "fake"
    }

    fn generate<'a>(
        &'a self,
        api_key: &'a str,
        model: &'a str,
        _prompt: &'a Prompt,
        shape: RequestShape,
    ) -> Pin<Box<dyn Future<Output = provider::Result<Reply>> + Send + 'a>> {
        self.calls.lock().unwrap().push(Call {
            key: api_key.to_string(),
            model: model.to_string(),
            shape,
        });
        let reply = (self.respond)(api_key, model, shape);
        Box::pin(std::future::ready(reply))
    }
}

pub fn text(answer: &str) -> provider::Result<Reply> {
    Ok(Reply::Text(answer.to_string()))
}

pub fn status(status: u16, body: &str) -> provider::Result<Reply> {
    Ok(Reply::Status {
        status,
        body: body.to_string(),
    })
}

pub fn transport_error() -> provider::Result<Reply> {
    Err(ProviderError::Transport("connection reset".into()))
}

pub fn throttle_body(secs: u64) -> String {
    format!(
        r#"{{"error":{{"code":429,"message":"Resource has been exhausted","details":[{{"@type":"type.googleapis.com/google.rpc.RetryInfo","retryDelay":"{secs}s"}}]}}}}"#
    )
}

pub const DAILY_BODY: &str =
    r#"{"error":{"code":429,"message":"Quota exceeded for metric: generate_content_free_tier_requests, limit: 0"}}"#;

pub fn prompt() -> Prompt {
    Prompt::new("https://hackerone.com/shopify", Some("shopify".into()))
}
