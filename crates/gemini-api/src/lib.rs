//! Gemini `generateContent` client
//!
//! Builds the two request shapes used for discovery (search-grounded and plain
//! JSON), sends them with one API key per call, and decodes the answer text.
//! Implements `provider::InferenceProvider` so the scheduler never sees HTTP.
//!
//! Request flow:
//! 1. `request::GenerateContentRequest::new()` renders the prompt for a shape
//! 2. `GeminiClient::generate()` POSTs it to `<base>/v1beta/models/<model>:generateContent`
//! 3. 2xx bodies are decoded by `response::GenerateContentResponse::answer_text()`
//! 4. Any other status is handed back verbatim for classification

pub mod client;
pub mod constants;
pub mod request;
pub mod response;

pub use client::GeminiClient;
pub use constants::*;
pub use request::GenerateContentRequest;
pub use response::GenerateContentResponse;
