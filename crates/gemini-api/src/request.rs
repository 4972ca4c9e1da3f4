//! `generateContent` request bodies
//!
//! The grounded shape enables the Google Search tool; `responseMimeType` must
//! not be set while tools are active. The plain shape drops tools and asks for
//! a JSON response instead, for models that reject the search tool with 400.

use provider::{Prompt, RequestShape};
use serde::Serialize;

use crate::constants::{MAX_OUTPUT_TOKENS, TEMPERATURE};

/// Serialized body of one `generateContent` call.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

/// Serializes as `{}`
#[derive(Debug, Clone, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

impl GenerateContentRequest {
    /// Build the body for `prompt` in the given shape.
    pub fn new(system_prompt: &str, prompt: &Prompt, shape: RequestShape) -> Self {
        let (tools, response_mime_type) = match shape {
            RequestShape::Grounded => (
                Some(vec![Tool {
                    google_search: GoogleSearch {},
                }]),
                None,
            ),
            RequestShape::Plain => (None, Some("application/json")),
        };

        Self {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: user_text(prompt),
                }],
            }],
            tools,
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
                response_mime_type,
            },
        }
    }
}

/// User turn text: the subject, plus the identifier hint when one is known.
pub fn user_text(prompt: &Prompt) -> String {
    let mut text = format!("Bug bounty program URL: {}", prompt.subject);
    if let Some(hint) = &prompt.hint {
        text.push_str("\nExtracted company identifier: ");
        text.push_str(hint);
    }
    text
}
