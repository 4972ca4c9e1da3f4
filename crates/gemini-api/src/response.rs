//! `generateContent` response decoding

use serde::Deserialize;

/// The subset of a successful response the discovery flow reads.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, trimmed.
    ///
    /// `None` when the response carries no candidate text (e.g. blocked by
    /// safety filters).
    pub fn answer_text(&self) -> Option<String> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_ref()
            .map(|t| t.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_text_reads_first_candidate_part() {
        let json = r#"{"candidates":[{"content":{"parts":[{"text":"  Sources [1].\n[\"shopify\"]\n"}],"role":"model"}}]}"#;
        let response: GenerateContentResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.answer_text().as_deref(),
            Some("Sources [1].\n[\"shopify\"]")
        );
    }

    #[test]
    fn answer_text_missing_candidates_is_none() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert_eq!(response.answer_text(), None);
    }

    #[test]
    fn answer_text_candidate_without_content_is_none() {
        let response: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(response.answer_text(), None);
    }
}
