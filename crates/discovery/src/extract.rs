//! Candidate extraction from freeform model output
//!
//! Search-grounded answers interleave prose and citation markers (`[1]`,
//! `[2]`) with the actual answer, a JSON array of strings on the last line.
//! Every flat bracket span is tried; the last one that is a list of strings
//! wins, so integer citation arrays can never displace the answer.

/// Extract the answer list from `text`. Never fails; no answer is an empty list.
pub fn extract_candidates(text: &str) -> Vec<String> {
    let mut best = None;
    for span in flat_spans(text) {
        if let Some(list) = parse_string_list(span) {
            best = Some(list);
        }
    }
    if let Some(list) = best {
        return list;
    }

    // Nested or bracket-bearing answers: first `[` to last `]`
    match (text.find('['), text.rfind(']')) {
        (Some(start), Some(end)) if start < end => {
            parse_string_list(&text[start..=end]).unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

/// Every `[...]` span with no bracket inside, left to right.
fn flat_spans(text: &str) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut open = None;
    for (i, c) in text.char_indices() {
        match c {
            '[' => open = Some(i),
            ']' => {
                if let Some(start) = open.take() {
                    spans.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }
    spans
}

/// Parse `span` as a JSON list whose elements are all strings.
///
/// Single-quoted lists (`['a', 'b']`) are accepted when the span holds no
/// double quote at all.
fn parse_string_list(span: &str) -> Option<Vec<String>> {
    if let Ok(list) = serde_json::from_str::<Vec<String>>(span) {
        return Some(list);
    }
    if span.contains('\'') && !span.contains('"') {
        return serde_json::from_str(&span.replace('\'', "\"")).ok();
    }
    None
}
