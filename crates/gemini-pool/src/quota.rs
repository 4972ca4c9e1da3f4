//! Rate-limit detection for Gemini API responses
//!
//! A 429 from Gemini means one of two things. A per-minute throttle carries a
//! `RetryInfo` detail with a `retryDelay` like `"57s"`; the key is parked for
//! that long. A used-up daily quota names the quota with `limit: 0` in the
//! error message; the key is retired for the rest of the run.

use std::time::Duration;

use provider::ErrorClassification;

/// Delay used when a 429 carries no readable retry hint.
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 65;

/// Parsed 429 body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimit {
    pub daily_exhausted: bool,
    pub retry_delay_secs: u64,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            daily_exhausted: false,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
        }
    }
}

/// Parse a 429 error body. Never fails: anything unreadable yields the defaults.
pub fn parse_429(body: &str) -> RateLimit {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return RateLimit::default();
    };
    let error = &value["error"];

    let daily_exhausted = error["message"]
        .as_str()
        .is_some_and(mentions_zero_limit);

    let retry_delay_secs = error["details"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|detail| {
            detail["@type"]
                .as_str()
                .is_some_and(|t| t.ends_with("RetryInfo"))
        })
        .find_map(|detail| detail["retryDelay"].as_str().and_then(leading_secs))
        .unwrap_or(DEFAULT_RETRY_DELAY_SECS);

    RateLimit {
        daily_exhausted,
        retry_delay_secs,
    }
}

/// True if `message` contains `limit: 0` (any case, any spacing after the colon).
fn mentions_zero_limit(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower
        .match_indices("limit:")
        .any(|(at, pat)| lower[at + pat.len()..].trim_start().starts_with('0'))
}

/// Leading integer of a duration string such as `"57s"` or `"12.5s"`.
fn leading_secs(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Classify an upstream error by HTTP status and response body.
///
/// 429 is split by `parse_429`. 401/403 reject the key, 404 means the model is
/// not served for it and 400 means the request shape was refused. Everything
/// else is transient.
pub fn classify_status(status: u16, body: &str) -> ErrorClassification {
    match status {
        429 => {
            let limit = parse_429(body);
            if limit.daily_exhausted {
                ErrorClassification::DailyExhausted
            } else {
                ErrorClassification::Throttled {
                    retry_after: Duration::from_secs(limit.retry_delay_secs),
                }
            }
        }
        401 | 403 => ErrorClassification::Unauthorized,
        404 => ErrorClassification::ModelUnavailable,
        400 => ErrorClassification::CapabilityRejected,
        _ => ErrorClassification::Transient,
    }
}
