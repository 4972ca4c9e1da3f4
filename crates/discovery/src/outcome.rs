//! Discovery outcomes and what the caller should do with each

use std::fmt;

/// Terminal result of one discovery call. Exactly one per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A candidate was confirmed on the registry
    Found { name: String, url: String },
    /// No candidate, or every candidate was absent or inconclusive
    NotFound,
    /// Every key is retired for the day
    DailyDead,
    /// Every key stayed throttled past the wait budget
    MaxWait,
    /// No key configured
    NoKeys,
    /// No model answered on any key
    Error,
}

/// Caller behavior for an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Record,
    RetryNextRun,
    RetryTomorrow,
    RetrySoon,
    ConfigureKeys,
    Escalate,
}

impl Outcome {
    /// Stable status code used in output and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Found { .. } => "found",
            Outcome::NotFound => "not_found",
            Outcome::DailyDead => "daily_dead",
            Outcome::MaxWait => "max_wait",
            Outcome::NoKeys => "no_keys",
            Outcome::Error => "error",
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Outcome::Found { .. } => Action::Record,
            Outcome::NotFound => Action::RetryNextRun,
            Outcome::DailyDead => Action::RetryTomorrow,
            Outcome::MaxWait => Action::RetrySoon,
            Outcome::NoKeys => Action::ConfigureKeys,
            Outcome::Error => Action::Escalate,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Outcome::Found { .. })
    }

    /// Profile URL when found.
    pub fn url(&self) -> Option<&str> {
        match self {
            Outcome::Found { url, .. } => Some(url),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Action {
    pub fn describe(&self) -> &'static str {
        match self {
            Action::Record => "record the profile",
            Action::RetryNextRun => "leave unresolved, retry on a later run",
            Action::RetryTomorrow => "daily quota gone, retry after the quota resets",
            Action::RetrySoon => "keys throttled, retry in a few minutes",
            Action::ConfigureKeys => "set GEMINI_API_KEYS or gemini.api_keys_file",
            Action::Escalate => "no model reachable on any key, check models and key permissions",
        }
    }
}
