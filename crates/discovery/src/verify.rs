//! Registry lookup seam
//!
//! The orchestrator never talks to the registry itself. Callers pass a
//! `Verify` implementation: an HTTP client in the runner, a closure in tests.

use std::future::Future;
use std::pin::Pin;

/// Result of looking up one candidate name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Name exists on the registry
    Present,
    /// Registry says the name does not exist
    Absent,
    /// Lookup failed or was ambiguous; not evidence of absence
    Inconclusive,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Present => "present",
            Verdict::Absent => "absent",
            Verdict::Inconclusive => "inconclusive",
        }
    }
}

impl From<Option<bool>> for Verdict {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Verdict::Present,
            Some(false) => Verdict::Absent,
            None => Verdict::Inconclusive,
        }
    }
}

/// Checks whether a candidate name exists on the registry.
pub trait Verify: Send + Sync {
    fn verify<'a>(&'a self, name: &'a str) -> Pin<Box<dyn Future<Output = Verdict> + Send + 'a>>;
}

/// Synchronous closures verify directly.
impl<F> Verify for F
where
    F: Fn(&str) -> Verdict + Send + Sync,
{
    fn verify<'a>(&'a self, name: &'a str) -> Pin<Box<dyn Future<Output = Verdict> + Send + 'a>> {
        Box::pin(std::future::ready(self(name)))
    }
}
