//! Registry organization discovery
//!
//! Asks the inference service which registry organization belongs to a
//! subject, extracts the candidate names from its answer and confirms them one
//! by one through a caller-supplied `Verify`.
//!
//! Call flow:
//! 1. Empty pool → optional env fallback, else `no_keys`
//! 2. `gemini_pool::Scheduler` runs attempts until an answer or a terminal outcome
//! 3. `extract::extract_candidates()` pulls the answer list out of the text
//! 4. `discover::sanitize_candidates()` normalizes names, keeping model confidence order
//! 5. First `Verdict::Present` → `found`; otherwise `not_found`

pub mod discover;
pub mod extract;
pub mod outcome;
pub mod verify;

pub use discover::{DEFAULT_PROFILE_BASE_URL, Discoverer, DiscovererBuilder, sanitize_candidates};
pub use extract::extract_candidates;
pub use outcome::{Action, Outcome};
pub use verify::{Verdict, Verify};
