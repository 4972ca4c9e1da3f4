//! Gemini API key pool and request scheduling
//!
//! Owns the configured API keys, decides which (key, model) pair to try next
//! and classifies every reply into a pool action. Keys come and go during a
//! run only through the classification of upstream replies.
//!
//! Key lifecycle:
//! 1. `Pool::configure` loads keys → every key `Available`
//! 2. Scheduler picks the next available key round-robin, then walks models in priority order
//! 3. 429 with a retry hint → key parked `Throttled` for hint + 2s
//! 4. 429 with `limit: 0`, or 401/403 → key `Dead` until the pool is reconfigured
//! 5. Throttle window expires → key `Available` again
//! 6. Every live key throttled → scheduler sleeps until the earliest one unblocks, within the wait budget

pub mod clock;
pub mod executor;
pub mod pool;
pub mod quota;
pub mod scheduler;

#[cfg(test)]
mod testing;

pub use clock::{Clock, ManualClock, SystemClock};
pub use executor::{Step, execute};
pub use pool::{KeyId, KeyStatus, Pool, parse_key_list};
pub use quota::{RateLimit, classify_status, parse_429};
pub use scheduler::{DEFAULT_MAX_WAIT, RunOutcome, Scheduler};
