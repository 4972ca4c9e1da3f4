//! Key pool state and round-robin key selection
//!
//! The pool holds every configured API key with its throttle window and dead
//! flag. Keys are selected round-robin from a cursor that only moves on a
//! rotation decision (park, kill, explicit advance) or when the scan steps
//! over an unusable key.
//!
//! Throttle windows expire on their own: a parked key becomes usable again as
//! soon as `now >= blocked_until`. A dead key never comes back until the pool
//! is reconfigured.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::Secret;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::clock::Clock;

/// Extra time added to every upstream retry hint to absorb clock skew.
pub const PARK_MARGIN: Duration = Duration::from_secs(2);

/// Environment variables read by `configure_from_env`, in priority order.
pub const KEYS_ENV_VARS: &[&str] = &["GEMINI_API_KEYS", "GEMINI_API_KEY"];

/// Position of a key in the current pool configuration.
///
/// Only meaningful until the next `configure`; operations on an id that is out
/// of range are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyId(usize);

impl KeyId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Runtime status of a pool key.
///
/// Transitions:
/// - Available → Throttled (per-minute 429, parked)
/// - Available / Throttled → Dead (daily quota exhausted, or key rejected)
/// - Throttled → Available (window expired)
/// - any → Available (pool reconfigured)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyStatus {
    Available,
    Throttled { until: Instant },
    Dead,
}

impl KeyStatus {
    /// Status label for health/logging.
    pub fn label(&self) -> &'static str {
        match self {
            KeyStatus::Available => "available",
            KeyStatus::Throttled { .. } => "throttled",
            KeyStatus::Dead => "dead",
        }
    }
}

struct KeyEntry {
    secret: Secret<String>,
    blocked_until: Option<Instant>,
    dead: bool,
}

impl KeyEntry {
    fn new(key: String) -> Self {
        Self {
            secret: Secret::new(key),
            blocked_until: None,
            dead: false,
        }
    }

    fn status(&self, now: Instant) -> KeyStatus {
        if self.dead {
            return KeyStatus::Dead;
        }
        match self.blocked_until {
            Some(until) if now < until => KeyStatus::Throttled { until },
            _ => KeyStatus::Available,
        }
    }
}

#[derive(Default)]
struct PoolState {
    keys: Vec<KeyEntry>,
    cursor: usize,
}

impl PoolState {
    fn rotate(&mut self) {
        self.cursor = (self.cursor + 1) % self.keys.len().max(1);
    }
}

/// API key pool shared by every discovery call of a run.
///
/// All state sits behind one `RwLock`, so the cursor and per-key state are
/// always updated together. Time is read through the injected `Clock`.
pub struct Pool {
    state: RwLock<PoolState>,
    clock: Arc<dyn Clock>,
}

impl Pool {
    /// Create an empty pool. Call `configure` before discovering.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(PoolState::default()),
            clock,
        }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Replace every key and reset all throttle/dead state and the cursor.
    ///
    /// Entries are trimmed, blank entries dropped and duplicates collapsed
    /// (first occurrence wins). Returns the number of keys now in the pool.
    pub async fn configure<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let entries: Vec<KeyEntry> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty() && seen.insert(k.clone()))
            .map(KeyEntry::new)
            .collect();

        let mut state = self.state.write().await;
        state.keys = entries;
        state.cursor = 0;
        info!(keys = state.keys.len(), "key pool configured");
        state.keys.len()
    }

    /// Populate the pool from `GEMINI_API_KEYS` (or `GEMINI_API_KEY`).
    ///
    /// The first variable that is set and non-blank wins. Leaves the pool
    /// untouched and returns 0 when neither is set.
    pub async fn configure_from_env(&self) -> usize {
        let raw = KEYS_ENV_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|value| !value.trim().is_empty());
        match raw {
            Some(raw) => {
                debug!("loading keys from environment");
                self.configure(parse_key_list(&raw)).await
            }
            None => 0,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.keys.is_empty()
    }

    /// Every key that is not dead (it may still be throttled).
    pub async fn live_credentials(&self) -> Vec<KeyId> {
        let state = self.state.read().await;
        state
            .keys
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.dead)
            .map(|(i, _)| KeyId(i))
            .collect()
    }

    /// True if at least one key is not dead.
    pub async fn has_live(&self) -> bool {
        self.state.read().await.keys.iter().any(|entry| !entry.dead)
    }

    /// True if at least one key is neither dead nor throttled right now.
    pub async fn is_immediately_usable(&self) -> bool {
        let now = self.clock.now();
        let state = self.state.read().await;
        state
            .keys
            .iter()
            .any(|entry| entry.status(now) == KeyStatus::Available)
    }

    /// Block a key until `now + delay + PARK_MARGIN` and rotate past it.
    pub async fn park(&self, id: KeyId, delay: Duration) {
        let until = self.clock.now() + delay + PARK_MARGIN;
        let mut state = self.state.write().await;
        let Some(entry) = state.keys.get_mut(id.0) else {
            return;
        };
        entry.blocked_until = Some(until);
        info!(
            key = %entry.secret.fingerprint(),
            delay_secs = delay.as_secs(),
            "key throttled, parked"
        );
        metrics::counter!("discovery_keys_parked_total").increment(1);
        state.rotate();
    }

    /// Retire a key for the rest of the process lifetime and rotate past it.
    pub async fn kill(&self, id: KeyId) {
        let mut state = self.state.write().await;
        let Some(entry) = state.keys.get_mut(id.0) else {
            return;
        };
        if !entry.dead {
            entry.dead = true;
            warn!(key = %entry.secret.fingerprint(), "key retired for the rest of the run");
            metrics::counter!("discovery_keys_killed_total").increment(1);
        }
        state.rotate();
    }

    /// Move the cursor one position forward.
    pub async fn advance(&self) {
        self.state.write().await.rotate();
    }

    /// Next available key, scanning round-robin from the cursor.
    pub async fn next_usable(&self) -> Option<KeyId> {
        self.next_usable_where(|_| true).await
    }

    /// Next available key accepted by `accept`, scanning round-robin from the cursor.
    ///
    /// Visits at most one full cycle. The cursor moves past every key that is
    /// skipped and stays on the key that is returned.
    pub async fn next_usable_where(&self, accept: impl Fn(KeyId) -> bool) -> Option<KeyId> {
        let now = self.clock.now();
        let mut state = self.state.write().await;
        let n = state.keys.len();
        for _ in 0..n {
            let idx = state.cursor % n;
            let id = KeyId(idx);
            if state.keys[idx].status(now) == KeyStatus::Available && accept(id) {
                return Some(id);
            }
            state.rotate();
        }
        None
    }

    /// Earliest `blocked_until` among the given keys that are still live.
    ///
    /// A live key that was never parked counts as unblocked now. `None` when
    /// none of the keys is live.
    pub async fn earliest_unblock(&self, among: &[KeyId]) -> Option<Instant> {
        let now = self.clock.now();
        let state = self.state.read().await;
        among
            .iter()
            .filter_map(|id| state.keys.get(id.0))
            .filter(|entry| !entry.dead)
            .map(|entry| entry.blocked_until.unwrap_or(now))
            .min()
    }

    /// Clone of the key secret, for building a request.
    pub async fn secret(&self, id: KeyId) -> Option<Secret<String>> {
        self.state
            .read()
            .await
            .keys
            .get(id.0)
            .map(|entry| entry.secret.clone())
    }

    /// Log-safe label for a key.
    pub async fn fingerprint(&self, id: KeyId) -> String {
        self.state
            .read()
            .await
            .keys
            .get(id.0)
            .map(|entry| entry.secret.fingerprint())
            .unwrap_or_else(|| format!("#{}", id.0))
    }

    pub async fn status(&self, id: KeyId) -> Option<KeyStatus> {
        let now = self.clock.now();
        self.state
            .read()
            .await
            .keys
            .get(id.0)
            .map(|entry| entry.status(now))
    }

    /// Pool health summary for run reports.
    ///
    /// Status mapping: all available → healthy, some available → degraded,
    /// some live but all throttled → throttled, none live → exhausted.
    pub async fn health(&self) -> serde_json::Value {
        let now = self.clock.now();
        let state = self.state.read().await;

        let mut keys = Vec::new();
        let mut available = 0usize;
        let mut throttled = 0usize;
        let mut dead = 0usize;

        for entry in &state.keys {
            let status = entry.status(now);
            match status {
                KeyStatus::Available => available += 1,
                KeyStatus::Throttled { .. } => throttled += 1,
                KeyStatus::Dead => dead += 1,
            }
            let mut key = serde_json::json!({
                "key": entry.secret.fingerprint(),
                "status": status.label(),
            });
            if let KeyStatus::Throttled { until } = status {
                key["throttle_remaining_secs"] = (until - now).as_secs().into();
            }
            keys.push(key);
        }

        let total = state.keys.len();
        let pool_status = if total > 0 && available == total {
            "healthy"
        } else if available > 0 {
            "degraded"
        } else if throttled > 0 {
            "throttled"
        } else {
            "exhausted"
        };

        serde_json::json!({
            "status": pool_status,
            "keys_total": total,
            "keys_available": available,
            "keys_throttled": throttled,
            "keys_dead": dead,
            "keys": keys,
        })
    }
}

/// Split a comma/newline separated key list, dropping blanks.
pub fn parse_key_list(raw: &str) -> Vec<String> {
    raw.split([',', '\n'])
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
