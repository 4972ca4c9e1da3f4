//! Key x model scheduling for one discovery call
//!
//! Walks keys round-robin and, per key, models in priority order until one
//! answers. When every live key is throttled the scheduler sleeps until the
//! earliest one unblocks, bounded by a cumulative wait budget. A call ends
//! without an answer only when every key is dead, the wait budget is spent,
//! or no model is reachable on any key.

use std::collections::HashSet;
use std::time::Duration;

use provider::{InferenceProvider, Prompt};
use tracing::{debug, info};

use crate::executor::{Step, execute};
use crate::pool::{KeyId, Pool};

/// Default ceiling on total sleeping within one call.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Added to every computed wait so the woken key is past its block.
const WAKE_MARGIN: Duration = Duration::from_secs(1);

/// Terminal result of one scheduling run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A model answered
    Answered { text: String, model: String },
    /// No live key left
    DailyDead,
    /// Wait budget spent while every key was throttled
    MaxWait,
    /// Every (live key, model) pair was tried without an answer
    Unreachable,
}

/// Model ladder plus wait budget, shared by every call.
#[derive(Debug, Clone)]
pub struct Scheduler {
    models: Vec<String>,
    max_wait: Option<Duration>,
}

impl Scheduler {
    /// `max_wait = None` waits as long as it takes.
    pub fn new(models: Vec<String>, max_wait: Option<Duration>) -> Self {
        Self { models, max_wait }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Drive attempts until an answer or a terminal outcome.
    pub async fn run(
        &self,
        pool: &Pool,
        provider: &dyn InferenceProvider,
        prompt: &Prompt,
    ) -> RunOutcome {
        let clock = pool.clock().clone();
        let mut tried: HashSet<(KeyId, usize)> = HashSet::new();
        let mut spent_waiting = Duration::ZERO;

        loop {
            let live = pool.live_credentials().await;
            if live.is_empty() {
                info!("no live key left");
                return RunOutcome::DailyDead;
            }

            // Live keys that still have a model to try
            let pending: Vec<KeyId> = live
                .into_iter()
                .filter(|&key| (0..self.models.len()).any(|m| !tried.contains(&(key, m))))
                .collect();
            if pending.is_empty() {
                info!(models = self.models.len(), "every key and model tried");
                return RunOutcome::Unreachable;
            }

            let Some(key) = pool.next_usable_where(|key| pending.contains(&key)).await else {
                let Some(wakeup) = pool.earliest_unblock(&pending).await else {
                    continue;
                };
                let mut sleep = wakeup.saturating_duration_since(clock.now()) + WAKE_MARGIN;
                if let Some(max_wait) = self.max_wait {
                    let remaining = max_wait.saturating_sub(spent_waiting);
                    if remaining.is_zero() {
                        info!(
                            spent_secs = spent_waiting.as_secs(),
                            "wait budget spent, giving up"
                        );
                        return RunOutcome::MaxWait;
                    }
                    sleep = sleep.min(remaining);
                }
                info!(
                    sleep_secs = sleep.as_secs(),
                    spent_secs = spent_waiting.as_secs(),
                    "all keys throttled, waiting"
                );
                clock.sleep(sleep).await;
                let counted = spent_waiting.as_secs();
                spent_waiting += sleep;
                metrics::counter!("discovery_wait_seconds_total")
                    .increment(spent_waiting.as_secs() - counted);
                continue;
            };

            let mut rotated = false;
            for (index, model) in self.models.iter().enumerate() {
                if !tried.insert((key, index)) {
                    continue;
                }
                match execute(pool, provider, key, model, prompt).await {
                    Step::Answered(text) => {
                        return RunOutcome::Answered {
                            text,
                            model: model.clone(),
                        };
                    }
                    Step::NextModel => {}
                    Step::Rotate { throttled } => {
                        // The pair stays tried; after a wait this key resumes at its next model
                        debug!(key = key.index(), model = %model, throttled, "rotating");
                        rotated = true;
                        break;
                    }
                }
            }
            if !rotated {
                debug!(key = key.index(), "models exhausted for key, rotating");
                pool.advance().await;
            }
        }
    }
}
