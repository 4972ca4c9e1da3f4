//! End-to-end discovery: ask the model, then confirm candidates on the registry

use std::sync::Arc;
use std::time::Duration;

use gemini_pool::{DEFAULT_MAX_WAIT, Pool, RunOutcome, Scheduler};
use provider::{InferenceProvider, Prompt};
use tracing::{debug, info, instrument, warn};

use crate::extract::extract_candidates;
use crate::outcome::Outcome;
use crate::verify::{Verdict, Verify};

/// Profile URL prefix for confirmed names.
pub const DEFAULT_PROFILE_BASE_URL: &str = "https://hub.docker.com/u/";

const MIN_NAME_LEN: usize = 2;
const MAX_NAME_LEN: usize = 64;

/// Runs discovery calls against a shared key pool.
pub struct Discoverer {
    pool: Arc<Pool>,
    provider: Arc<dyn InferenceProvider>,
    scheduler: Scheduler,
    profile_base_url: String,
    env_fallback: bool,
}

pub struct DiscovererBuilder {
    pool: Arc<Pool>,
    provider: Arc<dyn InferenceProvider>,
    models: Vec<String>,
    max_wait: Option<Duration>,
    profile_base_url: String,
    env_fallback: bool,
}

impl DiscovererBuilder {
    /// Model ladder, cheapest first.
    pub fn models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Ceiling on total sleeping per call; `None` waits indefinitely.
    pub fn max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn profile_base_url(mut self, url: impl Into<String>) -> Self {
        self.profile_base_url = url.into();
        self
    }

    /// Do not load `GEMINI_API_KEYS` when the pool is empty.
    pub fn without_env_fallback(mut self) -> Self {
        self.env_fallback = false;
        self
    }

    pub fn build(self) -> Discoverer {
        Discoverer {
            pool: self.pool,
            provider: self.provider,
            scheduler: Scheduler::new(self.models, self.max_wait),
            profile_base_url: self.profile_base_url,
            env_fallback: self.env_fallback,
        }
    }
}

impl Discoverer {
    pub fn builder(pool: Arc<Pool>, provider: Arc<dyn InferenceProvider>) -> DiscovererBuilder {
        DiscovererBuilder {
            pool,
            provider,
            models: gemini_api::DEFAULT_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            max_wait: Some(DEFAULT_MAX_WAIT),
            profile_base_url: DEFAULT_PROFILE_BASE_URL.to_string(),
            env_fallback: true,
        }
    }

    pub fn pool(&self) -> &Arc<Pool> {
        &self.pool
    }

    pub fn profile_url(&self, name: &str) -> String {
        format!("{}{name}", self.profile_base_url)
    }

    /// Discover the registry organization for `subject`.
    ///
    /// Always returns an outcome; upstream failures are absorbed by the
    /// scheduler and surface only as `daily_dead`, `max_wait` or `error`.
    pub async fn discover(&self, subject: &str, hint: Option<&str>, verify: &dyn Verify) -> Outcome {
        let discovery_id = format!("disc_{}", uuid::Uuid::new_v4().as_simple());
        let outcome = self.run(discovery_id, subject, hint, verify).await;
        metrics::counter!("discovery_outcomes_total", "outcome" => outcome.as_str()).increment(1);
        outcome
    }

    #[instrument(skip_all, fields(discovery_id = %discovery_id, subject = %subject))]
    async fn run(
        &self,
        discovery_id: String,
        subject: &str,
        hint: Option<&str>,
        verify: &dyn Verify,
    ) -> Outcome {
        if self.env_fallback && self.pool.is_empty().await {
            self.pool.configure_from_env().await;
        }
        if self.pool.is_empty().await {
            warn!("no API keys configured");
            return Outcome::NoKeys;
        }

        let prompt = Prompt::new(subject, hint.map(str::to_string));
        let text = match self.scheduler.run(&self.pool, self.provider.as_ref(), &prompt).await {
            RunOutcome::Answered { text, model } => {
                debug!(model = %model, "model answered");
                text
            }
            RunOutcome::DailyDead => return Outcome::DailyDead,
            RunOutcome::MaxWait => return Outcome::MaxWait,
            RunOutcome::Unreachable => return Outcome::Error,
        };

        let candidates = sanitize_candidates(&extract_candidates(&text));
        info!(candidates = ?candidates, "verifying candidates");

        for name in candidates {
            let verdict = verify.verify(&name).await;
            metrics::counter!("discovery_verifications_total", "verdict" => verdict.as_str())
                .increment(1);
            match verdict {
                Verdict::Present => {
                    info!(name = %name, "candidate confirmed");
                    let url = self.profile_url(&name);
                    return Outcome::Found { name, url };
                }
                Verdict::Absent => debug!(name = %name, "candidate absent"),
                Verdict::Inconclusive => {
                    debug!(name = %name, "candidate lookup inconclusive, skipping")
                }
            }
        }
        Outcome::NotFound
    }
}

/// Normalize raw candidates to registry names, keeping confidence order.
///
/// Lowercases, strips everything outside `[a-z0-9-]`, drops names outside
/// 2..=64 characters and repeated names.
pub fn sanitize_candidates(raw: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for candidate in raw {
        let name: String = candidate
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
            .collect();
        if (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.len()) && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
