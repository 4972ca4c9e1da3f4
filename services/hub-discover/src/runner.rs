//! Batch run over program lines read from stdin
//!
//! Input lines are `<program-url>[\t<hint>]`; blank lines and `#` comments are
//! skipped. Each program yields one output line
//! `<program-url>\t<profile-url or ?>\t<status>`.

use std::time::{Duration, Instant};

use discovery::{Discoverer, Outcome, Verdict, Verify, sanitize_candidates};
use tracing::{debug, info};

/// One program to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub url: String,
    pub hint: Option<String>,
}

/// Parse up to `max` programs from tab-separated input.
pub fn parse_programs(input: &str, max: usize) -> Vec<Program> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let url = fields.next()?.trim();
            if url.is_empty() {
                return None;
            }
            let hint = fields
                .next()
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string);
            Some(Program {
                url: url.to_string(),
                hint,
            })
        })
        .take(max)
        .collect()
}

/// Resolve one program.
///
/// Skips the model entirely once every key is dead. When the model finds
/// nothing (or no model is reachable) and `direct_hint_check` is on, the hint
/// itself is looked up as a last resort.
pub async fn resolve(
    discoverer: &Discoverer,
    verifier: &dyn Verify,
    program: &Program,
    direct_hint_check: bool,
) -> Outcome {
    let pool = discoverer.pool();
    if !pool.is_empty().await && !pool.has_live().await {
        info!(program = %program.url, "all keys retired, skipping");
        return Outcome::DailyDead;
    }

    let outcome = discoverer
        .discover(&program.url, program.hint.as_deref(), verifier)
        .await;

    let retry_direct = matches!(outcome, Outcome::NotFound | Outcome::Error);
    if !(retry_direct && direct_hint_check) {
        return outcome;
    }
    let Some(hint) = &program.hint else {
        return outcome;
    };
    let Some(name) = sanitize_candidates(std::slice::from_ref(hint)).into_iter().next() else {
        return outcome;
    };

    debug!(program = %program.url, name = %name, "trying hint directly");
    match verifier.verify(&name).await {
        Verdict::Present => {
            info!(program = %program.url, name = %name, "hint confirmed directly");
            let url = discoverer.profile_url(&name);
            Outcome::Found { name, url }
        }
        _ => outcome,
    }
}

/// Output line for one program.
pub fn report_line(program: &Program, outcome: &Outcome) -> String {
    format!(
        "{}\t{}\t{}",
        program.url,
        outcome.url().unwrap_or("?"),
        outcome.as_str()
    )
}

/// Running totals for the end-of-run summary.
#[derive(Debug)]
pub struct Summary {
    started: Instant,
    searched: usize,
    found: usize,
}

impl Summary {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            searched: 0,
            found: 0,
        }
    }

    pub fn record(&mut self, outcome: &Outcome) {
        self.searched += 1;
        if outcome.is_found() {
            self.found += 1;
        }
    }

    pub fn searched(&self) -> usize {
        self.searched
    }

    pub fn found(&self) -> usize {
        self.found
    }

    /// Found share in percent, one decimal.
    pub fn success_rate(&self) -> f64 {
        if self.searched == 0 {
            return 0.0;
        }
        (self.found as f64 * 1000.0 / self.searched as f64).round() / 10.0
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
