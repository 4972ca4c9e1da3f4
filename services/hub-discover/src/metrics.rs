//! Prometheus metrics for batch runs
//!
//! The run is a batch job, so metrics are rendered once at the end and written
//! to a node-exporter textfile instead of being served:
//!
//! - `discovery_outcomes_total` (counter): label `outcome`
//! - `discovery_inference_requests_total` (counter): labels `model`, `result`
//! - `discovery_verifications_total` (counter): label `verdict`
//! - `discovery_keys_parked_total` / `discovery_keys_killed_total` (counters)
//! - `discovery_wait_seconds_total` (counter)

use std::path::Path;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    describe();
    Ok(handle)
}

fn describe() {
    metrics::describe_counter!(
        "discovery_outcomes_total",
        "Discovery calls by terminal outcome"
    );
    metrics::describe_counter!(
        "discovery_inference_requests_total",
        "Inference attempts by model and classified result"
    );
    metrics::describe_counter!(
        "discovery_verifications_total",
        "Registry lookups by verdict"
    );
    metrics::describe_counter!(
        "discovery_keys_parked_total",
        "API keys parked after a per-minute rate limit"
    );
    metrics::describe_counter!(
        "discovery_keys_killed_total",
        "API keys retired for the run"
    );
    metrics::describe_counter!(
        "discovery_wait_seconds_total",
        "Seconds slept waiting for a throttled key"
    );
}

/// Write the rendered exposition text to `path` atomically (temp file + rename).
pub fn write_textfile(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, handle.render())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move metrics into {}", path.display()))?;
    Ok(())
}
