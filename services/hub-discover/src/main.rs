//! Docker Hub organization discovery
//!
//! Batch binary that:
//! 1. Loads the API key pool from env or a key file
//! 2. Reads bug bounty program lines from stdin
//! 3. Asks Gemini for each program's Docker Hub organization
//! 4. Confirms candidates against Docker Hub and prints one line per program

mod config;
mod metrics;
mod registry;
mod runner;

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use discovery::Discoverer;
use gemini_api::GeminiClient;
use gemini_pool::{Pool, SystemClock};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::registry::DockerHubVerifier;
use crate::runner::{Summary, parse_programs, report_line, resolve};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support.
    // Logs go to stderr; stdout carries the result lines.
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    info!("starting hub-discover");

    let prometheus_handle = metrics::install_recorder()?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load_or_default(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        gemini_url = %config.gemini.base_url,
        registry_url = %config.registry.base_url,
        models = ?config.gemini.models,
        max_wait_secs = config.gemini.max_wait_secs,
        keys = config.gemini.api_keys.len(),
        "configuration loaded"
    );

    if config.gemini.api_keys.is_empty() {
        anyhow::bail!("no Gemini API keys: set GEMINI_API_KEYS or gemini.api_keys_file");
    }

    let pool = Arc::new(Pool::new(Arc::new(SystemClock)));
    pool.configure(config.gemini.api_keys.iter().map(|k| k.expose()))
        .await;

    let http = reqwest::Client::builder()
        .build()
        .context("failed to build HTTP client")?;
    let gemini = GeminiClient::new(http.clone())
        .with_base_url(&config.gemini.base_url)
        .with_timeout(config.gemini.timeout());
    let verifier = DockerHubVerifier::new(
        http,
        &config.registry.base_url,
        config.registry.timeout(),
    );

    let discoverer = Discoverer::builder(pool.clone(), Arc::new(gemini))
        .models(config.gemini.models.clone())
        .max_wait(config.gemini.max_wait())
        .without_env_fallback()
        .build();

    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .context("failed to read programs from stdin")?;
    let programs = parse_programs(&input, config.discovery.max_programs);
    info!(programs = programs.len(), "programs to discover");

    let mut summary = Summary::start();
    for (index, program) in programs.iter().enumerate() {
        info!(
            index = index + 1,
            total = programs.len(),
            program = %program.url,
            "searching"
        );
        let outcome = resolve(
            &discoverer,
            &verifier,
            program,
            config.discovery.direct_hint_check,
        )
        .await;
        if !outcome.is_found() {
            info!(
                program = %program.url,
                outcome = outcome.as_str(),
                action = outcome.action().describe(),
                "program unresolved"
            );
        }
        println!("{}", report_line(program, &outcome));
        summary.record(&outcome);
    }

    let health = pool.health().await;
    info!(
        searched = summary.searched(),
        found = summary.found(),
        success_rate = summary.success_rate(),
        elapsed_secs = summary.elapsed().as_secs(),
        pool = %health,
        "discovery run complete"
    );

    if let Some(path) = &config.metrics.textfile
        && let Err(e) = metrics::write_textfile(&prometheus_handle, path)
    {
        warn!(error = %e, "failed to write metrics textfile");
    }

    Ok(())
}
