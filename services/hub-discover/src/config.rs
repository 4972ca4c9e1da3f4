//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! API keys are loaded from GEMINI_API_KEYS / GEMINI_API_KEY or
//! api_keys_file, never stored in the TOML directly to avoid leaking secrets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use gemini_pool::parse_key_list;
use gemini_pool::pool::KEYS_ENV_VARS;
use serde::Deserialize;

/// Config file used when neither `--config` nor CONFIG_PATH is given.
pub const DEFAULT_CONFIG_PATH: &str = "hub-discover.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Inference service settings
#[derive(Debug, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_url")]
    pub base_url: String,
    #[serde(default = "default_models")]
    pub models: Vec<String>,
    /// Total sleeping allowed per program while every key is throttled; 0 = no limit
    #[serde(default = "default_max_wait")]
    pub max_wait_secs: u64,
    #[serde(default = "default_gemini_timeout")]
    pub timeout_secs: u64,
    /// Path to a file with one key per line (alternative to GEMINI_API_KEYS)
    #[serde(default)]
    pub api_keys_file: Option<PathBuf>,
    #[serde(skip)]
    pub api_keys: Vec<Secret<String>>,
}

/// Registry lookup settings
#[derive(Debug, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,
}

/// Batch run settings
#[derive(Debug, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_max_programs")]
    pub max_programs: usize,
    /// Check the hint itself on the registry when the model finds nothing
    #[serde(default = "default_true")]
    pub direct_hint_check: bool,
}

/// Metrics output
#[derive(Debug, Default, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus textfile written at the end of the run
    #[serde(default)]
    pub textfile: Option<PathBuf>,
}

fn default_gemini_url() -> String {
    gemini_api::DEFAULT_BASE_URL.to_string()
}

fn default_models() -> Vec<String> {
    gemini_api::DEFAULT_MODELS
        .iter()
        .map(|m| m.to_string())
        .collect()
}

fn default_max_wait() -> u64 {
    gemini_pool::DEFAULT_MAX_WAIT.as_secs()
}

fn default_gemini_timeout() -> u64 {
    gemini_api::DEFAULT_TIMEOUT.as_secs()
}

fn default_registry_url() -> String {
    "https://hub.docker.com".to_string()
}

fn default_registry_timeout() -> u64 {
    10
}

fn default_max_programs() -> usize {
    50
}

fn default_true() -> bool {
    true
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_url(),
            models: default_models(),
            max_wait_secs: default_max_wait(),
            timeout_secs: default_gemini_timeout(),
            api_keys_file: None,
            api_keys: Vec::new(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            timeout_secs: default_registry_timeout(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_programs: default_max_programs(),
            direct_hint_check: true,
        }
    }
}

impl GeminiConfig {
    /// Wait budget per program; `None` when unbounded.
    pub fn max_wait(&self) -> Option<Duration> {
        (self.max_wait_secs > 0).then(|| Duration::from_secs(self.max_wait_secs))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RegistryConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// API key resolution order:
    /// 1. GEMINI_API_KEYS env var
    /// 2. GEMINI_API_KEY env var
    /// 3. api_keys_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.finish()
    }

    /// Like `load`, but a missing file at the default path yields defaults.
    pub fn load_or_default(path: &Path) -> common::Result<Self> {
        if path == Path::new(DEFAULT_CONFIG_PATH) && !path.exists() {
            return Config::default().finish();
        }
        Self::load(path)
    }

    fn finish(mut self) -> common::Result<Self> {
        self.validate()?;
        self.gemini.models = dedupe_models(&self.gemini.models);
        self.gemini.api_keys = resolve_api_keys(self.gemini.api_keys_file.as_deref())?;
        Ok(self)
    }

    fn validate(&self) -> common::Result<()> {
        for (field, url) in [
            ("gemini.base_url", &self.gemini.base_url),
            ("registry.base_url", &self.registry.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{field} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.gemini.timeout_secs == 0 || self.registry.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        if self.gemini.models.is_empty() {
            return Err(common::Error::Config(
                "gemini.models must name at least one model".into(),
            ));
        }
        if self.gemini.models.iter().any(|m| m.trim().is_empty()) {
            return Err(common::Error::Config(
                "gemini.models must not contain blank entries".into(),
            ));
        }

        if self.discovery.max_programs == 0 {
            return Err(common::Error::Config(
                "max_programs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }
}

/// Trimmed model ladder with repeats dropped, first occurrence wins.
fn dedupe_models(models: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    models
        .iter()
        .map(|m| m.trim().to_string())
        .filter(|m| seen.insert(m.clone()))
        .collect()
}

/// Env vars win over the key file; blank values count as unset.
fn resolve_api_keys(keys_file: Option<&Path>) -> common::Result<Vec<Secret<String>>> {
    let from_env = KEYS_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty());

    let raw = match (from_env, keys_file) {
        (Some(raw), _) => raw,
        (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
            common::Error::Config(format!(
                "failed to read api_keys_file {}: {e}",
                path.display()
            ))
        })?,
        (None, None) => return Ok(Vec::new()),
    };

    Ok(parse_key_list(&raw).into_iter().map(Secret::new).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    unsafe fn clear_key_env() {
        for name in KEYS_ENV_VARS {
            unsafe { remove_env(name) };
        }
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn exposed(config: &Config) -> Vec<&str> {
        config
            .gemini
            .api_keys
            .iter()
            .map(|k| k.expose().as_str())
            .collect()
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.gemini.base_url,
            "https://generativelanguage.googleapis.com"
        );
        assert_eq!(config.gemini.models.len(), 4);
        assert_eq!(config.gemini.models[0], "gemini-2.0-flash-lite");
        assert_eq!(config.gemini.max_wait(), Some(Duration::from_secs(600)));
        assert_eq!(config.gemini.timeout(), Duration::from_secs(30));
        assert_eq!(config.registry.base_url, "https://hub.docker.com");
        assert_eq!(config.registry.timeout(), Duration::from_secs(10));
        assert_eq!(config.discovery.max_programs, 50);
        assert!(config.discovery.direct_hint_check);
        assert!(config.metrics.textfile.is_none());
        assert!(config.gemini.api_keys.is_empty());
    }

    #[test]
    fn test_load_full_config() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[gemini]
base_url = "http://127.0.0.1:9000"
models = ["gemini-2.0-flash"]
max_wait_secs = 0
timeout_secs = 5

[registry]
base_url = "http://127.0.0.1:9001"
timeout_secs = 3

[discovery]
max_programs = 7
direct_hint_check = false

[metrics]
textfile = "/tmp/hub_discover.prom"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(config.gemini.models, vec!["gemini-2.0-flash"]);
        assert_eq!(config.gemini.max_wait(), None, "0 means unbounded");
        assert_eq!(config.gemini.timeout(), Duration::from_secs(5));
        assert_eq!(config.registry.base_url, "http://127.0.0.1:9001");
        assert_eq!(config.discovery.max_programs, 7);
        assert!(!config.discovery.direct_hint_check);
        assert_eq!(
            config.metrics.textfile.as_deref(),
            Some(Path::new("/tmp/hub_discover.prom"))
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/path/config.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_missing_default_file() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        // Relative default path resolves against the test's cwd, where no config exists
        let config = Config::load_or_default(Path::new(DEFAULT_CONFIG_PATH)).unwrap();
        assert_eq!(config.discovery.max_programs, 50);

        let result = Config::load_or_default(Path::new("/nonexistent/explicit.toml"));
        assert!(result.is_err(), "explicit missing path must still fail");
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not valid {{{{ toml");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_api_keys_from_env() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        unsafe { set_env("GEMINI_API_KEYS", "AIza-one, AIza-two\nAIza-three") };
        let config = Config::load(&path).unwrap();
        assert_eq!(exposed(&config), vec!["AIza-one", "AIza-two", "AIza-three"]);
        unsafe { clear_key_env() };
    }

    #[test]
    fn test_single_key_env_fallback() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        unsafe {
            set_env("GEMINI_API_KEYS", "   ");
            set_env("GEMINI_API_KEY", "AIza-solo");
        }
        let config = Config::load(&path).unwrap();
        assert_eq!(exposed(&config), vec!["AIza-solo"]);
        unsafe { clear_key_env() };
    }

    #[test]
    fn test_api_keys_from_file() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("keys");
        std::fs::write(&key_path, "AIza-file-1\n\nAIza-file-2\n").unwrap();
        let path = write_config(
            &dir,
            &format!("[gemini]\napi_keys_file = \"{}\"\n", key_path.display()),
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(exposed(&config), vec!["AIza-file-1", "AIza-file-2"]);
    }

    #[test]
    fn test_api_keys_env_overrides_file() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[gemini]\napi_keys_file = \"/nonexistent/path/keys\"\n",
        );

        unsafe { set_env("GEMINI_API_KEYS", "AIza-env-wins") };
        let config = Config::load(&path).unwrap();
        assert_eq!(
            exposed(&config),
            vec!["AIza-env-wins"],
            "env keys must take precedence over a nonexistent api_keys_file"
        );
        unsafe { clear_key_env() };
    }

    #[test]
    fn test_api_keys_file_nonexistent_returns_error() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[gemini]\napi_keys_file = \"/nonexistent/path/keys\"\n",
        );

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(err.contains("api_keys_file"), "got: {err}");
    }

    #[test]
    fn test_keys_not_leaked_in_debug() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "");

        unsafe { set_env("GEMINI_API_KEYS", "AIza-very-secret") };
        let config = Config::load(&path).unwrap();
        unsafe { clear_key_env() };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("AIza-very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[registry]\nbase_url = \"hub.docker.com\"\n");

        let err = Config::load(&path).unwrap_err().to_string();
        assert!(
            err.contains("registry.base_url must start with http"),
            "error message should explain the issue, got: {err}"
        );
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[gemini]\ntimeout_secs = 0\n");
        assert!(Config::load(&path).is_err(), "timeout_secs = 0 must be rejected");
    }

    #[test]
    fn test_empty_models_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[gemini]\nmodels = []\n");
        assert!(Config::load(&path).is_err(), "empty model list must be rejected");
    }

    #[test]
    fn test_blank_model_entry_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[gemini]\nmodels = [\"\", \"gemini-2.0-flash\"]\n");
        assert!(Config::load(&path).is_err(), "blank model name must be rejected");
    }

    #[test]
    fn test_models_trimmed_and_deduplicated() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[gemini]\nmodels = [\"flash\", \" pro \", \"flash\", \"pro\"]\n",
        );
        let config = Config::load(&path).unwrap();
        assert_eq!(config.gemini.models, vec!["flash", "pro"]);
    }

    #[test]
    fn test_zero_max_programs_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { clear_key_env() };
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[discovery]\nmax_programs = 0\n");
        assert!(Config::load(&path).is_err(), "max_programs = 0 must be rejected");
    }

    #[test]
    fn test_resolve_path_cli_arg() {
        let path = Config::resolve_path(Some("/custom/path.toml"));
        assert_eq!(path, PathBuf::from("/custom/path.toml"));
    }

    #[test]
    fn test_resolve_path_env_var() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { set_env("CONFIG_PATH", "/env/path.toml") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("/env/path.toml"));
        unsafe { remove_env("CONFIG_PATH") };
    }

    #[test]
    fn test_resolve_path_default() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { remove_env("CONFIG_PATH") };
        let path = Config::resolve_path(None);
        assert_eq!(path, PathBuf::from("hub-discover.toml"));
    }

    #[test]
    fn test_resolve_path_cli_overrides_env() {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        unsafe { set_env("CONFIG_PATH", "/env/should-lose.toml") };
        let path = Config::resolve_path(Some("/cli/wins.toml"));
        assert_eq!(
            path,
            PathBuf::from("/cli/wins.toml"),
            "CLI arg must take precedence over CONFIG_PATH env var"
        );
        unsafe { remove_env("CONFIG_PATH") };
    }
}
