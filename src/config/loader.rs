//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config/default.toml.
//! Every section is optional; missing values take the documented defaults.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::adapters::explorer::{ExplorerConfig, ExplorerEndpoint};
use crate::adapters::llama::{LlamaConfig, DEFAULT_LLAMA_URL};
use crate::application::{PaginationPolicy, PollSettings, ProviderLimiters, RateLimit, Schedule};
use crate::domain::{Chain, RankPolicy, DEFAULT_THRESHOLD, DEFAULT_TOP_N};

/// Config file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Main configuration structure matching config/default.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schedule: ScheduleSection,
    pub filter: FilterSection,
    pub pagination: PaginationSection,
    pub http: HttpSection,
    pub aggregator: AggregatorSection,
    pub explorer: ExplorerSection,
    pub logging: LoggingSection,
}

/// Tick timing
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    /// Seconds between tick starts
    pub interval_secs: u64,
    /// Seconds to wait for a tick's pollers; must be below the interval
    pub tick_timeout_secs: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            interval_secs: 900,
            tick_timeout_secs: 300,
        }
    }
}

/// Large-transaction filter
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Whole-token value a transfer must exceed
    pub threshold: Decimal,
    /// Transfers kept per chain
    pub top_n: usize,
}

impl Default for FilterSection {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Explorer pagination and look-back window
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaginationSection {
    pub page_size: u32,
    pub max_pages: u32,
    pub window_secs: u64,
}

impl Default for PaginationSection {
    fn default() -> Self {
        Self {
            page_size: 20,
            max_pages: 2,
            window_secs: 900,
        }
    }
}

/// Shared HTTP client settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Per-request timeout
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: concat!("stablewatch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Stablecoin aggregator
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AggregatorSection {
    pub url: String,
    /// Minimum spacing between aggregator requests
    pub min_interval_ms: u64,
}

impl Default for AggregatorSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_LLAMA_URL.to_string(),
            min_interval_ms: 250,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExplorerSection {
    pub ethereum: ExplorerChainSection,
    pub bsc: ExplorerChainSection,
}

impl ExplorerSection {
    pub fn chain(&self, chain: Chain) -> &ExplorerChainSection {
        match chain {
            Chain::Ethereum => &self.ethereum,
            Chain::Bsc => &self.bsc,
        }
    }
}

/// One chain's explorer
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExplorerChainSection {
    /// Defaults to the chain's public Etherscan-family endpoint
    pub api_url: Option<String>,
    /// Falls back to the chain's environment variable when empty
    pub api_key: Option<String>,
    pub max_requests_per_sec: u32,
}

impl Default for ExplorerChainSection {
    fn default() -> Self {
        Self {
            api_url: None,
            api_key: None,
            max_requests_per_sec: 5,
        }
    }
}

impl ExplorerChainSection {
    pub fn api_url(&self, chain: Chain) -> String {
        self.api_url
            .clone()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| chain.default_api_url().to_string())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Log to file (in addition to stdout)
    pub log_to_file: bool,
    /// Log file path
    pub log_file: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            log_file: "logs/stablewatch.log".to_string(),
        }
    }
}

/// Resolved explorer API keys, one per chain
#[derive(Clone)]
pub struct ApiKeys {
    pub ethereum: String,
    pub bsc: String,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKeys { .. }")
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Missing API key for {chain}: set {var} in the environment or api_key in [explorer.{section}]")]
    MissingApiKey {
        chain: Chain,
        var: &'static str,
        section: &'static str,
    },
    #[error("API key for {chain} is still the placeholder value; replace {var}")]
    PlaceholderApiKey { chain: Chain, var: &'static str },
}

/// Load configuration from a TOML file (`~` is expanded)
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let expanded = expand_path(path.as_ref());
    let content = std::fs::read_to_string(&expanded)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Load the given file, or the default file when present, or built-in defaults
pub fn load_config_or_default(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => load_config(DEFAULT_CONFIG_PATH),
        None => {
            tracing::debug!("No {} found, using built-in defaults", DEFAULT_CONFIG_PATH);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

fn expand_path(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).into_owned())
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        Schedule::from(self)
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.filter.threshold.is_sign_negative() {
            return Err(ConfigError::ValidationError(format!(
                "threshold must be >= 0, got {}",
                self.filter.threshold
            )));
        }

        if self.filter.top_n == 0 {
            return Err(ConfigError::ValidationError(
                "top_n must be > 0".to_string(),
            ));
        }

        if self.pagination.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "page_size must be > 0".to_string(),
            ));
        }

        if self.pagination.max_pages == 0 {
            return Err(ConfigError::ValidationError(
                "max_pages must be > 0".to_string(),
            ));
        }

        if self.pagination.window_secs == 0 {
            return Err(ConfigError::ValidationError(
                "window_secs must be > 0".to_string(),
            ));
        }

        if self.http.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "http timeout_secs must be > 0".to_string(),
            ));
        }

        if self.aggregator.url.is_empty() {
            return Err(ConfigError::ValidationError(
                "aggregator url cannot be empty".to_string(),
            ));
        }

        for chain in Chain::ALL {
            if self.explorer.chain(chain).max_requests_per_sec == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} max_requests_per_sec must be > 0",
                    chain
                )));
            }
        }

        if tracing::Level::from_str(&self.logging.level).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Resolve both explorer keys from config, then the process environment
    pub fn resolve_api_keys(&self) -> Result<ApiKeys, ConfigError> {
        self.resolve_api_keys_with(|var| std::env::var(var).ok())
    }

    /// Resolve keys with a custom environment lookup
    pub fn resolve_api_keys_with<F>(&self, env: F) -> Result<ApiKeys, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key_for = |chain: Chain, section: &'static str| -> Result<String, ConfigError> {
            let key = self
                .explorer
                .chain(chain)
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .or_else(|| env(chain.api_key_env()).filter(|k| !k.trim().is_empty()))
                .ok_or(ConfigError::MissingApiKey {
                    chain,
                    var: chain.api_key_env(),
                    section,
                })?;

            if key.trim() == chain.placeholder_api_key() {
                return Err(ConfigError::PlaceholderApiKey {
                    chain,
                    var: chain.api_key_env(),
                });
            }
            Ok(key.trim().to_string())
        };

        Ok(ApiKeys {
            ethereum: key_for(Chain::Ethereum, "ethereum")?,
            bsc: key_for(Chain::Bsc, "bsc")?,
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn llama_config(&self) -> LlamaConfig {
        LlamaConfig {
            url: self.aggregator.url.clone(),
            timeout: self.http_timeout(),
            user_agent: self.http.user_agent.clone(),
        }
    }

    pub fn explorer_config(&self, keys: &ApiKeys) -> ExplorerConfig {
        ExplorerConfig {
            ethereum: ExplorerEndpoint::new(self.explorer.ethereum.api_url(Chain::Ethereum), keys.ethereum.clone()),
            bsc: ExplorerEndpoint::new(self.explorer.bsc.api_url(Chain::Bsc), keys.bsc.clone()),
            timeout: self.http_timeout(),
            user_agent: self.http.user_agent.clone(),
        }
    }
}

impl From<&Config> for Schedule {
    fn from(config: &Config) -> Self {
        Schedule {
            interval: Duration::from_secs(config.schedule.interval_secs),
            tick_timeout: Duration::from_secs(config.schedule.tick_timeout_secs),
        }
    }
}

impl From<&Config> for PollSettings {
    fn from(config: &Config) -> Self {
        PollSettings {
            rank: RankPolicy {
                threshold: config.filter.threshold,
                top_n: config.filter.top_n,
            },
            pagination: PaginationPolicy {
                page_size: config.pagination.page_size,
                max_pages: config.pagination.max_pages,
            },
            window: Duration::from_secs(config.pagination.window_secs),
        }
    }
}

impl From<&Config> for ProviderLimiters {
    fn from(config: &Config) -> Self {
        ProviderLimiters::new(
            RateLimit::polite(Duration::from_millis(config.aggregator.min_interval_ms)),
            RateLimit::per_second(config.explorer.ethereum.max_requests_per_sec),
            RateLimit::per_second(config.explorer.bsc.max_requests_per_sec),
        )
    }
}
