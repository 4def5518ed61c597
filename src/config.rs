//! Configuration module for the Patron client
//!
//! Configuration is loaded from a TOML file, then overridden by environment
//! variables (a `.env` file is honoured), then validated. Every field has a
//! default so an empty or missing file yields a working devnet setup.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Mint of the Patron token, compiled in and overridable via `token.mint`
pub const DEFAULT_TOKEN_MINT: &str = "3vZxPfAdiNogF6dyJnsuSKDGp1ZfkgW1Pk3kVpEM26mp";

/// Errors raised while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend REST API
    #[serde(default)]
    pub api: ApiConfig,

    /// Solana RPC endpoint and confirmation settings
    #[serde(default)]
    pub rpc: RpcConfig,

    /// Retry policy shared by every blockhash fetch
    #[serde(default)]
    pub retry: RetryConfig,

    /// Wallet configuration
    #[serde(default)]
    pub wallet: WalletConfig,

    /// Token settings
    #[serde(default)]
    pub token: TokenConfig,

    /// Toast notifications
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Background pollers
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging output
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the backend, e.g. `https://api.example.com/api`
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// Name of the cookie holding the session token
    #[serde(default = "default_session_cookie")]
    pub session_cookie: String,

    /// Session token to seed into the cookie jar at startup
    #[serde(default)]
    pub session_token: Option<String>,

    /// Request timeout in seconds (0 disables the timeout)
    #[serde(default)]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Solana JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Maximum time to wait for `confirmed` status
    #[serde(default = "default_confirm_timeout")]
    pub confirm_timeout_secs: u64,

    /// Delay between signature status polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff step: attempt `n` waits `n * base_delay_ms`
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    /// Jitter factor (0.0 - 1.0)
    #[serde(default = "default_jitter")]
    pub jitter_factor: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    /// Path to keypair file (JSON byte array or raw 64 bytes)
    #[serde(default = "default_keypair_path")]
    pub keypair_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Token mint address
    #[serde(default = "default_token_mint")]
    pub mint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Default toast lifetime; 0 keeps toasts until dismissed
    #[serde(default = "default_toast_duration")]
    pub default_duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Mining status refresh interval
    #[serde(default = "default_mining_interval")]
    pub mining_status_secs: u64,

    /// Cooldown countdown tick
    #[serde(default = "default_cooldown_tick")]
    pub cooldown_tick_ms: u64,

    /// Role cache refresh interval
    #[serde(default = "default_role_interval")]
    pub role_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of the human formatter
    #[serde(default)]
    pub json: bool,

    /// Explicit `EnvFilter` directive; `RUST_LOG` still wins when set
    #[serde(default)]
    pub filter: Option<String>,
}

// Default value functions
fn default_api_base_url() -> String { "http://localhost:8000/api".to_string() }
fn default_session_cookie() -> String { "session_token".to_string() }
fn default_rpc_url() -> String { "https://api.devnet.solana.com".to_string() }
fn default_rpc_timeout() -> u64 { 30 }
fn default_confirm_timeout() -> u64 { 120 }
fn default_poll_interval() -> u64 { 1000 }
fn default_max_attempts() -> u32 { 3 }
fn default_base_delay() -> u64 { 500 }
fn default_jitter() -> f64 { 0.1 }
fn default_keypair_path() -> String { "~/.config/solana/id.json".to_string() }
fn default_token_mint() -> String { DEFAULT_TOKEN_MINT.to_string() }
fn default_toast_duration() -> u64 { 5000 }
fn default_mining_interval() -> u64 { 30 }
fn default_cooldown_tick() -> u64 { 1000 }
fn default_role_interval() -> u64 { 60 }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            session_cookie: default_session_cookie(),
            session_token: None,
            request_timeout_secs: 0,
        }
    }
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            confirm_timeout_secs: default_confirm_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay(),
            jitter_factor: default_jitter(),
        }
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self { keypair_path: default_keypair_path() }
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { mint: default_token_mint() }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { default_duration_ms: default_toast_duration() }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            mining_status_secs: default_mining_interval(),
            cooldown_tick_ms: default_cooldown_tick(),
            role_secs: default_role_interval(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the file if it exists (defaults otherwise), apply `.env` and
    /// environment overrides, then validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// `PATRON_*` names win over the legacy `REACT_APP_*` names.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| keys.iter().find_map(|k| lookup(k).filter(|v| !v.is_empty()));

        if let Some(url) = first(&["PATRON_API_BASE_URL", "REACT_APP_API_BASE_URL"]) {
            self.api.base_url = url;
        }
        if let Some(url) = first(&["PATRON_SOLANA_RPC_URL", "REACT_APP_SOLANA_RPC_URL"]) {
            self.rpc.url = url;
        }
        if let Some(token) = first(&["PATRON_SESSION_TOKEN"]) {
            self.api.session_token = Some(token);
        }
        if let Some(path) = first(&["PATRON_KEYPAIR_PATH"]) {
            self.wallet.keypair_path = path;
        }
        if let Some(mint) = first(&["PATRON_TOKEN_MINT"]) {
            self.token.mint = mint;
        }
    }

    /// Check value ranges and parse addresses
    pub fn validate(&self) -> Result<(), ConfigError> {
        if reqwest::Url::parse(&self.api.base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "api.base_url is not a valid URL: {}",
                self.api.base_url
            )));
        }
        if reqwest::Url::parse(&self.rpc.url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "rpc.url is not a valid URL: {}",
                self.rpc.url
            )));
        }
        if self.api.session_cookie.trim().is_empty() {
            return Err(ConfigError::Invalid("api.session_cookie must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.retry.jitter_factor) {
            return Err(ConfigError::Invalid("retry.jitter_factor must be within 0.0..=1.0".into()));
        }
        if self.rpc.confirm_timeout_secs == 0 || self.rpc.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "rpc.confirm_timeout_secs and rpc.poll_interval_ms must be positive".into(),
            ));
        }
        if self.polling.mining_status_secs == 0
            || self.polling.cooldown_tick_ms == 0
            || self.polling.role_secs == 0
        {
            return Err(ConfigError::Invalid("polling intervals must be positive".into()));
        }
        self.token_mint()?;
        Ok(())
    }

    /// Parsed token mint
    pub fn token_mint(&self) -> Result<Pubkey, ConfigError> {
        Pubkey::from_str(&self.token.mint)
            .map_err(|e| ConfigError::Invalid(format!("token.mint {}: {}", self.token.mint, e)))
    }

    /// Keypair path with a leading `~/` expanded against `$HOME`
    pub fn keypair_path(&self) -> PathBuf {
        let raw = &self.wallet.keypair_path;
        match (raw.strip_prefix("~/"), std::env::var_os("HOME")) {
            (Some(rest), Some(home)) => PathBuf::from(home).join(rest),
            _ => PathBuf::from(raw),
        }
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.rpc.poll_interval_ms)
    }

    pub fn default_toast_duration(&self) -> Duration {
        Duration::from_millis(self.notifications.default_duration_ms)
    }
}
