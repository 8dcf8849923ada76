use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use url::Url;

use crate::engine::FilterRules;

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Env var consulted when `[telegram] token` is absent from the file.
pub const TOKEN_ENV_VAR: &str = "IMMOWATCH_TELEGRAM_TOKEN";

/// Startup-time configuration failures. All of these are fatal: the process
/// must not reach the scheduling loop with a broken config.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub immowatch: WatchConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    pub search: SearchConfig,
}

/// Polling cadence and warmup behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Seconds between polling ticks.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Also notify for listings found on the very first tick instead of
    /// only recording them.
    #[serde(default)]
    pub include_existing_offers: bool,
}

fn default_poll_interval() -> u64 {
    60
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            include_existing_offers: false,
        }
    }
}

/// Telegram transport credentials.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TelegramConfig {
    pub token: Option<String>,
    /// Target chat. Discovered via `getUpdates` when absent.
    pub chat_id: Option<i64>,
}

/// Search endpoint and filter toggles.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Full search URL including query filters.
    pub url: Url,
    #[serde(default = "default_true")]
    pub exclude_wbs: bool,
    #[serde(default = "default_true")]
    pub exclude_tausch: bool,
    /// Warm-rent ceiling; listings above it are dropped.
    pub max_rent: Option<Decimal>,
}

fn default_true() -> bool {
    true
}

impl SearchConfig {
    pub fn rules(&self) -> FilterRules {
        FilterRules {
            exclude_wbs: self.exclude_wbs,
            exclude_tausch: self.exclude_tausch,
            max_rent: self.max_rent,
        }
    }
}

impl AppConfig {
    /// Load and validate config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.immowatch.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be nonzero".to_string(),
            ));
        }
        match self.search.url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(ConfigError::Invalid(format!(
                    "search url must be http(s), got {other}"
                )));
            }
        }
        Ok(())
    }

    /// Bot token from the config file, falling back to the environment.
    pub fn telegram_token(&self) -> Option<String> {
        self.telegram
            .token
            .clone()
            .filter(|token| !token.is_empty())
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
    }
}
