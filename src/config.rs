use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::fetcher::RetryPolicy;

pub const MIN_DAYS: u32 = 7;
pub const MAX_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Wikipedia,
    Crypto,
    Fred,
    Weather,
    Exchange,
    Nasa,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WikipediaConfig {
    pub language: String,
    pub denylist: Vec<String>,
    pub namespace_prefixes: Vec<String>,
    pub default_topic: String,
}

impl Default for WikipediaConfig {
    fn default() -> Self {
        Self {
            language: "de".into(),
            denylist: [
                "Hauptseite",
                "Wikipedia:Hauptseite",
                "Spezial:Suche",
                "Spezial:Anmelden",
                "Wikipedia:Impressum",
                "Wikipedia:Datenschutz",
                "Cleopatra",
                "Wikipedia:Über_Wikipedia",
                "-_Hauptseite",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            namespace_prefixes: ["Spezial:", "Wikipedia:", "Datei:"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_topic: "Künstliche_Intelligenz".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    pub coin_id: String,
    pub vs_currency: String,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            coin_id: "bitcoin".into(),
            vs_currency: "usd".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FredConfig {
    pub series_id: String,
}

impl Default for FredConfig {
    fn default() -> Self {
        Self {
            series_id: "DGS10".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub city: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            city: "Berlin".into(),
            latitude: 52.52,
            longitude: 13.41,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base: String,
    pub target: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base: "EUR".into(),
            target: "USD".into(),
        }
    }
}

/// Delays applied before outbound calls to stay under upstream rate limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Before a lightweight rank or summary call.
    pub light_delay_ms: u64,
    /// Before a historical series pull.
    pub series_delay_ms: u64,
    /// Between fallback dates of the rank lookup.
    pub fallback_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            light_delay_ms: 500,
            series_delay_ms: 2000,
            fallback_delay_ms: 1000,
            request_timeout_secs: 15,
        }
    }
}

impl PacingConfig {
    pub fn light_delay(&self) -> Duration {
        Duration::from_millis(self.light_delay_ms)
    }

    pub fn series_delay(&self) -> Duration {
        Duration::from_millis(self.series_delay_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// No delays at all, for tests and offline runs.
    #[cfg(test)]
    pub fn immediate() -> Self {
        Self {
            light_delay_ms: 0,
            series_delay_ms: 0,
            fallback_delay_ms: 0,
            request_timeout_secs: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff_ms: 1000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.backoff_ms))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    pub telegram: bool,
    pub discord: bool,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            telegram: true,
            discord: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceKind,
    /// Second source whose series is correlated with the main one.
    pub compare_with: Option<SourceKind>,
    pub days: u32,
    /// Language for news enrichment.
    pub language: String,
    /// Skips enrichment and publishing; the caption is only logged.
    pub dry_run: bool,
    pub output_dir: PathBuf,
    pub wikipedia: WikipediaConfig,
    pub crypto: CryptoConfig,
    pub fred: FredConfig,
    pub weather: WeatherConfig,
    pub exchange: ExchangeConfig,
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
    pub publish: PublishConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Wikipedia,
            compare_with: None,
            days: 30,
            language: "de".into(),
            dry_run: false,
            output_dir: PathBuf::from("output"),
            wikipedia: WikipediaConfig::default(),
            crypto: CryptoConfig::default(),
            fred: FredConfig::default(),
            weather: WeatherConfig::default(),
            exchange: ExchangeConfig::default(),
            pacing: PacingConfig::default(),
            retry: RetryConfig::default(),
            publish: PublishConfig::default(),
        }
    }
}

impl AppConfig {
    /// Requested window clamped to the supported range.
    pub fn window_days(&self) -> u32 {
        self.days.clamp(MIN_DAYS, MAX_DAYS)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content, path)
}

/// Like [`load_config`] but a missing file yields the defaults.
pub fn load_config_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        warn!("Config {} not found, using defaults", path.display());
        return Ok(AppConfig::default());
    }
    load_config(path)
}

fn parse_config(content: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    if config.compare_with == Some(config.source) {
        return Err(ConfigError::Invalid(
            "compare_with must differ from source".into(),
        ));
    }
    if config.retry.max_attempts == 0 {
        return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
    }
    Ok(config)
}

/// Secrets taken from the process environment at startup.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub fred_api_key: Option<String>,
    pub nasa_api_key: Option<String>,
    pub gnews_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub discord_webhook_url: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            fred_api_key: get("FRED_API_KEY"),
            nasa_api_key: get("NASA_API_KEY"),
            gnews_api_key: get("GNEWS_API_KEY"),
            groq_api_key: get("GROQ_API_KEY"),
            telegram_bot_token: get("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get("TELEGRAM_CHAT_ID"),
            discord_webhook_url: get("DISCORD_WEBHOOK_URL"),
        }
    }
}
