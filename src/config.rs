//! Application-level configuration loading: bot pacing, join retries, room lifetime and the
//! match lifecycle webhook.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TICTACTOE_BACK_CONFIG_PATH";
/// Environment variable that overrides the webhook base URL from the file.
const WEBHOOK_URL_ENV: &str = "MATCH_WEBHOOK_URL";

const DEFAULT_SETTLE_DELAY_MS: u64 = 1000;
const DEFAULT_DIFFICULT_PROBABILITY: f64 = 0.6;
const DEFAULT_STRATEGIC_PROBABILITY: f64 = 0.6;
const DEFAULT_JOIN_ATTEMPTS: u32 = 3;
const DEFAULT_JOIN_BACKOFF_MS: u64 = 1000;
const DEFAULT_EMPTY_ROOM_TTL_SECS: u64 = 60;
const DEFAULT_WEBHOOK_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    pub bot: BotConfig,
    pub join: JoinConfig,
    pub rooms: RoomsConfig,
    pub webhook: WebhookConfig,
}

/// Bot pacing and tier selection.
#[derive(Debug, Clone, PartialEq)]
pub struct BotConfig {
    /// Pause between the bot's turn starting and its selection.
    pub settle_delay: Duration,
    /// Chance a new bot room gets the difficult tier.
    pub difficult_probability: f64,
    /// Chance a normal-tier bot plays the strategic move instead of the weighted one.
    pub strategic_probability: f64,
}

impl Default for BotConfig {
    fn default() -> Self {
        RawBotConfig::default().into()
    }
}

/// Bounded retry applied when a connection cannot join its room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinConfig {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for JoinConfig {
    fn default() -> Self {
        RawJoinConfig::default().into()
    }
}

/// Room lifetime limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomsConfig {
    /// How long a room waits for its first seat before tearing itself down.
    pub empty_room_ttl: Duration,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        RawRoomsConfig::default().into()
    }
}

/// Outbound match lifecycle reporting. Disabled when `base_url` is unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub base_url: Option<String>,
    /// Token used when a room was created without one.
    pub token: String,
    pub timeout: Duration,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        RawWebhookConfig::default().into()
    }
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    ///
    /// `MATCH_WEBHOOK_URL` takes precedence over the webhook URL found in the file.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let mut config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json_str(&contents) {
                Ok(config) => {
                    info!(
                        path = %path.display(),
                        settle_delay_ms = config.bot.settle_delay.as_millis() as u64,
                        webhook = config.webhook.base_url.is_some(),
                        "loaded configuration"
                    );
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        if let Some(url) = env::var(WEBHOOK_URL_ENV).ok().filter(|url| !url.is_empty()) {
            info!(url = %url, "webhook URL overridden from environment");
            config.webhook.base_url = Some(url);
        }
        config
    }

    /// Parse a configuration document. Missing sections and fields take their defaults.
    pub fn from_json_str(contents: &str) -> serde_json::Result<Self> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    bot: RawBotConfig,
    join: RawJoinConfig,
    rooms: RawRoomsConfig,
    webhook: RawWebhookConfig,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            bot: value.bot.into(),
            join: value.join.into(),
            rooms: value.rooms.into(),
            webhook: value.webhook.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawBotConfig {
    settle_delay_ms: u64,
    difficult_probability: f64,
    strategic_probability: f64,
}

impl Default for RawBotConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            difficult_probability: DEFAULT_DIFFICULT_PROBABILITY,
            strategic_probability: DEFAULT_STRATEGIC_PROBABILITY,
        }
    }
}

impl From<RawBotConfig> for BotConfig {
    fn from(value: RawBotConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(value.settle_delay_ms),
            difficult_probability: probability_or(
                value.difficult_probability,
                DEFAULT_DIFFICULT_PROBABILITY,
            ),
            strategic_probability: probability_or(
                value.strategic_probability,
                DEFAULT_STRATEGIC_PROBABILITY,
            ),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawJoinConfig {
    max_attempts: u32,
    backoff_ms: u64,
}

impl Default for RawJoinConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_JOIN_ATTEMPTS,
            backoff_ms: DEFAULT_JOIN_BACKOFF_MS,
        }
    }
}

impl From<RawJoinConfig> for JoinConfig {
    fn from(value: RawJoinConfig) -> Self {
        Self {
            max_attempts: value.max_attempts.max(1),
            backoff: Duration::from_millis(value.backoff_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawRoomsConfig {
    empty_room_ttl_secs: u64,
}

impl Default for RawRoomsConfig {
    fn default() -> Self {
        Self {
            empty_room_ttl_secs: DEFAULT_EMPTY_ROOM_TTL_SECS,
        }
    }
}

impl From<RawRoomsConfig> for RoomsConfig {
    fn from(value: RawRoomsConfig) -> Self {
        Self {
            empty_room_ttl: Duration::from_secs(value.empty_room_ttl_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawWebhookConfig {
    base_url: Option<String>,
    token: String,
    timeout_ms: u64,
}

impl Default for RawWebhookConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: String::new(),
            timeout_ms: DEFAULT_WEBHOOK_TIMEOUT_MS,
        }
    }
}

impl From<RawWebhookConfig> for WebhookConfig {
    fn from(value: RawWebhookConfig) -> Self {
        Self {
            base_url: value
                .base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            token: value.token,
            timeout: Duration::from_millis(value.timeout_ms),
        }
    }
}

/// Keep `value` when it is a usable probability, otherwise warn and use `fallback`.
fn probability_or(value: f64, fallback: f64) -> f64 {
    if (0.0..=1.0).contains(&value) {
        value
    } else {
        warn!(value, fallback, "probability outside [0, 1]; using default");
        fallback
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
