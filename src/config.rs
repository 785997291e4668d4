//! Configuration loading and validation.
//!
//! Everything environment-specific lives here: gateway endpoint,
//! credentials, reconnect policy, timeouts, and the anti-flood quota
//! figures. Quotas are configuration rather than constants because the
//! remote service's documented limits drift.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("username is required")]
    MissingUsername,
    #[error("password is required")]
    MissingPassword,
    #[error("api.api_key is required when [api] is present")]
    MissingApiKey,
    #[error("max_line_len must be at least 64, got {0}")]
    LineLenTooSmall(usize),
    #[error("rate_limit.window_secs must be non-zero")]
    ZeroWindow,
    #[error("rate_limit limits must be non-zero")]
    ZeroLimit,
    #[error("rate_limit.safety_margin must be in [0, 1), got {0}")]
    BadSafetyMargin(f32),
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway host.
    pub host: String,
    /// Gateway port.
    pub port: u16,
    /// Account name, used for registration and self-detection.
    pub username: String,
    /// IRC authentication token.
    pub password: String,
    /// Reconnect automatically after an unexpected closure.
    pub reconnect: bool,
    /// Delay before each reconnect attempt, in seconds.
    pub reconnect_delay_secs: u64,
    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// Read idle timeout treated as a dead transport, in seconds.
    pub idle_timeout_secs: u64,
    /// Maximum encoded line length in bytes, CR LF included.
    pub max_line_len: usize,
    /// Leading character that marks a channel message as a highlight,
    /// charging it against the addressed quota.
    pub mention_sentinel: char,
    /// Anti-flood quotas.
    pub rate_limit: RateLimitConfig,
    /// Metadata API access. Enables numeric-id resolution and multiplayer
    /// channel recognition.
    pub api: Option<ApiConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "irc.ppy.sh".to_owned(),
            port: 6667,
            username: String::new(),
            password: String::new(),
            reconnect: true,
            reconnect_delay_secs: 5,
            connect_timeout_secs: 10,
            idle_timeout_secs: 60,
            max_line_len: 512,
            mention_sentinel: '@',
            rate_limit: RateLimitConfig::default(),
            api: None,
        }
    }
}

impl Config {
    /// Load and validate a TOML config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field values; called by [`Config::from_file`], and worth
    /// calling on hand-built configs too.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.username.is_empty() {
            return Err(ConfigError::MissingUsername);
        }
        if self.password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }
        if self.max_line_len < 64 {
            return Err(ConfigError::LineLenTooSmall(self.max_line_len));
        }
        if let Some(api) = &self.api
            && api.api_key.is_empty()
        {
            return Err(ConfigError::MissingApiKey);
        }
        self.rate_limit.validate()
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// Anti-flood quota figures.
///
/// The limits are the server's documented ceilings; the safety margin is
/// shaved off each capacity to absorb clock skew and network latency.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Shared rolling window length, in seconds.
    pub window_secs: u64,
    /// Documented limit for ordinary lines per window.
    pub normal_limit: u32,
    /// Documented limit for addressed lines (private messages and
    /// highlights) per window.
    pub addressed_limit: u32,
    /// Fraction of each limit withheld as headroom.
    pub safety_margin: f32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 60,
            normal_limit: 300,
            addressed_limit: 60,
            safety_margin: 0.1,
        }
    }
}

impl RateLimitConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.window_secs == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.normal_limit == 0 || self.addressed_limit == 0 {
            return Err(ConfigError::ZeroLimit);
        }
        if !(0.0..1.0).contains(&self.safety_margin) {
            return Err(ConfigError::BadSafetyMargin(self.safety_margin));
        }
        Ok(())
    }

    /// Capacity actually enforced for a documented limit, margin applied.
    pub fn effective_capacity(&self, limit: u32) -> u32 {
        let scaled = (limit as f32 * (1.0 - self.safety_margin)).floor() as u32;
        scaled.max(1)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Metadata API credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the metadata API.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,
    /// API key sent with every lookup.
    pub api_key: String,
}

fn default_api_base_url() -> String {
    "https://osu.ppy.sh/api".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            username: "player".into(),
            password: "token".into(),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults_need_credentials() {
        assert!(matches!(
            Config::default().validate(),
            Err(ConfigError::MissingUsername)
        ));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config: Config = toml::from_str(
            r#"
            username = "player"
            password = "token"
            port = 6667
            mention_sentinel = "@"

            [rate_limit]
            window_secs = 10
            normal_limit = 50

            [api]
            api_key = "abc"
            "#,
        )
        .expect("parse");
        assert_eq!(config.rate_limit.window_secs, 10);
        assert_eq!(config.rate_limit.normal_limit, 50);
        // unset nested fields keep their defaults
        assert_eq!(config.rate_limit.addressed_limit, 60);
        let api = config.api.as_ref().expect("api section");
        assert_eq!(api.base_url, "https://osu.ppy.sh/api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_effective_capacity_applies_margin() {
        let limits = RateLimitConfig::default();
        assert_eq!(limits.effective_capacity(300), 270);
        assert_eq!(limits.effective_capacity(60), 54);
        // never zero, even for tiny limits
        assert_eq!(limits.effective_capacity(1), 1);
    }

    #[test]
    fn test_validate_rejects_bad_margin() {
        let mut config = valid();
        config.rate_limit.safety_margin = 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadSafetyMargin(_))
        ));
    }
}
