//! Configuration management for Social Teaser

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

pub const FACEBOOK_FEED_ENDPOINT: &str = "https://graph.facebook.com/me/feed";
pub const TWITTER_UPDATE_ENDPOINT: &str = "https://api.twitter.com/1.1/statuses/update.json";
pub const TUMBLR_POST_ENDPOINT: &str = "https://api.tumblr.com/v2/blog/{blog}/post";
pub const TUMBLR_USER_INFO_ENDPOINT: &str = "http://api.tumblr.com/v2/user/info";

/// Per-request timeout used when nothing else is configured
pub const DEFAULT_TIMEOUT_SECS: u64 = 100;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub requests: RequestsConfig,
    #[serde(default)]
    pub platforms: PlatformsConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/social-teaser/teaser.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestsConfig {
    pub timeout_secs: u64,
}

impl Default for RequestsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RequestsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformsConfig {
    /// Platforms allowed to register, in registration order
    #[serde(default = "default_enabled_platforms")]
    pub enabled: Vec<String>,
    #[serde(default)]
    pub facebook: FacebookConfig,
    #[serde(default)]
    pub twitter: TwitterConfig,
    #[serde(default)]
    pub tumblr: TumblrConfig,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled_platforms(),
            facebook: FacebookConfig::default(),
            twitter: TwitterConfig::default(),
            tumblr: TumblrConfig::default(),
        }
    }
}

fn default_enabled_platforms() -> Vec<String> {
    vec![
        "facebook".to_string(),
        "twitter".to_string(),
        "tumblr".to_string(),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacebookConfig {
    pub endpoint: String,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            endpoint: FACEBOOK_FEED_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    pub endpoint: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            endpoint: TWITTER_UPDATE_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TumblrConfig {
    /// Post endpoint template; `{blog}` is replaced with the destination host
    pub post_endpoint: String,
    pub user_info_endpoint: String,
}

impl Default for TumblrConfig {
    fn default() -> Self {
        Self {
            post_endpoint: TUMBLR_POST_ENDPOINT.to_string(),
            user_info_endpoint: TUMBLR_USER_INFO_ENDPOINT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// TOML file holding stored credentials; `None` means the host supplies them
    pub path: Option<String>,
}

impl CredentialsConfig {
    pub fn expand_path(&self) -> Option<PathBuf> {
        self.path
            .as_deref()
            .map(|path| PathBuf::from(shellexpand::tilde(path).to_string()))
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make every request fail
    pub fn validate(&self) -> Result<()> {
        if self.requests.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "requests.timeout_secs must be greater than zero".to_string(),
            )
            .into());
        }
        Ok(())
    }

    /// Whether the config allows `platform` to register
    pub fn is_enabled(&self, platform: &str) -> bool {
        self.platforms.enabled.iter().any(|name| name == platform)
    }
}

/// Resolve the configuration file path (XDG config dir unless overridden)
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("SOCIAL_TEASER_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("social-teaser").join("config.toml"))
}

/// Resolve the database path, expanding `~`
pub fn resolve_db_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}
