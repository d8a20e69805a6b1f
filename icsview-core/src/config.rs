//! Viewer configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{IcsViewError, IcsViewResult};
use crate::feed::FeedLocation;

static DEFAULT_TIMEZONE: &str = "UTC";
static DEFAULT_CACHE_TTL: &str = "5m";
static DEFAULT_FETCH_TIMEOUT: &str = "10s";
static DEFAULT_LISTEN: &str = "127.0.0.1:4096";
const DEFAULT_DAYS: u32 = 60;

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

fn default_cache_ttl() -> String {
    DEFAULT_CACHE_TTL.to_string()
}

fn default_fetch_timeout() -> String {
    DEFAULT_FETCH_TIMEOUT.to_string()
}

fn default_listen() -> String {
    DEFAULT_LISTEN.to_string()
}

fn default_days() -> u32 {
    DEFAULT_DAYS
}

/// Configuration at ~/.config/icsview/config.toml, overridable with
/// `ICSVIEW_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// URL or path of the .ics feed
    pub feed: Option<String>,

    /// IANA zone used for floating times, all-day events and view boundaries
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// How long a fetched feed is reused, e.g. "5m"
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: String,

    /// Upper bound on a single feed fetch, e.g. "10s"
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout: String,

    /// Address the server binds to
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Length of the "upcoming events" window
    #[serde(default = "default_days")]
    pub default_days: u32,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        ViewerConfig {
            feed: None,
            timezone: default_timezone(),
            cache_ttl: default_cache_ttl(),
            fetch_timeout: default_fetch_timeout(),
            listen: default_listen(),
            default_days: default_days(),
        }
    }
}

impl ViewerConfig {
    pub fn config_path() -> IcsViewResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| IcsViewError::Config("Could not determine config directory".into()))?
            .join("icsview");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// An explicit path must exist. The default file is created, with every
    /// option commented out, on first use.
    pub fn load(path: Option<&Path>) -> IcsViewResult<Self> {
        let (config_path, required) = match path {
            Some(p) => (PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).into_owned()), true),
            None => (Self::config_path()?, false),
        };

        if !required && !config_path.exists() {
            Self::create_default_config(&config_path)?;
        }

        Config::builder()
            .add_source(File::from(config_path).required(required))
            .add_source(Environment::with_prefix("ICSVIEW"))
            .build()
            .map_err(|e| IcsViewError::Config(e.to_string()))?
            .try_deserialize()
            .map_err(|e| IcsViewError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> IcsViewResult<()> {
        let contents = format!(
            "\
# icsview configuration

# Calendar feed to display (URL or path):
# feed = \"https://example.org/calendar.ics\"

# Time zone for floating times and view boundaries:
# timezone = \"{}\"

# How long a fetched feed is reused:
# cache_ttl = \"{}\"

# Give up on a feed fetch after:
# fetch_timeout = \"{}\"

# Server listen address:
# listen = \"{}\"
",
            DEFAULT_TIMEZONE, DEFAULT_CACHE_TTL, DEFAULT_FETCH_TIMEOUT, DEFAULT_LISTEN
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                IcsViewError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| IcsViewError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn tz(&self) -> IcsViewResult<Tz> {
        self.timezone
            .parse()
            .map_err(|_| IcsViewError::Config(format!("Unknown time zone '{}'", self.timezone)))
    }

    pub fn cache_ttl(&self) -> IcsViewResult<Duration> {
        parse_duration("cache_ttl", &self.cache_ttl)
    }

    pub fn fetch_timeout(&self) -> IcsViewResult<Duration> {
        parse_duration("fetch_timeout", &self.fetch_timeout)
    }

    pub fn feed_location(&self) -> IcsViewResult<FeedLocation> {
        let feed = self.feed.as_deref().ok_or_else(|| {
            IcsViewError::Config(
                "No calendar feed configured. Set `feed` in the config file or ICSVIEW_FEED".into(),
            )
        })?;
        FeedLocation::parse(feed)
    }
}

fn parse_duration(key: &str, value: &str) -> IcsViewResult<Duration> {
    humantime::parse_duration(value)
        .map_err(|e| IcsViewError::Config(format!("Invalid {} '{}': {}", key, value, e)))
}
