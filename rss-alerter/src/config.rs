use crate::rss_utils::url::is_valid_rss_url;
use crate::types::{Color, Credentials, FeedId, FeedRequest};
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_CHAT_API_URL: &str = "https://api.hipchat.com/v2";

/// Upper bounds for numeric settings; anything larger is a typo.
pub const MAX_ENTRY_AGE_HOURS: u64 = 24 * 365 * 10;
pub const MAX_REQUEST_TIMEOUT_SECONDS: u64 = 3600;
pub const MAX_RETRIES: u32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("state directory {} unusable: {source}", path.display())]
    StateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Top level of the TOML configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub state_dir: PathBuf,
    /// Entries older than this are never alerted on; 0 disables the ceiling.
    #[serde(default = "default_max_entry_age_hours")]
    pub max_entry_age_hours: u64,
    #[serde(default = "default_max_concurrent_feeds")]
    pub max_concurrent_feeds: usize,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub outputs: OutputsSection,
    #[serde(default)]
    pub groups: BTreeMap<String, GroupSection>,
}

fn default_max_entry_age_hours() -> u64 {
    24
}

fn default_max_concurrent_feeds() -> usize {
    4
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_user_agent() -> String {
    format!("rss-alerter/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupSection {
    pub display_name: Option<String>,
    #[serde(default)]
    pub outputs: OutputsSection,
    #[serde(default)]
    pub feeds: Vec<FeedSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedSection {
    pub name: String,
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub outputs: OutputsSection,
}

/// Channel settings at one layer (global, group or feed). Unset fields
/// inherit from the layer below.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputsSection {
    #[serde(default)]
    pub log: LogSection,
    #[serde(default)]
    pub email: EmailSection,
    #[serde(default)]
    pub chat: ChatSection,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    pub enabled: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailSection {
    pub enabled: Option<bool>,
    pub from: Option<String>,
    pub to: Option<Vec<String>>,
    pub server: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatSection {
    pub enabled: Option<bool>,
    pub api_url: Option<String>,
    pub room: Option<String>,
    pub token: Option<String>,
    pub colors: Option<BTreeMap<String, Color>>,
    pub match_body: Option<bool>,
    pub notify: Option<bool>,
}

impl OutputsSection {
    /// Lay `upper` over `self`; every field set in `upper` wins.
    pub fn overlay(&self, upper: &OutputsSection) -> OutputsSection {
        OutputsSection {
            log: LogSection {
                enabled: upper.log.enabled.or(self.log.enabled),
            },
            email: EmailSection {
                enabled: upper.email.enabled.or(self.email.enabled),
                from: upper.email.from.clone().or_else(|| self.email.from.clone()),
                to: upper.email.to.clone().or_else(|| self.email.to.clone()),
                server: upper.email.server.clone().or_else(|| self.email.server.clone()),
            },
            chat: ChatSection {
                enabled: upper.chat.enabled.or(self.chat.enabled),
                api_url: upper.chat.api_url.clone().or_else(|| self.chat.api_url.clone()),
                room: upper.chat.room.clone().or_else(|| self.chat.room.clone()),
                token: upper.chat.token.clone().or_else(|| self.chat.token.clone()),
                colors: upper.chat.colors.clone().or_else(|| self.chat.colors.clone()),
                match_body: upper.chat.match_body.or(self.chat.match_body),
                notify: upper.chat.notify.or(self.chat.notify),
            },
        }
    }

    fn into_resolved(self) -> ResolvedChannels {
        ResolvedChannels {
            log: LogChannel {
                enabled: self.log.enabled.unwrap_or(true),
            },
            email: EmailChannel {
                enabled: self.email.enabled.unwrap_or(false),
                from: self.email.from,
                to: self.email.to.unwrap_or_default(),
                server: self.email.server,
            },
            chat: ChatChannel {
                enabled: self.chat.enabled.unwrap_or(false),
                api_url: self.chat.api_url.unwrap_or_else(|| DEFAULT_CHAT_API_URL.to_string()),
                room: self.chat.room,
                token: self.chat.token,
                colors: self.chat.colors.unwrap_or_default(),
                match_body: self.chat.match_body.unwrap_or(false),
                notify: self.chat.notify.unwrap_or(true),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChannel {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailChannel {
    pub enabled: bool,
    pub from: Option<String>,
    pub to: Vec<String>,
    pub server: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatChannel {
    pub enabled: bool,
    pub api_url: String,
    pub room: Option<String>,
    pub token: Option<String>,
    pub colors: BTreeMap<String, Color>,
    pub match_body: bool,
    pub notify: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannels {
    pub log: LogChannel,
    pub email: EmailChannel,
    pub chat: ChatChannel,
}

/// Everything needed to process one feed, fixed for the run.
#[derive(Debug, Clone)]
pub struct ResolvedFeedConfig {
    pub id: FeedId,
    pub group_display: String,
    pub url: String,
    pub credentials: Option<Credentials>,
    pub channels: ResolvedChannels,
}

impl ResolvedFeedConfig {
    pub fn request(&self) -> FeedRequest {
        FeedRequest {
            url: self.url.clone(),
            credentials: self.credentials.clone(),
        }
    }
}

/// Merge global, group and feed settings; the feed layer wins.
pub fn resolve(
    global: &OutputsSection,
    group_name: &str,
    group: &GroupSection,
    feed: &FeedSection,
) -> ResolvedFeedConfig {
    let channels = global
        .overlay(&group.outputs)
        .overlay(&feed.outputs)
        .into_resolved();

    let credentials = feed.username.as_ref().map(|username| Credentials {
        username: username.clone(),
        password: feed.password.clone(),
    });

    ResolvedFeedConfig {
        id: FeedId::new(group_name, feed.name.clone()),
        group_display: group
            .display_name
            .clone()
            .unwrap_or_else(|| group_name.to_string()),
        url: feed.url.clone(),
        credentials,
        channels,
    }
}

/// Transport settings for the HTTP feed fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_seconds: default_request_timeout_seconds(),
            max_retries: default_max_retries(),
            retry_delay_seconds: 2,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        info!(
            "Loaded {} feeds in {} groups from {}",
            config.feed_count(),
            config.groups.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.state_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("state_dir must not be empty".to_string()));
        }
        if self.groups.is_empty() {
            return Err(ConfigError::Invalid("no feed groups configured".to_string()));
        }
        if self.max_concurrent_feeds == 0 {
            return Err(ConfigError::Invalid("max_concurrent_feeds must be at least 1".to_string()));
        }
        if self.max_entry_age_hours > MAX_ENTRY_AGE_HOURS {
            return Err(ConfigError::Invalid(format!(
                "max_entry_age_hours must be at most {} (0 disables the limit)",
                MAX_ENTRY_AGE_HOURS
            )));
        }
        if !(1..=MAX_REQUEST_TIMEOUT_SECONDS).contains(&self.request_timeout_seconds) {
            return Err(ConfigError::Invalid(format!(
                "request_timeout_seconds must be between 1 and {}",
                MAX_REQUEST_TIMEOUT_SECONDS
            )));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "max_retries must be at most {}",
                MAX_RETRIES
            )));
        }

        for (group_name, group) in &self.groups {
            if group.feeds.is_empty() {
                return Err(ConfigError::Invalid(format!("group '{}' has no feeds", group_name)));
            }

            let mut seen = HashSet::new();
            for feed in &group.feeds {
                let invalid = |reason: String| {
                    let feed_id = FeedId::new(group_name.as_str(), feed.name.as_str());
                    Err(ConfigError::Invalid(format!("feed '{}' {}", feed_id, reason)))
                };

                if feed.name.trim().is_empty() {
                    return invalid("has no name".to_string());
                }
                if !seen.insert(feed.name.as_str()) {
                    return invalid("is defined twice".to_string());
                }
                if !is_valid_rss_url(&feed.url) {
                    return invalid(format!("has an invalid URL '{}'", feed.url));
                }
                if feed.password.is_some() && feed.username.is_none() {
                    return invalid("has a password but no username".to_string());
                }
            }
        }

        Ok(())
    }

    pub fn feed_count(&self) -> usize {
        self.groups.values().map(|group| group.feeds.len()).sum()
    }

    /// Resolved settings for every configured feed, in group then file order.
    pub fn resolved_feeds(&self) -> Vec<ResolvedFeedConfig> {
        self.groups
            .iter()
            .flat_map(|(group_name, group)| {
                group
                    .feeds
                    .iter()
                    .map(move |feed| resolve(&self.outputs, group_name, group, feed))
            })
            .collect()
    }

    /// `None` when the staleness ceiling is switched off.
    pub fn max_entry_age(&self) -> Option<chrono::Duration> {
        match self.max_entry_age_hours {
            0 => None,
            hours => i64::try_from(hours).ok().and_then(chrono::Duration::try_hours),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            user_agent: self.user_agent.clone(),
            timeout_seconds: self.request_timeout_seconds,
            max_retries: self.max_retries,
            ..FetchConfig::default()
        }
    }

    /// Create the state directory if needed and prove it is writable.
    pub fn prepare_state_dir(&self) -> Result<(), ConfigError> {
        let path = &self.state_dir;
        let state_dir_error = |source| ConfigError::StateDir {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(path).map_err(state_dir_error)?;

        let probe = path.join(".write-probe");
        std::fs::File::create(&probe)
            .and_then(|mut file| file.write_all(b"ok"))
            .map_err(state_dir_error)?;
        let _ = std::fs::remove_file(&probe);

        debug!("State directory ready at {}", path.display());
        Ok(())
    }
}
