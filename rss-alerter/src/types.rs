use chrono::{DateTime, FixedOffset, Utc};
use std::fmt;

pub use interfaces::defs::{
    ChatMessage, ChatPoster, Color, Credentials, DeliveryError, FeedRequest, FeedSource,
    FetchError, MailMessage, MailSender, RawEntry,
};

use crate::config::ConfigError;

/// Identity of one feed inside its group, rendered as `group/feed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId {
    pub group: String,
    pub feed: String,
}

impl FeedId {
    pub fn new(group: impl Into<String>, feed: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            feed: feed.into(),
        }
    }

    /// File-system safe name, distinct for every distinct (group, feed).
    ///
    /// Each part is form-urlencoded with `_` escaped as well, so the `__`
    /// separator never occurs inside an encoded part.
    pub fn file_stem(&self) -> String {
        format!("{}__{}", encode_part(&self.group), encode_part(&self.feed))
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.feed)
    }
}

fn encode_part(part: &str) -> String {
    url::form_urlencoded::byte_serialize(part.as_bytes())
        .collect::<String>()
        .replace('_', "%5F")
}

/// A fetched entry whose timestamp has been normalized.
#[derive(Debug, Clone)]
pub struct Entry {
    pub title: String,
    pub body: String,
    pub published_raw: String,
    pub published: DateTime<FixedOffset>,
    color: Option<Color>,
}

impl Entry {
    pub fn new(raw: RawEntry, published_raw: String, published: DateTime<FixedOffset>) -> Self {
        Self {
            title: raw.title,
            body: raw.description,
            published_raw,
            published,
            color: None,
        }
    }

    pub fn published_utc(&self) -> DateTime<Utc> {
        self.published.with_timezone(&Utc)
    }

    pub fn color(&self) -> Option<Color> {
        self.color
    }

    /// Records the classification. The first assignment sticks.
    pub fn assign_color(&mut self, color: Color) -> Color {
        *self.color.get_or_insert(color)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlerterError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),
}

pub type Result<T> = std::result::Result<T, AlerterError>;
