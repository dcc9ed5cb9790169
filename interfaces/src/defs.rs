use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single item as delivered by a feed, before any timestamp handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub title: String,
    pub description: String,
    pub published: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

// Keep passwords out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct FeedRequest {
    pub url: String,
    pub credentials: Option<Credentials>,
}

/// Severity colors understood by the chat room API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Yellow,
    Green,
    Red,
    Purple,
    Gray,
}

impl Color {
    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Yellow => "yellow",
            Color::Green => "green",
            Color::Red => "red",
            Color::Purple => "purple",
            Color::Gray => "gray",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Relay address, `host[:port]` or `smtp://host[:port]`.
    pub relay: String,
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub api_url: String,
    pub room: String,
    pub token: String,
    pub html: String,
    pub color: Color,
    pub notify: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("feed document could not be parsed: {0}")]
    Parse(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("channel is misconfigured: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

// Object style note:
// Implementations of these traits are collaborators handed to the feed
// processor. They hold connection settings only; anything per-feed travels in
// the request/message values so one instance serves every feed in a run.

/// Fetches the current entries of one feed.
///
/// An empty vector means the feed was reachable and had no entries; transport
/// and HTTP problems must come back as `FetchError`.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawEntry>, FetchError>;
}

#[async_trait]
pub trait MailSender: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait ChatPoster: Send + Sync {
    async fn post(&self, message: &ChatMessage) -> Result<(), DeliveryError>;
}
