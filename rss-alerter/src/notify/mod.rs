use crate::config::ResolvedFeedConfig;
use crate::types::{ChatPoster, Color, DeliveryError, Entry, MailSender};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

pub mod chat;
pub mod email;
pub mod log;

pub use chat::HipChatPoster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Log,
    Email,
    Chat,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelKind::Log => f.write_str("log"),
            ChannelKind::Email => f.write_str("email"),
            ChannelKind::Chat => f.write_str("chat"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Delivered,
    Disabled,
    Failed(String),
}

/// What happened on each channel for one entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub log: ChannelStatus,
    pub email: ChannelStatus,
    pub chat: ChannelStatus,
}

impl DispatchReport {
    pub fn failures(&self) -> usize {
        [&self.log, &self.email, &self.chat]
            .into_iter()
            .filter(|status| matches!(status, ChannelStatus::Failed(_)))
            .count()
    }

    pub fn delivered(&self) -> usize {
        [&self.log, &self.email, &self.chat]
            .into_iter()
            .filter(|status| **status == ChannelStatus::Delivered)
            .count()
    }
}

/// Fans one classified entry out to the channels enabled for its feed.
///
/// Channels run in a fixed order (log, email, chat) and each one is
/// attempted regardless of how the previous ones went.
#[derive(Clone)]
pub struct NotificationDispatcher {
    mail: Arc<dyn MailSender>,
    chat: Arc<dyn ChatPoster>,
}

impl NotificationDispatcher {
    pub fn new(mail: Arc<dyn MailSender>, chat: Arc<dyn ChatPoster>) -> Self {
        Self { mail, chat }
    }

    pub async fn dispatch(
        &self,
        feed: &ResolvedFeedConfig,
        entry: &Entry,
        color: Color,
    ) -> DispatchReport {
        let channels = &feed.channels;

        let log = if channels.log.enabled {
            log::emit(feed, entry);
            ChannelStatus::Delivered
        } else {
            ChannelStatus::Disabled
        };

        let email = if channels.email.enabled {
            let outcome = match email::compose(feed, entry) {
                Ok(message) => self.mail.send(&message).await,
                Err(e) => Err(e),
            };
            settle(feed, entry, ChannelKind::Email, outcome)
        } else {
            ChannelStatus::Disabled
        };

        let chat = if channels.chat.enabled {
            let outcome = match chat::compose(feed, entry, color) {
                Ok(message) => self.chat.post(&message).await,
                Err(e) => Err(e),
            };
            settle(feed, entry, ChannelKind::Chat, outcome)
        } else {
            ChannelStatus::Disabled
        };

        DispatchReport { log, email, chat }
    }
}

fn settle(
    feed: &ResolvedFeedConfig,
    entry: &Entry,
    kind: ChannelKind,
    outcome: Result<(), DeliveryError>,
) -> ChannelStatus {
    match outcome {
        Ok(()) => {
            debug!(feed = %feed.id, channel = %kind, "Delivered '{}'", entry.title);
            ChannelStatus::Delivered
        }
        Err(e) => {
            error!(feed = %feed.id, channel = %kind, "Failed to deliver '{}': {}", entry.title, e);
            ChannelStatus::Failed(e.to_string())
        }
    }
}
