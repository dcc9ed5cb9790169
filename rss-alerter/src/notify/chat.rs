use crate::config::ResolvedFeedConfig;
use crate::rss_utils::text::escape_html;
use crate::types::{ChatMessage, ChatPoster, Color, DeliveryError, Entry};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Render the HTML message for a chat room. Feed bodies are already HTML and
/// go in as delivered; names and titles are escaped.
pub fn render_html(feed: &ResolvedFeedConfig, entry: &Entry) -> String {
    format!(
        "<b>{}</b> <i>{}</i><br/><b>{}</b><br/>{}",
        escape_html(&feed.id.feed),
        escape_html(&entry.published.to_rfc2822()),
        escape_html(&entry.title),
        entry.body
    )
}

pub fn compose(
    feed: &ResolvedFeedConfig,
    entry: &Entry,
    color: Color,
) -> Result<ChatMessage, DeliveryError> {
    let settings = &feed.channels.chat;
    let missing = |what: &str| {
        DeliveryError::Config(format!("{}: chat enabled without {}", feed.id, what))
    };

    let room = settings.room.clone().ok_or_else(|| missing("a room"))?;
    let token = settings.token.clone().ok_or_else(|| missing("a token"))?;

    Ok(ChatMessage {
        api_url: settings.api_url.clone(),
        room,
        token,
        html: render_html(feed, entry),
        color,
        notify: settings.notify,
    })
}

/// Posts room notifications through the HipChat v2 REST API.
pub struct HipChatPoster {
    client: Client,
}

impl HipChatPoster {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DeliveryError::Config(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn notification_url(message: &ChatMessage) -> String {
        format!(
            "{}/room/{}/notification",
            message.api_url.trim_end_matches('/'),
            urlencode_segment(&message.room)
        )
    }

    pub fn payload(message: &ChatMessage) -> serde_json::Value {
        json!({
            "message": message.html,
            "message_format": "html",
            "color": message.color,
            "notify": message.notify,
        })
    }
}

fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[async_trait]
impl ChatPoster for HipChatPoster {
    async fn post(&self, message: &ChatMessage) -> Result<(), DeliveryError> {
        let api_url = Self::notification_url(message);
        debug!("Posting {} notification to room {}", message.color, message.room);

        let response = self
            .client
            .post(&api_url)
            .bearer_auth(&message.token)
            .json(&Self::payload(message))
            .send()
            .await
            .map_err(|e| DeliveryError::Transport(e.to_string()))?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body: error_body,
            });
        }

        Ok(())
    }
}
