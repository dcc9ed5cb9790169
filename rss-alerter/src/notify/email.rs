use crate::config::ResolvedFeedConfig;
use crate::rss_utils::text::extract_text_from_html;
use crate::types::{DeliveryError, Entry, MailMessage};

pub fn subject(feed: &ResolvedFeedConfig, entry: &Entry) -> String {
    format!("[{}] {}: {}", feed.group_display, feed.id.feed, entry.title)
}

pub fn body(feed: &ResolvedFeedConfig, entry: &Entry) -> String {
    format!(
        "Feed: {}\nPublished: {}\n\n{}\n",
        feed.id.feed,
        entry.published.to_rfc2822(),
        extract_text_from_html(&entry.body)
    )
}

/// Build the alert mail for an entry from the feed's email settings.
pub fn compose(feed: &ResolvedFeedConfig, entry: &Entry) -> Result<MailMessage, DeliveryError> {
    let settings = &feed.channels.email;

    let missing = |what: &str| {
        DeliveryError::Config(format!("{}: email enabled without {}", feed.id, what))
    };

    let relay = settings.server.clone().ok_or_else(|| missing("a server"))?;
    let from = settings.from.clone().ok_or_else(|| missing("a sender"))?;
    if settings.to.is_empty() {
        return Err(missing("recipients"));
    }

    Ok(MailMessage {
        relay,
        from,
        to: settings.to.clone(),
        subject: subject(feed, entry),
        body: body(feed, entry),
    })
}
