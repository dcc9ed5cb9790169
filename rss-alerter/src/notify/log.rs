use crate::config::ResolvedFeedConfig;
use crate::types::Entry;
use tracing::{debug, warn};

/// Tracing target for alert lines, so they can be routed separately.
pub const ALERT_TARGET: &str = "rss_alerter::alert";

pub fn emit(feed: &ResolvedFeedConfig, entry: &Entry) {
    warn!(
        target: ALERT_TARGET,
        "[{}] {} {}: {}",
        feed.group_display,
        feed.id.feed,
        entry.published.to_rfc2822(),
        entry.title
    );
    debug!(target: ALERT_TARGET, "{}: {}", feed.id, entry.body);
}
