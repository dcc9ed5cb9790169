use crate::classifier::Classifier;
use crate::config::ResolvedFeedConfig;
use crate::cursor::CursorStore;
use crate::notify::NotificationDispatcher;
use crate::timestamp::normalize;
use crate::types::{Entry, FeedId, FeedSource, RawEntry};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Rules applied when deciding which entries to alert on.
#[derive(Debug, Clone)]
pub struct FilterPolicy {
    /// Entries older than `now - max_entry_age` are skipped even when newer
    /// than the watermark. `None` disables the ceiling.
    pub max_entry_age: Option<Duration>,
    /// Whether the new watermark is written back.
    pub persist: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            max_entry_age: Some(Duration::hours(24)),
            persist: true,
        }
    }
}

/// Result of processing one feed once.
#[derive(Debug, Clone)]
pub struct FeedOutcome {
    pub feed_id: FeedId,
    pub fetch_failed: bool,
    pub fetched: usize,
    pub unparsable: usize,
    pub qualified: usize,
    pub alerted: usize,
    pub delivery_failures: usize,
    pub new_watermark: Option<DateTime<Utc>>,
    pub persist_error: Option<String>,
}

impl FeedOutcome {
    fn new(feed_id: FeedId) -> Self {
        Self {
            feed_id,
            fetch_failed: false,
            fetched: 0,
            unparsable: 0,
            qualified: 0,
            alerted: 0,
            delivery_failures: 0,
            new_watermark: None,
            persist_error: None,
        }
    }
}

/// Runs fetch, filter, classify, dispatch and persist for one feed.
#[derive(Clone)]
pub struct FeedProcessor {
    source: Arc<dyn FeedSource>,
    cursors: CursorStore,
    dispatcher: NotificationDispatcher,
    policy: FilterPolicy,
}

impl FeedProcessor {
    pub fn new(
        source: Arc<dyn FeedSource>,
        cursors: CursorStore,
        dispatcher: NotificationDispatcher,
        policy: FilterPolicy,
    ) -> Self {
        Self {
            source,
            cursors,
            dispatcher,
            policy,
        }
    }

    pub async fn process(&self, feed: &ResolvedFeedConfig) -> FeedOutcome {
        self.process_at(feed, Utc::now()).await
    }

    /// Same as `process` with an explicit clock.
    pub async fn process_at(&self, feed: &ResolvedFeedConfig, now: DateTime<Utc>) -> FeedOutcome {
        let mut outcome = FeedOutcome::new(feed.id.clone());
        let watermark = self.cursors.load_or_default(&feed.id, now);
        debug!("{}: watermark {}", feed.id, watermark);

        let raw_entries = match self.source.fetch(&feed.request()).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("{}: fetch from {} failed: {}", feed.id, feed.url, e);
                outcome.fetch_failed = true;
                return outcome;
            }
        };
        outcome.fetched = raw_entries.len();

        let entries = self.normalize_entries(&feed.id, raw_entries, &mut outcome);

        // The candidate covers every parsed entry, alerted or not.
        let candidate = entries.iter().map(Entry::published_utc).max();
        // An age reaching past the representable range means no ceiling.
        let cutoff = self
            .policy
            .max_entry_age
            .and_then(|age| now.checked_sub_signed(age));

        let mut qualifying: Vec<Entry> = entries
            .into_iter()
            .filter(|entry| {
                let published = entry.published_utc();
                published > watermark && cutoff.map_or(true, |cutoff| published >= cutoff)
            })
            .collect();
        qualifying.sort_by_key(Entry::published_utc);
        outcome.qualified = qualifying.len();

        if !qualifying.is_empty() {
            let chat = &feed.channels.chat;
            let classifier = Classifier::new(&chat.colors, chat.match_body);
            for mut entry in qualifying {
                let color = entry.assign_color(classifier.classify(&entry));
                let report = self.dispatcher.dispatch(feed, &entry, color).await;
                outcome.alerted += 1;
                outcome.delivery_failures += report.failures();
            }
        }

        match candidate {
            Some(candidate) => {
                let new_watermark = candidate.max(watermark);
                outcome.new_watermark = Some(new_watermark);
                if self.policy.persist {
                    if let Err(e) = self.cursors.save(&feed.id, new_watermark) {
                        error!(
                            "{}: watermark not saved, next run may repeat alerts: {}",
                            feed.id, e
                        );
                        outcome.persist_error = Some(e.to_string());
                    }
                } else {
                    debug!("{}: persistence disabled, watermark stays put", feed.id);
                }
            }
            None => debug!("{}: no dated entries, watermark unchanged", feed.id),
        }

        info!(
            "{}: {} fetched, {} unparsable, {} alerted, {} delivery failures",
            feed.id, outcome.fetched, outcome.unparsable, outcome.alerted, outcome.delivery_failures
        );
        outcome
    }

    fn normalize_entries(
        &self,
        feed_id: &FeedId,
        raw_entries: Vec<RawEntry>,
        outcome: &mut FeedOutcome,
    ) -> Vec<Entry> {
        let mut entries = Vec::with_capacity(raw_entries.len());

        for raw in raw_entries {
            let Some(published_raw) = raw.published.clone() else {
                warn!("{}: entry '{}' has no published date, skipping", feed_id, raw.title);
                outcome.unparsable += 1;
                continue;
            };

            match normalize(&published_raw) {
                Ok(published) => entries.push(Entry::new(raw, published_raw, published)),
                Err(e) => {
                    warn!("{}: entry '{}' skipped: {}", feed_id, raw.title, e);
                    outcome.unparsable += 1;
                }
            }
        }

        entries
    }
}
