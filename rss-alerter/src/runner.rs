use crate::config::ResolvedFeedConfig;
use crate::processor::{FeedOutcome, FeedProcessor};
use futures::stream::{self, StreamExt};
use tracing::info;

/// Totals over one run of every configured feed.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FeedOutcome>,
}

impl RunSummary {
    pub fn alerted(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.alerted).sum()
    }

    pub fn fetch_failures(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.fetch_failed).count()
    }

    pub fn delivery_failures(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.delivery_failures).sum()
    }

    pub fn persist_failures(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.persist_error.is_some()).count()
    }
}

/// Processes feeds independently with at most `max_concurrent` in flight.
pub struct RunCoordinator {
    processor: FeedProcessor,
    max_concurrent: usize,
}

impl RunCoordinator {
    pub fn new(processor: FeedProcessor, max_concurrent: usize) -> Self {
        Self {
            processor,
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub async fn run_all(&self, feeds: &[ResolvedFeedConfig]) -> RunSummary {
        info!("Processing {} feeds, {} at a time", feeds.len(), self.max_concurrent);

        let mut outcomes: Vec<FeedOutcome> = stream::iter(feeds)
            .map(|feed| self.processor.process(feed))
            .buffer_unordered(self.max_concurrent)
            .collect()
            .await;
        outcomes.sort_by(|a, b| a.feed_id.cmp(&b.feed_id));

        let summary = RunSummary { outcomes };
        info!(
            "Run finished: {} alerts, {} fetch failures, {} delivery failures, {} unsaved watermarks",
            summary.alerted(),
            summary.fetch_failures(),
            summary.delivery_failures(),
            summary.persist_failures()
        );
        summary
    }
}
