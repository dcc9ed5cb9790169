pub mod types;
pub mod timestamp;
pub mod cursor;
pub mod classifier;
pub mod config;
pub mod fetcher;
pub mod notify;
pub mod processor;
pub mod runner;
pub mod rss_utils;

pub use types::*;
pub use classifier::Classifier;
pub use config::{AppConfig, ResolvedFeedConfig};
pub use cursor::CursorStore;
pub use fetcher::HttpFeedSource;
pub use notify::{HipChatPoster, NotificationDispatcher};
pub use processor::{FeedOutcome, FeedProcessor, FilterPolicy};
pub use runner::{RunCoordinator, RunSummary};
