use crate::types::FeedId;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, warn};
use uuid::Uuid;

/// How far back a feed without usable state starts looking.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 24;

const STATE_EXTENSION: &str = "watermark";

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("no watermark stored at {}", path.display())]
    Missing { path: PathBuf },

    #[error("watermark file {} unreadable: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("watermark file {} holds unparsable content {content:?}", path.display())]
    Corrupt { path: PathBuf, content: String },
}

/// Per-feed watermark files under one state directory.
///
/// Each file holds a single RFC 3339 UTC instant with as many fractional
/// digits as needed (nanosecond precision), so a load returns exactly what the
/// previous save wrote.
#[derive(Debug, Clone)]
pub struct CursorStore {
    state_dir: PathBuf,
}

impl CursorStore {
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            state_dir: state_dir.into(),
        }
    }

    pub fn path_for(&self, feed: &FeedId) -> PathBuf {
        self.state_dir
            .join(format!("{}.{}", feed.file_stem(), STATE_EXTENSION))
    }

    pub fn load(&self, feed: &FeedId) -> Result<DateTime<Utc>, StateError> {
        let path = self.path_for(feed);

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StateError::Missing { path });
            }
            Err(source) => return Err(StateError::Io { path, source }),
        };

        match DateTime::parse_from_rfc3339(content.trim()) {
            Ok(instant) => Ok(instant.with_timezone(&Utc)),
            Err(_) => Err(StateError::Corrupt { path, content }),
        }
    }

    /// The watermark to filter against: the stored one, or `now - 24h`
    /// when nothing usable is stored.
    pub fn load_or_default(&self, feed: &FeedId, now: DateTime<Utc>) -> DateTime<Utc> {
        match self.load(feed) {
            Ok(watermark) => watermark,
            Err(e) => {
                match &e {
                    StateError::Missing { .. } => debug!("{}: {}, starting fresh", feed, e),
                    _ => warn!("{}: {}, falling back to default lookback", feed, e),
                }
                now - Duration::hours(DEFAULT_LOOKBACK_HOURS)
            }
        }
    }

    /// Write the watermark via a temporary file and rename.
    pub fn save(&self, feed: &FeedId, instant: DateTime<Utc>) -> Result<(), StateError> {
        let path = self.path_for(feed);
        let tmp_path = self
            .state_dir
            .join(format!(".{}.{}.tmp", feed.file_stem(), Uuid::new_v4()));
        let serialized = format!("{}\n", instant.to_rfc3339_opts(SecondsFormat::AutoSi, true));

        let written = (|| -> io::Result<()> {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(serialized.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp_path, &path)
        })();

        if let Err(source) = written {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(StateError::Io { path, source });
        }

        debug!("{}: watermark saved as {}", feed, serialized.trim_end());
        Ok(())
    }
}
