#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rss_alerter::config::{ChatChannel, EmailChannel, LogChannel, ResolvedChannels};
use rss_alerter::{
    ChatMessage, ChatPoster, CursorStore, DeliveryError, FeedId, FeedProcessor, FeedRequest,
    FeedSource, FetchError, FilterPolicy, MailMessage, MailSender, NotificationDispatcher,
    RawEntry, ResolvedFeedConfig,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .try_init()
            .ok();
    });
}

/// A fixed "now" so tests never race the wall clock.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 10, 12, 0, 0).unwrap()
}

pub fn raw(title: &str, body: &str, published: &str) -> RawEntry {
    RawEntry {
        title: title.to_string(),
        description: body.to_string(),
        published: Some(published.to_string()),
    }
}

pub fn raw_at(title: &str, published: DateTime<Utc>) -> RawEntry {
    raw(title, &format!("<p>{} details</p>", title), &published.to_rfc2822())
}

/// Feed with every channel switched on and fully configured.
pub fn feed_config(group: &str, name: &str) -> ResolvedFeedConfig {
    ResolvedFeedConfig {
        id: FeedId::new(group, name),
        group_display: group.to_uppercase(),
        url: format!("https://status.example.com/{}/{}.rss", group, name),
        credentials: None,
        channels: ResolvedChannels {
            log: LogChannel { enabled: true },
            email: EmailChannel {
                enabled: true,
                from: Some("alerts@example.com".to_string()),
                to: vec!["ops@example.com".to_string()],
                server: Some("localhost:25".to_string()),
            },
            chat: ChatChannel {
                enabled: true,
                api_url: "https://chat.example.com/v2".to_string(),
                room: Some("ops".to_string()),
                token: Some("token".to_string()),
                colors: BTreeMap::new(),
                match_body: false,
                notify: true,
            },
        },
    }
}

/// Serves canned entries per URL; URLs in `failing` return a transport error.
#[derive(Default)]
pub struct StaticFeedSource {
    entries: Mutex<HashMap<String, Vec<RawEntry>>>,
    failing: Mutex<HashSet<String>>,
    pub calls: AtomicUsize,
}

impl StaticFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_entries(&self, url: &str, entries: Vec<RawEntry>) {
        self.entries.lock().unwrap().insert(url.to_string(), entries);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }
}

#[async_trait]
impl FeedSource for StaticFeedSource {
    async fn fetch(&self, request: &FeedRequest) -> Result<Vec<RawEntry>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(&request.url) {
            return Err(FetchError::Transport("connection refused".to_string()));
        }
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct RecordingMailSender {
    pub sent: Mutex<Vec<MailMessage>>,
    pub fail: bool,
}

#[async_trait]
impl MailSender for RecordingMailSender {
    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Transport("relay down".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingChatPoster {
    pub posted: Mutex<Vec<ChatMessage>>,
    pub attempts: AtomicUsize,
    pub fail: bool,
}

#[async_trait]
impl ChatPoster for RecordingChatPoster {
    async fn post(&self, message: &ChatMessage) -> Result<(), DeliveryError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DeliveryError::Rejected {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        self.posted.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Processor wired to in-memory collaborators.
pub struct Harness {
    pub source: Arc<StaticFeedSource>,
    pub mail: Arc<RecordingMailSender>,
    pub chat: Arc<RecordingChatPoster>,
    pub cursors: CursorStore,
    pub processor: FeedProcessor,
}

impl Harness {
    pub fn new(state_dir: &Path, policy: FilterPolicy) -> Self {
        Self::with_senders(
            state_dir,
            policy,
            RecordingMailSender::default(),
            RecordingChatPoster::default(),
        )
    }

    pub fn with_senders(
        state_dir: &Path,
        policy: FilterPolicy,
        mail: RecordingMailSender,
        chat: RecordingChatPoster,
    ) -> Self {
        let source = Arc::new(StaticFeedSource::new());
        let mail = Arc::new(mail);
        let chat = Arc::new(chat);
        let cursors = CursorStore::new(state_dir);
        let dispatcher = NotificationDispatcher::new(mail.clone(), chat.clone());
        let processor = FeedProcessor::new(source.clone(), cursors.clone(), dispatcher, policy);

        Self {
            source,
            mail,
            chat,
            cursors,
            processor,
        }
    }

    pub fn mails(&self) -> Vec<MailMessage> {
        self.mail.sent.lock().unwrap().clone()
    }

    pub fn chats(&self) -> Vec<ChatMessage> {
        self.chat.posted.lock().unwrap().clone()
    }
}
