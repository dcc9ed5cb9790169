pub mod defs;

pub use defs::{
    ChatMessage, ChatPoster, Color, Credentials, DeliveryError, FeedRequest, FeedSource,
    FetchError, MailMessage, MailSender, RawEntry,
};
