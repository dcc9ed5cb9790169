use anyhow::Result;
use async_trait::async_trait;
use interfaces::defs::{DeliveryError, MailMessage, MailSender};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::client::Tls;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const DEFAULT_SMTP_PORT: u16 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpRelay {
    pub host: String,
    pub port: u16,
}

impl SmtpRelay {
    /// Parse a relay address.
    /// Accepted forms: `host`, `host:port`, `smtp://host[:port]`
    pub fn parse(server: &str) -> Result<Self> {
        let server = server.trim();
        if server.is_empty() {
            return Err(anyhow::anyhow!("Mail relay address is empty"));
        }

        if server.contains("://") {
            let parsed = Url::parse(server)
                .map_err(|e| anyhow::anyhow!("Invalid relay URI '{}': {}", server, e))?;

            if parsed.scheme() != "smtp" {
                return Err(anyhow::anyhow!("Relay URI must use 'smtp://' scheme, got: {}", parsed.scheme()));
            }

            let host = parsed.host_str()
                .ok_or_else(|| anyhow::anyhow!("No host specified in relay URI: {}", server))?
                .to_string();

            return Ok(Self {
                host,
                port: parsed.port().unwrap_or(DEFAULT_SMTP_PORT),
            });
        }

        match server.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>()
                    .map_err(|e| anyhow::anyhow!("Invalid relay port in '{}': {}", server, e))?;
                if host.is_empty() {
                    return Err(anyhow::anyhow!("No host specified in relay address: {}", server));
                }
                Ok(Self { host: host.to_string(), port })
            }
            None => Ok(Self {
                host: server.to_string(),
                port: DEFAULT_SMTP_PORT,
            }),
        }
    }
}

/// Assemble a plain-text message ready for the relay.
pub fn build_message(mail: &MailMessage) -> Result<Message> {
    if mail.to.is_empty() {
        return Err(anyhow::anyhow!("No recipients for message '{}'", mail.subject));
    }

    let from: Mailbox = mail.from.parse()
        .map_err(|e| anyhow::anyhow!("Invalid sender address '{}': {}", mail.from, e))?;

    let mut builder = Message::builder()
        .from(from)
        .subject(mail.subject.as_str())
        .header(ContentType::TEXT_PLAIN);

    for recipient in &mail.to {
        let to: Mailbox = recipient.parse()
            .map_err(|e| anyhow::anyhow!("Invalid recipient address '{}': {}", recipient, e))?;
        builder = builder.to(to);
    }

    let message = builder.body(mail.body.clone())?;
    Ok(message)
}

/// Sends alerts through an unauthenticated SMTP relay (typically the local MTA).
pub struct SmtpMailSender {
    timeout: Duration,
}

impl SmtpMailSender {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SmtpMailSender {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[async_trait]
impl MailSender for SmtpMailSender {
    async fn send(&self, mail: &MailMessage) -> std::result::Result<(), DeliveryError> {
        let relay = SmtpRelay::parse(&mail.relay)
            .map_err(|e| DeliveryError::Config(e.to_string()))?;
        let message = build_message(mail)
            .map_err(|e| DeliveryError::Config(e.to_string()))?;

        debug!("Sending '{}' via {}:{}", mail.subject, relay.host, relay.port);

        let timeout = self.timeout;
        let relay_host = relay.host.clone();
        // lettre's SmtpTransport blocks, keep it off the async workers
        let outcome = tokio::task::spawn_blocking(move || {
            let mailer = SmtpTransport::builder_dangerous(relay.host.as_str())
                .port(relay.port)
                .tls(Tls::None)
                .timeout(Some(timeout))
                .build();
            mailer.send(&message)
        })
        .await
        .map_err(|e| DeliveryError::Transport(format!("mail task failed: {}", e)))?;

        match outcome {
            Ok(response) if response.is_positive() => {
                info!("Mail '{}' accepted by {}", mail.subject, relay_host);
                Ok(())
            }
            Ok(response) => Err(DeliveryError::Rejected {
                status: response.code().to_string().parse().unwrap_or(0),
                body: response.message().map(|line| line.to_string()).collect::<Vec<_>>().join(" "),
            }),
            Err(e) => Err(DeliveryError::Transport(format!("Failed to send email via SMTP: {}", e))),
        }
    }
}
