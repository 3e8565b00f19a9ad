use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use lettre::message::{header::ContentType, Mailbox, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use crate::core::config::SmtpSettings;
use crate::core::digest::DigestResult;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("invalid address {address:?}: {source}")]
    Address {
        address: String,
        #[source]
        source: lettre::address::AddressError,
    },
    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("smtp error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Hands a finished message to a transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), NotifyError>;
}

/// STARTTLS + AUTH session per message; the connection is closed after sending.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, NotifyError> {
        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
            .port(settings.port)
            .credentials(credentials)
            .timeout(Some(Duration::from_secs(settings.timeout_secs)))
            .build();
        Ok(Self { transport })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        self.transport.send(message).await?;
        Ok(())
    }
}

pub struct Notifier {
    mailer: Box<dyn Mailer>,
    from: String,
    to: String,
    subject_prefix: String,
}

impl Notifier {
    pub fn new(mailer: Box<dyn Mailer>, smtp: &SmtpSettings, subject_prefix: &str) -> Self {
        Self {
            mailer,
            from: smtp.sender().to_string(),
            to: smtp.to.trim().to_string(),
            subject_prefix: subject_prefix.to_string(),
        }
    }

    /// Sends the digest. Failures are logged and reported as `false`.
    pub async fn deliver(&self, digest: &DigestResult, today: NaiveDate) -> bool {
        let subject = build_subject(&self.subject_prefix, today, digest.subject_topics.as_deref());
        match self.send_html(&subject, &digest.body).await {
            Ok(()) => {
                tracing::info!(to = %self.to, subject = %subject, "digest sent");
                true
            }
            Err(error) => {
                tracing::error!(to = %self.to, error = %error, "failed to send digest");
                false
            }
        }
    }

    /// Short message to check SMTP settings without running the pipeline.
    pub async fn send_test(&self) -> Result<(), NotifyError> {
        let subject = format!("{} - test email", self.subject_prefix);
        let body = "<!DOCTYPE html>\n<html><body>\
            <h1>rss-digest</h1>\
            <p>Email configuration is working.</p>\
            </body></html>";
        self.send_html(&subject, body).await
    }

    async fn send_html(&self, subject: &str, html_body: &str) -> Result<(), NotifyError> {
        let message = compose_message(&self.from, &self.to, subject, html_body)?;
        self.mailer.send(message).await
    }
}

pub fn build_subject(prefix: &str, today: NaiveDate, topics: Option<&str>) -> String {
    let base = format!("{prefix} - {}", today.format("%d.%m.%Y"));
    match topics.map(str::trim).filter(|value| !value.is_empty()) {
        Some(topics) => format!("{base} | {topics}"),
        None => base,
    }
}

pub fn compose_message(
    from: &str,
    to: &str,
    subject: &str,
    html_body: &str,
) -> Result<Message, NotifyError> {
    let message = Message::builder()
        .from(parse_mailbox(from)?)
        .to(parse_mailbox(to)?)
        .subject(subject)
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(html_body.to_string()),
        )?;
    Ok(message)
}

fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|source| NotifyError::Address {
        address: address.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::digest::DigestPath;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingMailer {
        sent: Arc<Mutex<Vec<Message>>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: Message) -> Result<(), NotifyError> {
            self.sent.lock().expect("lock").push(message);
            Ok(())
        }
    }

    struct RefusingMailer;

    #[async_trait]
    impl Mailer for RefusingMailer {
        async fn send(&self, _message: Message) -> Result<(), NotifyError> {
            let source = "relay refused"
                .parse::<Mailbox>()
                .expect_err("not an address");
            Err(NotifyError::Address {
                address: "relay refused".to_string(),
                source,
            })
        }
    }

    fn smtp() -> SmtpSettings {
        SmtpSettings {
            host: "smtp.example.com".to_string(),
            username: "digest@example.com".to_string(),
            password: "pw".to_string(),
            to: "reader@example.com".to_string(),
            ..SmtpSettings::default()
        }
    }

    fn digest(topics: Option<&str>) -> DigestResult {
        DigestResult {
            body: "<p>Hello</p>".to_string(),
            subject_topics: topics.map(ToString::to_string),
            path: DigestPath::Generated,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 24).unwrap()
    }

    #[test]
    fn subject_includes_topics_only_when_present() {
        assert_eq!(
            build_subject("Privacy Newsletter", today(), Some("GDPR, Cookies, KI")),
            "Privacy Newsletter - 24.02.2026 | GDPR, Cookies, KI"
        );
        assert_eq!(
            build_subject("Privacy Newsletter", today(), Some("  ")),
            "Privacy Newsletter - 24.02.2026"
        );
        assert_eq!(
            build_subject("Privacy Newsletter", today(), None),
            "Privacy Newsletter - 24.02.2026"
        );
    }

    #[test]
    fn message_is_a_single_html_part() {
        let message = compose_message(
            "digest@example.com",
            "reader@example.com",
            "Subject line",
            "<p>Body</p>",
        )
        .expect("message should build");

        assert_eq!(message.headers().get_raw("Subject"), Some("Subject line"));
        let formatted = String::from_utf8(message.formatted()).expect("utf8");
        assert!(formatted.contains("Content-Type: text/html; charset=utf-8"));
        assert!(!formatted.contains("multipart/"));
        assert!(formatted.contains("<p>Body</p>"));
    }

    #[test]
    fn invalid_address_is_rejected() {
        let error = compose_message("nobody", "reader@example.com", "s", "b")
            .expect_err("bad sender must fail");
        assert!(matches!(error, NotifyError::Address { .. }));
    }

    #[tokio::test]
    async fn deliver_sends_one_message() {
        let mailer = RecordingMailer::default();
        let notifier = Notifier::new(Box::new(mailer.clone()), &smtp(), "Privacy Newsletter");

        assert!(notifier.deliver(&digest(Some("A, B, C")), today()).await);

        let sent = mailer.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].headers().get_raw("Subject"),
            Some("Privacy Newsletter - 24.02.2026 | A, B, C")
        );
        assert_eq!(sent[0].headers().get_raw("From"), Some("digest@example.com"));
        assert_eq!(sent[0].headers().get_raw("To"), Some("reader@example.com"));
    }

    #[tokio::test]
    async fn transport_failure_is_reported_as_false() {
        let notifier = Notifier::new(Box::new(RefusingMailer), &smtp(), "Privacy Newsletter");
        assert!(!notifier.deliver(&digest(None), today()).await);
    }
}
