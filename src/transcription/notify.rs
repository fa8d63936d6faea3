//! Job notification e-mails
//!
//! The pipeline only talks to [`Notifier`]; [`SmtpNotifier`] is the
//! production implementation and delivers through the `[email]` account.

use std::path::PathBuf;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use crate::config::EmailSettings;
use crate::error::{Error, Result};

/// Port that speaks TLS from the first byte instead of upgrading via STARTTLS
const IMPLICIT_TLS_PORT: u16 = 465;

/// One outgoing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl Notice {
    /// Success notice listing the chunk files produced for `audio_url`
    pub fn job_ready(audio_url: &str, to: &[String], chunks: &[PathBuf]) -> Self {
        let mut body = format!(
            "Audio from {} is ready for transcription in {} chunk(s):\r\n",
            audio_url,
            chunks.len()
        );
        for chunk in chunks {
            let name = chunk
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| chunk.display().to_string());
            body.push_str(&format!("  {}\r\n", name));
        }

        Self {
            to: to.to_vec(),
            subject: "Transcription job ready".to_string(),
            body,
        }
    }

    /// Failure notice carrying the error that ended the job
    pub fn job_failed(audio_url: &str, to: &[String], error: &Error) -> Self {
        Self {
            to: to.to_vec(),
            subject: "Transcription job failed".to_string(),
            body: format!(
                "Audio from {} could not be processed.\r\n{}\r\n",
                audio_url,
                error.format_for_log()
            ),
        }
    }
}

/// Delivers job notices to their recipients
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: &Notice) -> Result<()>;
}

/// [`Notifier`] that sends mail through an authenticated SMTP relay
pub struct SmtpNotifier {
    from: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpNotifier {
    /// Build from the `[email]` settings; the account name doubles as the
    /// From address
    pub fn from_settings(settings: &EmailSettings) -> Result<Self> {
        let from: Mailbox = settings.username.trim().parse().map_err(|e| {
            Error::config_field_invalid("email.username", format!("{}", e))
        })?;

        let builder = if settings.smtp_port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.smtp_host)
        }
        .map_err(|e| Error::config_field_invalid("email.smtp_host", e.to_string()))?;

        let transport = builder
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                settings.username.trim().to_string(),
                settings.password.clone(),
            ))
            .build();

        Ok(Self { from, transport })
    }
}

impl std::fmt::Debug for SmtpNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpNotifier")
            .field("from", &self.from.to_string())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, notice: &Notice) -> Result<()> {
        let message = build_message(&self.from, notice)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| Error::notify_failed(&notice.to, e.to_string()))?;

        debug!(recipients = notice.to.len(), subject = %notice.subject, "Notification sent");
        Ok(())
    }
}

/// Plain-text message with From, To and Subject headers
pub(crate) fn build_message(from: &Mailbox, notice: &Notice) -> Result<Message> {
    if notice.to.is_empty() {
        return Err(Error::notify_failed(&notice.to, "no recipients"));
    }

    let mut builder = Message::builder()
        .from(from.clone())
        .subject(notice.subject.as_str())
        .header(ContentType::TEXT_PLAIN);
    for address in &notice.to {
        let mailbox: Mailbox = address
            .parse()
            .map_err(|e| Error::notify_failed(&notice.to, format!("'{}': {}", address, e)))?;
        builder = builder.to(mailbox);
    }

    builder
        .body(notice.body.clone())
        .map_err(|e| Error::notify_failed(&notice.to, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn recipients() -> Vec<String> {
        vec!["a@example.org".to_string(), "b@example.org".to_string()]
    }

    fn settings(port: u16) -> EmailSettings {
        EmailSettings {
            username: "jobs@example.org".to_string(),
            password: "secret".to_string(),
            smtp_host: "smtp.example.org".to_string(),
            smtp_port: port,
        }
    }

    #[test]
    fn test_message_headers() {
        let from: Mailbox = "jobs@example.org".parse().unwrap();
        let chunks = vec![
            PathBuf::from("/work/j/ep1.mp3.part0.wav.flac"),
            PathBuf::from("/work/j/ep1.mp3.part1.wav.flac"),
        ];
        let notice = Notice::job_ready("https://example.org/ep1.mp3", &recipients(), &chunks);

        let formatted = build_message(&from, &notice).unwrap().formatted();
        let text = String::from_utf8_lossy(&formatted);

        assert!(text.contains("From: jobs@example.org"), "{}", text);
        assert!(text.contains("To: a@example.org"), "{}", text);
        assert!(text.contains("b@example.org"), "{}", text);
        assert!(text.contains("Subject: Transcription job ready"), "{}", text);
        assert!(text.contains("ep1.mp3.part1.wav.flac"), "{}", text);
    }

    #[test]
    fn test_failure_notice_carries_error() {
        let err = Error::download_failed("https://example.org/ep1.mp3", "connection reset");
        let notice = Notice::job_failed("https://example.org/ep1.mp3", &recipients(), &err);

        assert_eq!(notice.subject, "Transcription job failed");
        assert!(notice.body.contains("E300"));
        assert!(notice.body.contains("connection reset"));
    }

    #[test]
    fn test_bad_recipient_is_notify_error() {
        let from: Mailbox = "jobs@example.org".parse().unwrap();
        let notice = Notice::job_ready("u", &["not an address".to_string()], &[]);

        let err = build_message(&from, &notice).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotifyFailed);

        let empty = Notice::job_ready("u", &[], &[]);
        assert_eq!(build_message(&from, &empty).unwrap_err().code(), ErrorCode::NotifyFailed);
    }

    #[test]
    fn test_from_settings() {
        assert!(SmtpNotifier::from_settings(&settings(587)).is_ok());
        assert!(SmtpNotifier::from_settings(&settings(465)).is_ok());

        let mut bad = settings(587);
        bad.username = "nobody".to_string();
        let err = SmtpNotifier::from_settings(&bad).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigValidation);
    }
}
