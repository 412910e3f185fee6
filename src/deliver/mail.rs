//! SMTP transmission of the packaged artifact.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};
use std::path::Path;

use crate::config::MailSettings;

#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Send one message with `attachment` to the fixed recipient.
    async fn send_artifact(&self, subject: &str, body: &str, attachment: &Path) -> Result<()>;
}

/// STARTTLS submission with credentials, the way Gmail expects it.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &MailSettings) -> Result<Self> {
        let creds = Credentials::new(cfg.user.clone(), cfg.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
            .with_context(|| format!("invalid SMTP host {:?}", cfg.host))?
            .port(cfg.port)
            .credentials(creds)
            .build();
        let from = cfg
            .from
            .parse()
            .with_context(|| format!("invalid from address {:?}", cfg.from))?;
        let to = cfg
            .to
            .parse()
            .with_context(|| format!("invalid recipient address {:?}", cfg.to))?;
        Ok(Self { mailer, from, to })
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn send_artifact(&self, subject: &str, body: &str, attachment: &Path) -> Result<()> {
        let filename = attachment
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "digest.epub".to_string());
        let bytes = tokio::fs::read(attachment)
            .await
            .with_context(|| format!("reading artifact {}", attachment.display()))?;
        let epub_type = ContentType::parse("application/epub+zip").context("attachment type")?;

        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(body.to_string()),
                    )
                    .singlepart(Attachment::new(filename).body(bytes, epub_type)),
            )
            .context("building message")?;

        self.mailer.send(msg).await.context("sending message")?;
        Ok(())
    }
}
