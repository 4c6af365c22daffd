use crate::api::{ApiError, ApiResult};
use crate::config::Config;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

/// Sends email through the SMTP relay configured in `[smtp]`.
pub struct Mailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl Mailer {
    pub fn new(config: &Config) -> ApiResult<Self> {
        let smtp = config.smtp.as_ref().ok_or(ApiError::MissingSmtpInfo)?;
        let credentials = Credentials::new(smtp.username.clone(), smtp.password.clone());
        let transport = SmtpTransport::relay(&smtp.relay)?.credentials(credentials).build();
        Ok(Self {
            transport,
            from: smtp.from.clone(),
        })
    }

    /// Sends a message with both an HTML and a plain text rendition of the same content.
    pub fn send(&self, to: Mailbox, subject: &str, html: String, text: String) -> ApiResult<()> {
        let message = compose(self.from.clone(), to, subject, html, text)?;
        self.transport.send(&message)?;
        info!("Sent '{subject}' email");
        Ok(())
    }
}

fn compose(
    from: Mailbox,
    to: Mailbox,
    subject: &str,
    html: String,
    text: String,
) -> Result<Message, lettre::error::Error> {
    Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .multipart(MultiPart::alternative_plain_html(text, html))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;

    #[test]
    fn alternative_bodies() {
        let from: Mailbox = "Gearboard <noreply@gearboard.example>".parse().unwrap();
        let to: Mailbox = "driver@example.com".parse().unwrap();
        let message = compose(
            from,
            to,
            "Password Reset Request",
            String::from("<p>Reset link</p>"),
            String::from("Reset link"),
        )
        .unwrap();

        let formatted = String::from_utf8(message.formatted()).unwrap();
        assert!(formatted.contains("Subject: Password Reset Request"));
        assert!(formatted.contains("multipart/alternative"));
        assert!(formatted.contains("text/plain"));
        assert!(formatted.contains("<p>Reset link</p>"));
    }

    #[test]
    fn requires_smtp_info() {
        let config = config::test_config(None);
        assert!(config.smtp.is_none());
        assert!(matches!(Mailer::new(&config), Err(ApiError::MissingSmtpInfo)));
    }
}
