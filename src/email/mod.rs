pub mod templates;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::EmailConfig;

#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    #[error("Email transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Email API rejected message: status={status}, body={body}")]
    Rejected { status: u16, body: String },

    #[error("Email delivery is not configured")]
    NotConfigured,
}

/// Outbound email. Callers log failures; nothing is retried.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError>;
}

#[derive(Serialize)]
struct OutboundEmail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    html: &'a str,
}

/// Posts JSON messages to a transactional email HTTP API
#[derive(Clone)]
pub struct HttpEmailSender {
    client: reqwest::Client,
    config: EmailConfig,
}

impl HttpEmailSender {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), EmailError> {
        if self.config.api_url.is_empty() {
            debug!("No email API configured, dropping message to {}", to);
            return Err(EmailError::NotConfigured);
        }

        let message = OutboundEmail {
            from: &self.config.from,
            to,
            subject,
            html,
        };

        let resp = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&message)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(EmailError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        info!("Sent email \"{}\" to {}", subject, to);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_sender_refuses() {
        let sender = HttpEmailSender::new(EmailConfig {
            api_url: String::new(),
            api_key: String::new(),
            from: "no-reply@example.com".to_string(),
        });

        let result = sender.send("a@b.com", "s", "<p>x</p>").await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }
}
