use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

/// Outbound mail goes through an HTTP relay; SMTP itself stays outside this
/// service. Without a configured relay the mailer logs and drops, which keeps
/// local development working.
pub struct Mailer {
    http: reqwest::Client,
    relay_url: Option<String>,
    api_key: String,
    sender: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

impl Mailer {
    pub fn from_env(http: reqwest::Client) -> Self {
        let relay_url = std::env::var("LEVELUP_MAIL_RELAY_URL").ok();
        if relay_url.is_none() {
            warn!("LEVELUP_MAIL_RELAY_URL not set; outbound mail will be dropped");
        }
        Mailer {
            http,
            relay_url,
            api_key: std::env::var("LEVELUP_MAIL_RELAY_KEY").unwrap_or_default(),
            sender: std::env::var("LEVELUP_MAIL_SENDER")
                .unwrap_or_else(|_| "noreply@levelup.local".into()),
        }
    }

    pub async fn send(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        let Some(relay_url) = &self.relay_url else {
            info!("mail relay disabled, dropping message to {}", to);
            return Ok(());
        };

        self.http
            .post(relay_url)
            .bearer_auth(&self.api_key)
            .json(&RelayMessage {
                from: &self.sender,
                to,
                subject,
                body,
            })
            .send()
            .await?
            .error_for_status()
            .with_context(|| format!("mail relay refused message to {}", to))?;

        Ok(())
    }
}
