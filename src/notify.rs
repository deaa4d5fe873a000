//! Escalation notification to the human support channel.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Serialize;

use crate::config::NotifyConfig;
use crate::error::NotifyError;

/// Everything a human agent needs to pick up an escalated conversation.
#[derive(Debug, Clone)]
pub struct Ticket {
    /// 8-character uppercase token, unique per ticket.
    pub id: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub original_question: String,
    pub current_question: String,
    pub issue_summary: String,
}

/// Delivery seam for escalation tickets.
///
/// Delivery failure never blocks ticket creation; callers only use the
/// outcome to pick the confirmation wording.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, ticket: &Ticket) -> Result<(), NotifyError>;
}

/// Posts tickets to an incoming-webhook URL (Slack-style `text` payload).
pub struct WebhookNotifier {
    client: Client,
    config: NotifyConfig,
}

#[derive(Serialize)]
struct WebhookPayload {
    text: String,
}

impl WebhookNotifier {
    pub fn new(config: NotifyConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()?;
        Ok(Self { client, config })
    }

    fn render_text(ticket: &Ticket) -> String {
        format!(
            ":rotating_light: *New Escalation Ticket* :rotating_light:\n\
             *Ticket ID:* {}\n\
             *User Contact Information:*\n\
             \u{2022} Phone: {}\n\
             \u{2022} Email: {}\n\
             *Original Question:* {}\n\
             *Most Recent Query:* {}\n\
             *Issue Summary:* {}",
            ticket.id,
            ticket.contact_phone,
            ticket.contact_email,
            ticket.original_question,
            ticket.current_question,
            ticket.issue_summary,
        )
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, ticket: &Ticket) -> Result<(), NotifyError> {
        let url = self
            .config
            .webhook_url
            .as_ref()
            .ok_or(NotifyError::NotConfigured)?;

        let payload = WebhookPayload {
            text: Self::render_text(ticket),
        };

        let response = self
            .client
            .post(url.expose_secret())
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::DeliveryFailed {
                status: status.as_u16(),
            });
        }

        tracing::info!(ticket_id = %ticket.id, "escalation delivered to support channel");
        Ok(())
    }
}
