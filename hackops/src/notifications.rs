//! Owner notifications.
//!
//! [`LogNotifier`] writes messages to the log (development, or when no
//! transport is configured). [`SlackNotifier`] posts them to a Slack incoming
//! webhook.

use crate::types::Bag;
use hackops_core::notify::{Notifier, NotifyError, NotifyFuture};
use serde::Serialize;
use std::time::Duration;

/// Message sent to the owner after check-in.
#[must_use]
pub fn check_in_message(bag: &Bag) -> String {
    format!(
        "Baggage check-in: you've registered a bag with ID `{}` located at `{}`. \
         Remember to take it before leaving!",
        bag.id,
        bag.position.label()
    )
}

/// Message sent to the owner after check-out.
#[must_use]
pub fn check_out_message(bag: &Bag) -> String {
    format!(
        "Baggage check-out: your bag with ID `{}` has been checked-out!",
        bag.id
    )
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, recipient: &str, message: String) -> NotifyFuture<'_> {
        tracing::info!(recipient, %message, "Notification");
        Box::pin(async { Ok(()) })
    }
}

#[derive(Serialize)]
struct SlackPayload<'a> {
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel: Option<&'a str>,
}

/// Notifier posting to a Slack incoming webhook.
///
/// The recipient id is put in front of the message; mapping identities to
/// Slack handles is the identity provider's job.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: reqwest::Client,
    webhook_url: String,
    channel: Option<String>,
}

impl SlackNotifier {
    /// Create a notifier for one webhook.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Transport`] if the HTTP client cannot be built.
    pub fn new(webhook_url: impl Into<String>, channel: Option<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            webhook_url: webhook_url.into(),
            channel,
        })
    }
}

impl Notifier for SlackNotifier {
    fn notify(&self, recipient: &str, message: String) -> NotifyFuture<'_> {
        let payload_text = format!("[{recipient}] {message}");
        Box::pin(async move {
            let payload = SlackPayload {
                text: payload_text,
                channel: self.channel.as_deref(),
            };
            let response = self
                .client
                .post(&self.webhook_url)
                .json(&payload)
                .send()
                .await
                .map_err(|e| NotifyError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return Ok(());
            }
            let reason = response.text().await.unwrap_or_default();
            Err(NotifyError::Rejected {
                status: status.as_u16(),
                reason,
            })
        })
    }
}
