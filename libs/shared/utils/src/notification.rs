use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use shared_config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    BookingConfirmed,
    AppointmentRescheduled,
    AppointmentsSwapped,
    EmergencyRegistered,
}

/// Outbound notification channel (SMS gateway, e-mail relay, ...).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(&self, kind: NotificationKind, payload: Value) -> Result<()>;
}

/// Fire-and-forget delivery. Failures are logged and dropped; the returned
/// handle exists only so tests can wait for delivery.
pub fn dispatch_notification(
    port: Arc<dyn NotificationPort>,
    kind: NotificationKind,
    payload: Value,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        match port.notify(kind, payload).await {
            Ok(()) => debug!("Notification {:?} delivered", kind),
            Err(e) => warn!("Notification {:?} could not be delivered: {}", kind, e),
        }
    })
}

pub fn notifier_from_config(config: &AppConfig) -> Arc<dyn NotificationPort> {
    match &config.notification_webhook_url {
        Some(url) => Arc::new(WebhookNotifier::new(url.clone())),
        None => Arc::new(LogNotifier),
    }
}

pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl NotificationPort for WebhookNotifier {
    async fn notify(&self, kind: NotificationKind, payload: Value) -> Result<()> {
        debug!("Posting {:?} notification to {}", kind, self.url);

        let body = json!({
            "kind": kind,
            "payload": payload,
            "sent_at": Utc::now().to_rfc3339(),
        });

        let response = self.client.post(&self.url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Notification webhook error ({}): {}", status, error_text));
        }

        Ok(())
    }
}

/// Used when no delivery channel is configured.
pub struct LogNotifier;

#[async_trait]
impl NotificationPort for LogNotifier {
    async fn notify(&self, kind: NotificationKind, payload: Value) -> Result<()> {
        info!("Notification {:?}: {}", kind, payload);
        Ok(())
    }
}
