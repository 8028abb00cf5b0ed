//! Fire-and-forget notification delivery
//!
//! The travels service only enqueues; delivery belongs to the mailer
//! collaborator. The queue is an unbounded channel drained by a spawned
//! worker that POSTs each notification to the mailer endpoint with bounded
//! retry. Neither enqueueing nor delivery failure ever affects the state
//! machine's outcome.

use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// A message for the mailer: subject, body and recipient addresses
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

/// Accepts notification jobs without blocking the caller
pub trait Notifier: Send + Sync {
    fn enqueue(&self, notification: Notification);
}

/// Queue handle backed by the mailer delivery worker
#[derive(Clone)]
pub struct MailerNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl MailerNotifier {
    /// Spawn the delivery worker and return the queue handle
    pub fn spawn(mailer_url: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Notification>();

        tokio::spawn(async move {
            let client = Client::new();
            while let Some(notification) = rx.recv().await {
                deliver(&client, &mailer_url, &notification).await;
            }
        });

        Self { tx }
    }
}

impl Notifier for MailerNotifier {
    fn enqueue(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            warn!("Notification worker is gone; dropping notification");
        }
    }
}

async fn deliver(client: &Client, url: &str, notification: &Notification) {
    let max_retries = 3;
    let mut attempt = 0;

    loop {
        attempt += 1;
        match client.post(url).json(notification).send().await {
            Ok(res) if res.status().is_success() => {
                info!(
                    "Delivered notification '{}' to {} recipient(s)",
                    notification.subject,
                    notification.recipients.len()
                );
                return;
            }
            Ok(res) => {
                warn!(
                    "Mailer responded with {} (attempt {}/{})",
                    res.status(),
                    attempt,
                    max_retries
                );
            }
            Err(e) => {
                warn!(
                    "Failed to reach mailer (attempt {}/{}): {}",
                    attempt, max_retries, e
                );
            }
        }

        if attempt >= max_retries {
            error!(
                "Giving up on notification '{}' after {} attempts",
                notification.subject, max_retries
            );
            return;
        }
        tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
    }
}
