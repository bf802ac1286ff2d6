use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{info, warn};

use crate::config::PAYOUT_RETRY_BACKOFF_MS;
use crate::error::{AppError, Result};
use crate::types::PayoutNotification;

#[async_trait]
pub trait PayoutNotifier: Send + Sync {
    async fn notify_payout(&self, notification: &PayoutNotification) -> Result<()>;
}

/// POST client for the downstream payout service.
///
/// Delivery is at-least-once: transport failures and 5xx responses are
/// retried on the backoff schedule, 4xx responses fail immediately. A caller
/// that still sees an error after the schedule is exhausted must park the bet
/// in its recoverable failed state.
pub struct HttpPayoutClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPayoutClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
}

#[async_trait]
impl PayoutNotifier for HttpPayoutClient {
    async fn notify_payout(&self, notification: &PayoutNotification) -> Result<()> {
        let url = format!("{}/payouts", self.base_url);

        let mut attempt = 0usize;
        loop {
            let failure = match self.client.post(&url).json(notification).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!(
                        user_id = %notification.user_id,
                        amount = notification.amount,
                        "payout service notified"
                    );
                    return Ok(());
                }
                Ok(resp) if is_retryable(resp.status()) => {
                    AppError::PayoutStatus(resp.status().as_u16())
                }
                Ok(resp) => return Err(AppError::PayoutStatus(resp.status().as_u16())),
                Err(e) => AppError::Http(e),
            };

            let Some(backoff_ms) = PAYOUT_RETRY_BACKOFF_MS.get(attempt) else {
                return Err(failure);
            };
            warn!(
                user_id = %notification.user_id,
                attempt = attempt + 1,
                backoff_ms,
                error = %failure,
                "payout notification failed, retrying"
            );
            tokio::time::sleep(Duration::from_millis(*backoff_ms)).await;
            attempt += 1;
        }
    }
}
