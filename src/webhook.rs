//! HTTP status sink.
//!
//! Syncs premium-state events to an application endpoint, one JSON POST
//! per event, optionally signed with HMAC-SHA256 over the body so the
//! receiver can verify origin. Quick retries (100ms, 200ms) keep a slow
//! endpoint from stalling a purchase for long; exhausted retries return
//! an error, which the syncer logs and swallows.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Serialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{PaywallError, Result};
use crate::models::CustomerInfo;
use crate::sync::{SinkError, StatusSink};

type HmacSha256 = Hmac<Sha256>;

/// Retry delays in milliseconds. Total worst case: 300ms of waiting.
const RETRY_DELAYS_MS: &[u64] = &[100, 200];

pub const EVENT_HEADER: &str = "X-Paywall-Event";
pub const SIGNATURE_HEADER: &str = "X-Paywall-Signature";

/// One webhook event. The idempotency key is fresh per send so the
/// receiver can deduplicate our retries without collapsing distinct
/// events.
#[derive(Debug, Serialize)]
struct WebhookEvent<'a> {
    event: &'a str,
    idempotency_key: String,
    timestamp: i64,
    user_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_premium: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    product_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    customer_info: Option<&'a CustomerInfo>,
}

impl<'a> WebhookEvent<'a> {
    fn new(event: &'a str, user_id: &'a str) -> Self {
        Self {
            event,
            idempotency_key: Uuid::new_v4().to_string(),
            timestamp: Utc::now().timestamp(),
            user_id,
            is_premium: None,
            product_id: None,
            expires_at: None,
            customer_info: None,
        }
    }
}

#[derive(Debug)]
pub struct WebhookSink {
    client: Client,
    url: String,
    secret: Option<String>,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        reqwest::Url::parse(&url)
            .map_err(|e| PaywallError::InvalidConfiguration(format!("invalid webhook URL: {}", e)))?;

        Ok(Self {
            client: Client::new(),
            url,
            secret: None,
        })
    }

    /// Sign outbound bodies; the hex digest lands in `X-Paywall-Signature`.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    fn sign(secret: &str, body: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| PaywallError::InvalidConfiguration("invalid webhook secret".into()))?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// POST one event, retrying on transport errors, 429 and 5xx.
    /// Non-transient 4xx responses fail immediately.
    async fn send_event(&self, event: &str, body: Vec<u8>) -> Result<()> {
        let signature = match &self.secret {
            Some(secret) => Some(Self::sign(secret, &body)?),
            None => None,
        };

        for (attempt, delay_ms) in std::iter::once(&0u64)
            .chain(RETRY_DELAYS_MS.iter())
            .enumerate()
        {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
            }

            let mut request = self
                .client
                .post(&self.url)
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .header(EVENT_HEADER, event)
                .body(body.clone())
                .timeout(Duration::from_secs(5));
            if let Some(signature) = &signature {
                request = request.header(SIGNATURE_HEADER, signature);
            }

            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    if attempt > 0 {
                        tracing::debug!("Status webhook succeeded after {} retries", attempt);
                    }
                    return Ok(());
                }
                Ok(resp)
                    if resp.status().as_u16() == 429 || resp.status().is_server_error() =>
                {
                    tracing::debug!("Status webhook returned {}", resp.status());
                }
                Ok(resp) => {
                    return Err(PaywallError::Network(format!(
                        "status webhook rejected {} with {}",
                        event,
                        resp.status()
                    )));
                }
                Err(e) => {
                    tracing::debug!("Status webhook failed: {}", e);
                }
            }
        }

        Err(PaywallError::Network(format!(
            "status webhook unreachable after {} attempts",
            RETRY_DELAYS_MS.len() + 1
        )))
    }
}

#[async_trait]
impl StatusSink for WebhookSink {
    async fn premium_status_changed(
        &self,
        user_id: &str,
        is_premium: bool,
        product_id: Option<&str>,
        expires_at: Option<&str>,
    ) -> std::result::Result<(), SinkError> {
        let mut event = WebhookEvent::new("premium_status_changed", user_id);
        event.is_premium = Some(is_premium);
        event.product_id = product_id;
        event.expires_at = expires_at;

        let body = serde_json::to_vec(&event)?;
        self.send_event(event.event, body).await?;
        Ok(())
    }

    async fn purchase_completed(
        &self,
        user_id: &str,
        product_id: &str,
        info: &CustomerInfo,
    ) -> std::result::Result<(), SinkError> {
        let mut event = WebhookEvent::new("purchase_completed", user_id);
        event.product_id = Some(product_id);
        event.customer_info = Some(info);

        let body = serde_json::to_vec(&event)?;
        self.send_event(event.event, body).await?;
        Ok(())
    }

    async fn restore_completed(
        &self,
        user_id: &str,
        is_premium: bool,
        info: &CustomerInfo,
    ) -> std::result::Result<(), SinkError> {
        let mut event = WebhookEvent::new("restore_completed", user_id);
        event.is_premium = Some(is_premium);
        event.customer_info = Some(info);

        let body = serde_json::to_vec(&event)?;
        self.send_event(event.event, body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_retry_delays_are_quick() {
        let total: u64 = RETRY_DELAYS_MS.iter().sum();
        assert!(total < 500, "retries must not stall a purchase");
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let err = WebhookSink::new("not a url").unwrap_err();
        assert_eq!(err.code(), "INVALID_CONFIGURATION");
        assert!(WebhookSink::new("https://api.example.com/paywall").is_ok());
    }

    #[test]
    fn test_signature_is_hex_sha256_of_body() {
        let sig = WebhookSink::sign("secret", b"{\"event\":\"x\"}").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        // Deterministic for a fixed secret and body.
        assert_eq!(sig, WebhookSink::sign("secret", b"{\"event\":\"x\"}").unwrap());
        assert_ne!(sig, WebhookSink::sign("other", b"{\"event\":\"x\"}").unwrap());
    }

    #[test]
    fn test_event_payload_shape() {
        let mut event = WebhookEvent::new("premium_status_changed", "user_1");
        event.is_premium = Some(true);
        event.product_id = Some("premium_monthly");
        event.expires_at = Some("2026-09-23T12:00:00+00:00");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"premium_status_changed\""));
        assert!(json.contains("\"user_id\":\"user_1\""));
        assert!(json.contains("\"idempotency_key\""));
        assert!(json.contains("\"timestamp\""));
        assert!(!json.contains("customer_info"));
    }

    #[test]
    fn test_idempotency_keys_unique_per_event() {
        let keys: HashSet<String> = (0..100)
            .map(|_| WebhookEvent::new("purchase_completed", "user_1").idempotency_key)
            .collect();
        assert_eq!(keys.len(), 100);
    }
}
