//! Premium status sync and completion notifications.
//!
//! Every callback runs inside its own failure boundary: an `Err` or a
//! panic is caught and logged, and one notification failing never
//! prevents the others from running. A failing database sync must never
//! make a successful purchase or restore appear failed.

use std::future::Future;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;

use crate::config::Config;
use crate::entitlement::{expiration_date, premium_entitlement};
use crate::models::CustomerInfo;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Application-side receiver of premium-state events, typically a
/// database writer or an HTTP endpoint. Every method defaults to a
/// no-op so implementors opt into only the events they need.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn premium_status_changed(
        &self,
        _user_id: &str,
        _is_premium: bool,
        _product_id: Option<&str>,
        _expires_at: Option<&str>,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    async fn purchase_completed(
        &self,
        _user_id: &str,
        _product_id: &str,
        _info: &CustomerInfo,
    ) -> Result<(), SinkError> {
        Ok(())
    }

    async fn restore_completed(
        &self,
        _user_id: &str,
        _is_premium: bool,
        _info: &CustomerInfo,
    ) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sync premium status to the configured sink.
///
/// Entitlement active: `premium_status_changed(user, true, product_id,
/// expires_at)`. Not active: `premium_status_changed(user, false)`.
pub async fn sync_premium_status(config: &Config, user_id: &str, info: &CustomerInfo) {
    let Some(sink) = config.sink.as_ref() else {
        return;
    };

    let record = premium_entitlement(info, &config.entitlement_id);
    let call = async {
        match &record {
            Some(record) => {
                let expires_at =
                    expiration_date(record, config.expiration_calculator.as_deref());
                sink.premium_status_changed(
                    user_id,
                    true,
                    Some(&record.product_identifier),
                    expires_at.as_deref(),
                )
                .await
            }
            None => sink.premium_status_changed(user_id, false, None, None).await,
        }
    };

    guard(call, "premium status sync").await;
}

pub async fn notify_purchase_completed(
    config: &Config,
    user_id: &str,
    product_id: &str,
    info: &CustomerInfo,
) {
    let Some(sink) = config.sink.as_ref() else {
        return;
    };
    guard(
        sink.purchase_completed(user_id, product_id, info),
        "purchase completion",
    )
    .await;
}

pub async fn notify_restore_completed(
    config: &Config,
    user_id: &str,
    is_premium: bool,
    info: &CustomerInfo,
) {
    let Some(sink) = config.sink.as_ref() else {
        return;
    };
    guard(
        sink.restore_completed(user_id, is_premium, info),
        "restore completion",
    )
    .await;
}

/// Run one callback inside an isolated failure boundary.
async fn guard<F>(call: F, what: &str)
where
    F: Future<Output = Result<(), SinkError>>,
{
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!("{} callback failed: {}", what, e);
        }
        Err(panic) => {
            let panic_msg = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!("{} callback panicked: {}", what, panic_msg);
        }
    }
}
