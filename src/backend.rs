//! The purchase backend seam.
//!
//! Applications implement [`PurchaseBackend`] over their platform's store
//! bridge; the crate ships [`TestStoreBackend`](crate::test_store::TestStoreBackend)
//! for sandbox and development builds.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::{CustomerInfo, Offerings, Package};

/// Failure reported by a purchase backend.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    /// Backend-specific machine code, if one was reported.
    pub code: Option<String>,
    /// Set when the user dismissed the store dialog; cancellation is a
    /// normal outcome, not a failure.
    pub user_cancelled: bool,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            user_cancelled: false,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn cancelled() -> Self {
        Self {
            message: "Purchase cancelled by user".into(),
            code: Some("USER_CANCELLED".into()),
            user_cancelled: true,
        }
    }
}

/// Backend acknowledgement of a completed purchase.
#[derive(Debug, Clone)]
pub struct PurchaseConfirmation {
    pub transaction_id: String,
    pub customer_info: CustomerInfo,
}

/// Transaction mechanics of a store backend. The backend is authoritative
/// for buy/restore/entitlement-at-call-time only; durable premium state
/// lives in the application's database.
#[async_trait]
pub trait PurchaseBackend: Send + Sync {
    async fn configure(&self, api_key: &str, app_user_id: &str) -> Result<(), BackendError>;

    async fn get_customer_info(&self) -> Result<CustomerInfo, BackendError>;

    async fn get_offerings(&self) -> Result<Offerings, BackendError>;

    async fn purchase_package(&self, package: &Package)
        -> Result<PurchaseConfirmation, BackendError>;

    async fn restore_purchases(&self) -> Result<CustomerInfo, BackendError>;

    async fn log_out(&self) -> Result<(), BackendError>;

    /// Customer-info updates pushed outside explicit purchase/restore
    /// calls (renewals, expirations, billing issues). The service holds
    /// one receiver per initialized session.
    fn customer_info_updates(&self) -> broadcast::Receiver<CustomerInfo>;
}
