use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaywallError {
    #[error("Purchase service is not initialized")]
    NotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Purchase failed for {product_id}: {message}")]
    PurchaseFailed { product_id: String, message: String },

    #[error("Purchase completed but entitlement not active for {product_id}")]
    PurchaseIncomplete { product_id: String },

    #[error("Restore purchases failed: {0}")]
    RestoreFailed(String),

    #[error("Purchases are not available in this host environment")]
    HostRestricted,

    #[error("Network error: {0}")]
    Network(String),
}

impl PaywallError {
    /// Machine-readable error code, stable across message wording changes.
    pub fn code(&self) -> &'static str {
        match self {
            PaywallError::NotInitialized => "NOT_INITIALIZED",
            PaywallError::InvalidConfiguration(_) => "INVALID_CONFIGURATION",
            PaywallError::PurchaseFailed { .. } => "PURCHASE_FAILED",
            PaywallError::PurchaseIncomplete { .. } => "PURCHASE_INCOMPLETE",
            PaywallError::RestoreFailed(_) => "RESTORE_FAILED",
            PaywallError::HostRestricted => "HOST_RESTRICTED",
            PaywallError::Network(_) => "NETWORK_ERROR",
        }
    }

    /// Product identifier attached to purchase errors, if any.
    pub fn product_id(&self) -> Option<&str> {
        match self {
            PaywallError::PurchaseFailed { product_id, .. }
            | PaywallError::PurchaseIncomplete { product_id } => Some(product_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PaywallError>;
