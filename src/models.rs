//! Wire-level models exchanged with purchase backends, and the result
//! shapes returned by the service operations.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product identifier substrings marking one-time consumable products.
pub const CONSUMABLE_MARKERS: &[&str] = &["credits", "consumable"];

/// A product is consumable (one-time purchase, no entitlement) when its
/// identifier contains one of the known markers, case-insensitively.
pub fn is_consumable_product(product_id: &str) -> bool {
    let lowered = product_id.to_ascii_lowercase();
    CONSUMABLE_MARKERS.iter().any(|m| lowered.contains(m))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Normal,
    Trial,
    Intro,
}

/// Raw entitlement data as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitlementInfo {
    pub identifier: String,
    pub product_identifier: String,
    pub is_sandbox: bool,
    pub will_renew: bool,
    pub period_type: PeriodType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_purchase_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_purchase_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribe_detected_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_issue_detected_at: Option<DateTime<Utc>>,
}

/// Raw customer info returned by the backend. Entitlement maps are keyed
/// by entitlement identifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub original_app_user_id: String,
    pub request_date: DateTime<Utc>,
    pub active_entitlements: HashMap<String, EntitlementInfo>,
    pub all_entitlements: HashMap<String, EntitlementInfo>,
}

impl CustomerInfo {
    /// Customer info with no entitlements, as a fresh user would have.
    pub fn empty(app_user_id: &str) -> Self {
        Self {
            original_app_user_id: app_user_id.to_owned(),
            request_date: Utc::now(),
            active_entitlements: HashMap::new(),
            all_entitlements: HashMap::new(),
        }
    }

    pub fn has_active(&self, entitlement_id: &str) -> bool {
        self.active_entitlements.contains_key(entitlement_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreProduct {
    pub identifier: String,
    pub title: String,
    pub price_cents: i64,
    /// Currency code (lowercase, e.g. "usd")
    pub currency: String,
}

/// A purchasable package inside an offering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub identifier: String,
    pub product: StoreProduct,
}

/// A backend-curated bundle of packages presented to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offering {
    pub identifier: String,
    pub packages: Vec<Package>,
}

impl Offering {
    pub fn package(&self, identifier: &str) -> Option<&Package> {
        self.packages.iter().find(|p| p.identifier == identifier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offerings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<Offering>,
    pub all: HashMap<String, Offering>,
}

/// Result of [`initialize`](crate::service::PurchaseService::initialize).
/// Initialization never raises; failure is signaled only through `success`.
#[derive(Debug, Clone, Serialize)]
pub struct InitializeOutcome {
    pub success: bool,
    pub has_premium: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offering: Option<Offering>,
}

impl InitializeOutcome {
    pub fn succeeded(offering: Option<Offering>, has_premium: bool) -> Self {
        Self {
            success: true,
            has_premium,
            offering,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            has_premium: false,
            offering: None,
        }
    }
}

/// Result of a purchase. Constructed per outcome so fields are never
/// partially populated.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseOutcome {
    pub success: bool,
    pub is_premium: bool,
    pub is_consumable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,
}

impl PurchaseOutcome {
    /// Subscription purchase with the entitlement verified active.
    pub fn subscription(customer_info: CustomerInfo) -> Self {
        Self {
            success: true,
            is_premium: true,
            is_consumable: false,
            product_id: None,
            customer_info: Some(customer_info),
        }
    }

    /// Consumable purchase: the backend call succeeding is itself
    /// sufficient, no entitlement is involved.
    pub fn consumable(product_id: impl Into<String>) -> Self {
        Self {
            success: true,
            is_premium: false,
            is_consumable: true,
            product_id: Some(product_id.into()),
            customer_info: None,
        }
    }

    /// The user dismissed the store dialog. A normal result, not an error.
    pub fn cancelled() -> Self {
        Self {
            success: false,
            is_premium: false,
            is_consumable: false,
            product_id: None,
            customer_info: None,
        }
    }
}

/// Result of a restore.
///
/// `success` mirrors `is_premium`: it means "premium entitlement active
/// after restore", not "restore call succeeded". Downstream callback
/// behavior depends on this, so it is part of the contract.
#[derive(Debug, Clone, Serialize)]
pub struct RestoreOutcome {
    pub success: bool,
    pub is_premium: bool,
    pub customer_info: CustomerInfo,
}

impl RestoreOutcome {
    pub fn new(is_premium: bool, customer_info: CustomerInfo) -> Self {
        Self {
            success: is_premium,
            is_premium,
            customer_info,
        }
    }
}
