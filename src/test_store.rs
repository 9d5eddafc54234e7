//! In-process test-store backend.
//!
//! Stands in for a real store in sandbox and development builds: grants
//! entitlements according to a configured product catalog, pushes
//! customer-info updates the way a store pushes renewal/expiration
//! events, and can simulate declines and expirations.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::backend::{BackendError, PurchaseBackend, PurchaseConfirmation};
use crate::models::{CustomerInfo, EntitlementInfo, Offerings, Package, PeriodType};

/// Product → entitlement wiring, standing in for the dashboard-side
/// configuration of a real purchase backend.
#[derive(Debug, Clone)]
struct Grant {
    entitlement_id: String,
    access: Duration,
}

pub struct TestStoreBackend {
    offerings: Offerings,
    grants: HashMap<String, Grant>,
    state: Mutex<StoreState>,
    updates: broadcast::Sender<CustomerInfo>,
}

#[derive(Default)]
struct StoreState {
    api_key: Option<String>,
    user_id: Option<String>,
    active: HashMap<String, EntitlementInfo>,
    all: HashMap<String, EntitlementInfo>,
    next_purchase_rejection: Option<BackendError>,
    next_restore_rejection: Option<BackendError>,
}

impl TestStoreBackend {
    pub fn new(offerings: Offerings) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            offerings,
            grants: HashMap::new(),
            state: Mutex::new(StoreState::default()),
            updates,
        }
    }

    /// Map a product to the entitlement it grants and its access window.
    /// Purchasing an unmapped product succeeds without granting anything.
    pub fn with_grant(
        mut self,
        product_id: impl Into<String>,
        entitlement_id: impl Into<String>,
        access: Duration,
    ) -> Self {
        self.grants.insert(
            product_id.into(),
            Grant {
                entitlement_id: entitlement_id.into(),
                access,
            },
        );
        self
    }

    /// Key recorded by the last `configure` call, if any.
    pub fn configured_key(&self) -> Option<String> {
        self.lock().api_key.clone()
    }

    /// Queue a one-shot decline for the next purchase call.
    pub fn reject_next_purchase(&self, user_cancelled: bool) {
        let rejection = if user_cancelled {
            BackendError::cancelled()
        } else {
            BackendError::new("Test store declined the purchase").with_code("STORE_DECLINED")
        };
        self.lock().next_purchase_rejection = Some(rejection);
    }

    /// Queue a one-shot failure for the next restore call.
    pub fn reject_next_restore(&self) {
        self.lock().next_restore_rejection =
            Some(BackendError::new("Test store restore failed").with_code("STORE_UNAVAILABLE"));
    }

    /// Drop an active grant and push the resulting customer info, as a
    /// store would on expiration or a billing issue.
    pub fn simulate_expiration(&self, entitlement_id: &str) {
        let info = {
            let mut state = self.lock();
            if let Some(mut entitlement) = state.active.remove(entitlement_id) {
                entitlement.expiration_date = Some(Utc::now() - Duration::seconds(1));
                entitlement.will_renew = false;
                state.all.insert(entitlement_id.to_owned(), entitlement);
            }
            Self::snapshot(&state)
        };
        self.push_update(info);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("test store lock poisoned")
    }

    fn snapshot(state: &StoreState) -> CustomerInfo {
        CustomerInfo {
            original_app_user_id: state.user_id.clone().unwrap_or_default(),
            request_date: Utc::now(),
            active_entitlements: state.active.clone(),
            all_entitlements: state.all.clone(),
        }
    }

    fn push_update(&self, info: CustomerInfo) {
        // No receivers is fine; the service may not be listening yet.
        let _ = self.updates.send(info);
    }
}

#[async_trait]
impl PurchaseBackend for TestStoreBackend {
    async fn configure(&self, api_key: &str, app_user_id: &str) -> Result<(), BackendError> {
        let mut state = self.lock();
        if state.user_id.as_deref() != Some(app_user_id) {
            state.active.clear();
            state.all.clear();
        }
        state.api_key = Some(api_key.to_owned());
        state.user_id = Some(app_user_id.to_owned());
        Ok(())
    }

    async fn get_customer_info(&self) -> Result<CustomerInfo, BackendError> {
        let state = self.lock();
        if state.user_id.is_none() {
            return Err(BackendError::new("Test store is not configured"));
        }
        Ok(Self::snapshot(&state))
    }

    async fn get_offerings(&self) -> Result<Offerings, BackendError> {
        Ok(self.offerings.clone())
    }

    async fn purchase_package(
        &self,
        package: &Package,
    ) -> Result<PurchaseConfirmation, BackendError> {
        let (info, granted) = {
            let mut state = self.lock();
            if let Some(rejection) = state.next_purchase_rejection.take() {
                return Err(rejection);
            }
            if state.user_id.is_none() {
                return Err(BackendError::new("Test store is not configured"));
            }

            let granted = match self.grants.get(&package.product.identifier) {
                Some(grant) => {
                    let now = Utc::now();
                    let entitlement = EntitlementInfo {
                        identifier: grant.entitlement_id.clone(),
                        product_identifier: package.product.identifier.clone(),
                        is_sandbox: true,
                        will_renew: true,
                        period_type: PeriodType::Normal,
                        latest_purchase_date: Some(now),
                        original_purchase_date: Some(now),
                        expiration_date: Some(now + grant.access),
                        unsubscribe_detected_at: None,
                        billing_issue_detected_at: None,
                    };
                    state
                        .active
                        .insert(grant.entitlement_id.clone(), entitlement.clone());
                    state.all.insert(grant.entitlement_id.clone(), entitlement);
                    true
                }
                None => false,
            };

            (Self::snapshot(&state), granted)
        };

        if granted {
            self.push_update(info.clone());
        }

        Ok(PurchaseConfirmation {
            transaction_id: format!("test_txn_{}", Uuid::new_v4().simple()),
            customer_info: info,
        })
    }

    async fn restore_purchases(&self) -> Result<CustomerInfo, BackendError> {
        let mut state = self.lock();
        if let Some(rejection) = state.next_restore_rejection.take() {
            return Err(rejection);
        }
        if state.user_id.is_none() {
            return Err(BackendError::new("Test store is not configured"));
        }
        Ok(Self::snapshot(&state))
    }

    async fn log_out(&self) -> Result<(), BackendError> {
        let mut state = self.lock();
        state.user_id = None;
        state.active.clear();
        state.all.clear();
        Ok(())
    }

    fn customer_info_updates(&self) -> broadcast::Receiver<CustomerInfo> {
        self.updates.subscribe()
    }
}
