//! Presentation binding.
//!
//! Exposes offering + loading state over a watch channel for a UI layer.
//! Forwards to the service and tracks the loading flag; no independent
//! logic.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::Result;
use crate::models::{InitializeOutcome, Offering, Package, PurchaseOutcome, RestoreOutcome};
use crate::service::PurchaseService;

#[derive(Debug, Clone, Default)]
pub struct ControllerState {
    pub offering: Option<Offering>,
    pub loading: bool,
}

pub struct PaywallController {
    service: Arc<PurchaseService>,
    state: watch::Sender<ControllerState>,
}

impl PaywallController {
    pub fn new(service: Arc<PurchaseService>) -> Self {
        let (state, _) = watch::channel(ControllerState::default());
        Self { service, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ControllerState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ControllerState {
        self.state.borrow().clone()
    }

    /// Initialize the service; on success the current offering is
    /// published. The loading flag is cleared either way.
    pub async fn initialize(&self, user_id: &str, api_key: Option<&str>) -> InitializeOutcome {
        self.set_loading(true);
        let outcome = self.service.initialize(user_id, api_key).await;
        self.state.send_modify(|s| {
            if outcome.success {
                s.offering = outcome.offering.clone();
            }
            s.loading = false;
        });
        outcome
    }

    /// Refresh the published offering. Unlike `initialize`, the result is
    /// stored even when it is `None`.
    pub async fn load_offerings(&self) -> Option<Offering> {
        self.set_loading(true);
        let offering = self.service.fetch_offerings().await;
        self.state.send_modify(|s| {
            s.offering = offering.clone();
            s.loading = false;
        });
        offering
    }

    pub async fn purchase_package(
        &self,
        package: &Package,
        user_id: &str,
    ) -> Result<PurchaseOutcome> {
        self.service.purchase_package(package, user_id).await
    }

    pub async fn restore_purchases(&self, user_id: &str) -> Result<RestoreOutcome> {
        self.service.restore_purchases(user_id).await
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_modify(|s| s.loading = loading);
    }
}
