//! The purchase service: initialization, purchase/restore orchestration,
//! and the out-of-band customer-info change listener.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::backend::PurchaseBackend;
use crate::config::Config;
use crate::env::EnvContext;
use crate::error::{PaywallError, Result};
use crate::keys::resolve_api_key;
use crate::models::{
    is_consumable_product, InitializeOutcome, Offering, Package, PurchaseOutcome, RestoreOutcome,
};
use crate::state::StateManager;
use crate::sync::{notify_purchase_completed, notify_restore_completed, sync_premium_status};

/// Coordinates purchase flows against a backend with a database-first
/// trust model: the backend is consulted for transaction mechanics,
/// durable premium state is synced out through the configured sink.
pub struct PurchaseService {
    backend: Arc<dyn PurchaseBackend>,
    state: Arc<StateManager>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl PurchaseService {
    pub fn new(config: Config, backend: Arc<dyn PurchaseBackend>, env: EnvContext) -> Self {
        Self {
            backend,
            state: Arc::new(StateManager::new(config, env)),
            listener: Mutex::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.is_initialized()
    }

    pub fn is_using_test_store(&self) -> bool {
        self.state.is_using_test_store()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.state.config()
    }

    /// Replace the configuration wholesale; the test-store flag is
    /// recomputed against the environment snapshot.
    pub fn update_config(&self, config: Config) {
        self.state.update_config(config);
    }

    /// API key the service would use, if any resolves.
    pub fn resolve_key(&self) -> Option<String> {
        resolve_api_key(&self.state.config(), &self.state.env())
    }

    /// Initialize the backend session for `user_id`.
    ///
    /// Never raises: every failure mode collapses into an outcome with
    /// `success: false`. An explicit `api_key` wins over key resolution.
    pub async fn initialize(&self, user_id: &str, api_key: Option<&str>) -> InitializeOutcome {
        let env = self.state.env();
        if env.restricted_host && !self.state.is_using_test_store() {
            tracing::warn!("Purchases unavailable in restricted host without a test-store key");
            return InitializeOutcome::failed();
        }

        let Some(key) = api_key.map(str::to_owned).or_else(|| self.resolve_key()) else {
            tracing::warn!("No API key resolved; purchases stay disabled");
            return InitializeOutcome::failed();
        };

        if env.dev_build && self.state.is_using_test_store() {
            tracing::debug!("Using test-store key for development");
        }

        match self.initialize_session(&key, user_id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("Initialization failed: {}", e);
                InitializeOutcome::failed()
            }
        }
    }

    async fn initialize_session(
        &self,
        key: &str,
        user_id: &str,
    ) -> std::result::Result<InitializeOutcome, crate::backend::BackendError> {
        self.backend.configure(key, user_id).await?;
        self.state.set_initialized(true);
        self.attach_listener(user_id);

        let (info, offerings) = tokio::try_join!(
            self.backend.get_customer_info(),
            self.backend.get_offerings()
        )?;

        let has_premium = info.has_active(&self.state.config().entitlement_id);
        Ok(InitializeOutcome::succeeded(offerings.current, has_premium))
    }

    /// Current offering, or `None` when uninitialized, host-restricted
    /// without the test store, or the backend call fails.
    pub async fn fetch_offerings(&self) -> Option<Offering> {
        if !self.state.is_initialized() {
            return None;
        }
        if self.state.env().restricted_host && !self.state.is_using_test_store() {
            return None;
        }

        match self.backend.get_offerings().await {
            Ok(offerings) => offerings.current,
            Err(e) => {
                tracing::debug!("Fetching offerings failed: {}", e);
                None
            }
        }
    }

    /// Purchase a package for `user_id`.
    ///
    /// Consumable products succeed on the backend call alone. For
    /// subscriptions the configured entitlement must be active in the
    /// returned customer info; sync and notification run before the
    /// result is returned. User cancellation is a normal result.
    pub async fn purchase_package(
        &self,
        package: &Package,
        user_id: &str,
    ) -> Result<PurchaseOutcome> {
        self.check_preconditions()?;

        let product_id = package.product.identifier.clone();
        let confirmation = match self.backend.purchase_package(package).await {
            Ok(confirmation) => confirmation,
            Err(e) if e.user_cancelled => {
                tracing::debug!("Purchase of {} cancelled by user", product_id);
                return Ok(PurchaseOutcome::cancelled());
            }
            Err(e) => {
                return Err(PaywallError::PurchaseFailed {
                    product_id,
                    message: e.message,
                })
            }
        };

        if is_consumable_product(&product_id) {
            tracing::debug!(
                "Consumable purchase {} confirmed as {}",
                product_id,
                confirmation.transaction_id
            );
            return Ok(PurchaseOutcome::consumable(product_id));
        }

        let info = confirmation.customer_info;
        let config = self.state.config();
        if info.has_active(&config.entitlement_id) {
            sync_premium_status(&config, user_id, &info).await;
            notify_purchase_completed(&config, user_id, &product_id, &info).await;
            return Ok(PurchaseOutcome::subscription(info));
        }

        // The store-level purchase went through but the entitlement did
        // not activate.
        Err(PaywallError::PurchaseIncomplete { product_id })
    }

    /// Restore previous purchases for `user_id`.
    ///
    /// The restore-completed notification always runs; premium sync only
    /// when the entitlement is active. The outcome's `success` equals the
    /// post-restore premium boolean.
    pub async fn restore_purchases(&self, user_id: &str) -> Result<RestoreOutcome> {
        self.check_preconditions()?;

        let info = self
            .backend
            .restore_purchases()
            .await
            .map_err(|e| PaywallError::RestoreFailed(e.message))?;

        let config = self.state.config();
        let is_premium = info.has_active(&config.entitlement_id);

        if is_premium {
            sync_premium_status(&config, user_id, &info).await;
        }
        notify_restore_completed(&config, user_id, is_premium, &info).await;

        Ok(RestoreOutcome::new(is_premium, info))
    }

    /// Tear down the session: detach the listener, log out of the
    /// backend, and clear the initialized flag. Log-out failure is
    /// non-critical and swallowed. No-op when not initialized.
    pub async fn reset(&self) {
        if !self.state.is_initialized() {
            return;
        }

        self.detach_listener();
        if let Err(e) = self.backend.log_out().await {
            tracing::debug!("Log out failed during reset: {}", e);
        }
        self.state.set_initialized(false);
    }

    fn check_preconditions(&self) -> Result<()> {
        if !self.state.is_initialized() {
            return Err(PaywallError::NotInitialized);
        }
        if self.state.env().restricted_host && !self.state.is_using_test_store() {
            return Err(PaywallError::HostRestricted);
        }
        Ok(())
    }

    /// Subscribe to backend-pushed customer-info updates and re-run the
    /// premium sync on each one with the current configuration.
    /// Attaching replaces any previous subscription rather than stacking.
    fn attach_listener(&self, user_id: &str) {
        let mut slot = self.listener.lock().expect("listener lock poisoned");
        if let Some(previous) = slot.take() {
            previous.abort();
        }

        let mut updates = self.backend.customer_info_updates();
        let state = Arc::clone(&self.state);
        let user_id = user_id.to_owned();

        *slot = Some(tokio::spawn(async move {
            loop {
                match updates.recv().await {
                    Ok(info) => {
                        tracing::debug!("Customer info update received for {}", user_id);
                        sync_premium_status(&state.config(), &user_id, &info).await;
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Customer info listener lagged, skipped {} updates",
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }));
    }

    fn detach_listener(&self) {
        if let Some(task) = self
            .listener
            .lock()
            .expect("listener lock poisoned")
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for PurchaseService {
    fn drop(&mut self) {
        self.detach_listener();
    }
}
