//! Explicit service registry: one coordinated purchase session per
//! application root, with an explicit lifecycle instead of hidden
//! global state.

use std::sync::{Arc, Mutex};

use crate::backend::PurchaseBackend;
use crate::config::Config;
use crate::env::EnvContext;
use crate::service::PurchaseService;

#[derive(Default)]
pub struct ServiceRegistry {
    slot: Mutex<Option<Arc<PurchaseService>>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// First call constructs the service; later calls return the existing
    /// instance and ignore their arguments. Config changes for a live
    /// instance go through [`PurchaseService::update_config`].
    pub fn initialize(
        &self,
        config: Config,
        backend: Arc<dyn PurchaseBackend>,
        env: EnvContext,
    ) -> Arc<PurchaseService> {
        let mut slot = self.slot.lock().expect("registry lock poisoned");
        if let Some(existing) = slot.as_ref() {
            return Arc::clone(existing);
        }

        let service = Arc::new(PurchaseService::new(config, backend, env));
        *slot = Some(Arc::clone(&service));
        service
    }

    pub fn get(&self) -> Option<Arc<PurchaseService>> {
        self.slot.lock().expect("registry lock poisoned").clone()
    }

    /// Drop the held instance. The next `initialize` constructs a fresh
    /// service.
    pub fn clear(&self) {
        self.slot.lock().expect("registry lock poisoned").take();
    }
}
