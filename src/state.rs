//! Service state: initialization flag, test-store flag, and the live
//! configuration.

use std::sync::RwLock;

use crate::config::Config;
use crate::env::EnvContext;
use crate::keys::should_use_test_store;

/// Owns the mutable service state.
///
/// `using_test_store` is derived once from config + environment at
/// construction or explicit update, never re-evaluated on read.
pub struct StateManager {
    env: EnvContext,
    inner: RwLock<Inner>,
}

struct Inner {
    initialized: bool,
    using_test_store: bool,
    config: Config,
}

impl StateManager {
    pub fn new(config: Config, env: EnvContext) -> Self {
        let using_test_store = should_use_test_store(&config, &env);
        Self {
            env,
            inner: RwLock::new(Inner {
                initialized: false,
                using_test_store,
                config,
            }),
        }
    }

    pub fn env(&self) -> EnvContext {
        self.env
    }

    pub fn is_initialized(&self) -> bool {
        self.read().initialized
    }

    pub fn set_initialized(&self, initialized: bool) {
        self.write().initialized = initialized;
    }

    pub fn is_using_test_store(&self) -> bool {
        self.read().using_test_store
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Config {
        self.read().config.clone()
    }

    /// Replace the configuration wholesale and recompute the test-store
    /// flag. Never merges with the previous configuration.
    pub fn update_config(&self, config: Config) {
        let using_test_store = should_use_test_store(&config, &self.env);
        let mut inner = self.write();
        inner.using_test_store = using_test_store;
        inner.config = config;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("state lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("state lock poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Platform;

    fn dev_env() -> EnvContext {
        EnvContext {
            platform: Platform::Ios,
            restricted_host: false,
            dev_build: true,
        }
    }

    #[test]
    fn test_initialized_flag_roundtrip() {
        let state = StateManager::new(Config::default(), dev_env());
        assert!(!state.is_initialized());
        state.set_initialized(true);
        assert!(state.is_initialized());
        state.set_initialized(false);
        assert!(!state.is_initialized());
    }

    #[test]
    fn test_test_store_flag_computed_at_construction() {
        let config = Config::builder().test_store_key("test_key").build();
        let state = StateManager::new(config, dev_env());
        assert!(state.is_using_test_store());

        let without = StateManager::new(Config::default(), dev_env());
        assert!(!without.is_using_test_store());
    }

    #[test]
    fn test_update_config_replaces_and_recomputes() {
        let config = Config::builder()
            .test_store_key("test_key")
            .ios_api_key("appl_key")
            .build();
        let state = StateManager::new(config, dev_env());
        assert!(state.is_using_test_store());

        // Wholesale replacement: the iOS key from the old config is gone.
        state.update_config(Config::builder().entitlement_id("pro").build());
        assert!(!state.is_using_test_store());
        let current = state.config();
        assert_eq!(current.entitlement_id, "pro");
        assert!(current.ios_api_key.is_none());
    }
}
