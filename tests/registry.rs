//! Registry lifecycle: first-call-wins construction, explicit reset.

use std::sync::Arc;

use paywall::{Config, ServiceRegistry};

mod common;
use common::*;

#[tokio::test]
async fn test_initialize_twice_returns_same_instance() {
    let registry = ServiceRegistry::new();
    let backend = test_backend();

    let first = registry.initialize(
        Config::builder().test_store_key("test_key").build(),
        backend.clone(),
        sandbox_env(),
    );
    let second = registry.initialize(
        Config::builder().entitlement_id("pro").build(),
        backend,
        sandbox_env(),
    );

    assert!(Arc::ptr_eq(&first, &second));
    // The second config was ignored at construction time.
    assert_eq!(second.config().entitlement_id, "premium");
    assert!(second.config().test_store_key.is_some());
}

#[tokio::test]
async fn test_get_reflects_lifecycle() {
    let registry = ServiceRegistry::new();
    assert!(registry.get().is_none());

    let backend = test_backend();
    let service = registry.initialize(
        Config::builder().test_store_key("test_key").build(),
        backend,
        sandbox_env(),
    );
    assert!(Arc::ptr_eq(&registry.get().unwrap(), &service));

    registry.clear();
    assert!(registry.get().is_none());
}

#[tokio::test]
async fn test_clear_allows_fresh_construction() {
    let registry = ServiceRegistry::new();
    let backend = test_backend();

    registry.initialize(
        Config::builder().test_store_key("test_key").build(),
        backend.clone(),
        sandbox_env(),
    );
    registry.clear();

    let fresh = registry.initialize(
        Config::builder().entitlement_id("pro").build(),
        backend,
        sandbox_env(),
    );
    assert_eq!(fresh.config().entitlement_id, "pro");
}
