//! Test utilities and fixtures for paywall integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;

pub use paywall::{
    Config, CustomerInfo, EnvContext, Offering, Offerings, Package, PaywallError, Platform,
    PurchaseService, SinkError, StatusSink, StoreProduct, TestStoreBackend,
};

/// Initialize tracing output for a test; repeated calls are fine.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    PremiumStatusChanged {
        user_id: String,
        is_premium: bool,
        product_id: Option<String>,
        expires_at: Option<String>,
    },
    PurchaseCompleted {
        user_id: String,
        product_id: String,
    },
    RestoreCompleted {
        user_id: String,
        is_premium: bool,
    },
}

/// Records every sink event; can be told to fail or panic on the premium
/// status callback to exercise the failure-isolation boundary. Events are
/// recorded before failing so tests can still assert invocation.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
    fail_premium_status: bool,
    panic_premium_status: bool,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_premium_status() -> Arc<Self> {
        Arc::new(Self {
            fail_premium_status: true,
            ..Self::default()
        })
    }

    pub fn panicking_premium_status() -> Arc<Self> {
        Arc::new(Self {
            panic_premium_status: true,
            ..Self::default()
        })
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// The `is_premium` values of recorded premium-status changes, in order.
    pub fn premium_changes(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::PremiumStatusChanged { is_premium, .. } => Some(is_premium),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn premium_status_changed(
        &self,
        user_id: &str,
        is_premium: bool,
        product_id: Option<&str>,
        expires_at: Option<&str>,
    ) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::PremiumStatusChanged {
            user_id: user_id.to_owned(),
            is_premium,
            product_id: product_id.map(str::to_owned),
            expires_at: expires_at.map(str::to_owned),
        });
        if self.panic_premium_status {
            panic!("sink panicked");
        }
        if self.fail_premium_status {
            return Err("simulated database failure".into());
        }
        Ok(())
    }

    async fn purchase_completed(
        &self,
        user_id: &str,
        product_id: &str,
        _info: &CustomerInfo,
    ) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::PurchaseCompleted {
            user_id: user_id.to_owned(),
            product_id: product_id.to_owned(),
        });
        Ok(())
    }

    async fn restore_completed(
        &self,
        user_id: &str,
        is_premium: bool,
        _info: &CustomerInfo,
    ) -> Result<(), SinkError> {
        self.events.lock().unwrap().push(SinkEvent::RestoreCompleted {
            user_id: user_id.to_owned(),
            is_premium,
        });
        Ok(())
    }
}

pub fn package(product_id: &str) -> Package {
    Package {
        identifier: format!("pkg_{}", product_id),
        product: StoreProduct {
            identifier: product_id.to_owned(),
            title: product_id.to_owned(),
            price_cents: 999,
            currency: "usd".to_owned(),
        },
    }
}

pub fn test_offerings() -> Offerings {
    let offering = Offering {
        identifier: "default".to_owned(),
        packages: vec![
            package("premium_monthly"),
            package("credits_100"),
            package("pro_upgrade"),
        ],
    };
    let mut all = HashMap::new();
    all.insert(offering.identifier.clone(), offering.clone());
    Offerings {
        current: Some(offering),
        all,
    }
}

/// Test store with `premium_monthly` wired to the `premium` entitlement.
pub fn test_backend() -> Arc<TestStoreBackend> {
    Arc::new(
        TestStoreBackend::new(test_offerings()).with_grant(
            "premium_monthly",
            "premium",
            Duration::hours(1),
        ),
    )
}

pub fn sandbox_env() -> EnvContext {
    EnvContext {
        platform: Platform::Ios,
        restricted_host: false,
        dev_build: true,
    }
}

pub fn restricted_env() -> EnvContext {
    EnvContext {
        platform: Platform::Ios,
        restricted_host: true,
        dev_build: false,
    }
}

pub fn production_env(platform: Platform) -> EnvContext {
    EnvContext {
        platform,
        restricted_host: false,
        dev_build: false,
    }
}

/// Config routing through the test store, with the given sink attached.
pub fn test_config(sink: Arc<dyn StatusSink>) -> Config {
    Config::builder().test_store_key("test_key").sink(sink).build()
}

/// Service over the test store, initialized for `user_id`.
pub async fn initialized_service(
    sink: Arc<dyn StatusSink>,
    user_id: &str,
) -> (Arc<PurchaseService>, Arc<TestStoreBackend>) {
    let backend = test_backend();
    let service = Arc::new(PurchaseService::new(
        test_config(sink),
        backend.clone(),
        sandbox_env(),
    ));
    let outcome = service.initialize(user_id, None).await;
    assert!(outcome.success, "test service must initialize");
    (service, backend)
}
