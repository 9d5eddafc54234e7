//! Paywall - database-first in-app purchase orchestration
//!
//! Coordinates purchase and subscription flows against a pluggable store
//! backend. The backend is authoritative only for transaction mechanics
//! (buy, restore, entitlement at call time); durable premium state lives
//! in the application's own database, synced through a [`StatusSink`].
//!
//! The crate ships an in-process [`TestStoreBackend`] so the sandbox/dev
//! path and the full orchestration are exercisable without a real store.

pub mod backend;
pub mod config;
pub mod controller;
pub mod entitlement;
pub mod env;
pub mod error;
pub mod keys;
pub mod models;
pub mod registry;
pub mod service;
pub mod state;
pub mod sync;
pub mod test_store;
pub mod webhook;

pub use backend::{BackendError, PurchaseBackend, PurchaseConfirmation};
pub use config::{Config, ConfigBuilder, DEFAULT_ENTITLEMENT_ID};
pub use controller::{ControllerState, PaywallController};
pub use entitlement::{EntitlementRecord, ExpirationCalculator, SandboxAcceleration};
pub use env::{EnvContext, Platform};
pub use error::{PaywallError, Result};
pub use models::{
    CustomerInfo, EntitlementInfo, InitializeOutcome, Offering, Offerings, Package, PeriodType,
    PurchaseOutcome, RestoreOutcome, StoreProduct,
};
pub use registry::ServiceRegistry;
pub use service::PurchaseService;
pub use sync::{SinkError, StatusSink};
pub use test_store::TestStoreBackend;
pub use webhook::WebhookSink;
