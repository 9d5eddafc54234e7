//! Service configuration.
//!
//! Configuration is immutable per call and replaced wholesale through
//! [`PurchaseService::update_config`](crate::service::PurchaseService::update_config);
//! there is no partial merge.

use std::fmt;
use std::sync::Arc;

use crate::entitlement::ExpirationCalculator;
use crate::sync::StatusSink;

/// Entitlement looked up when the caller does not name one.
pub const DEFAULT_ENTITLEMENT_ID: &str = "premium";

#[derive(Clone)]
pub struct Config {
    pub ios_api_key: Option<String>,
    pub android_api_key: Option<String>,
    /// Alternate credential routing purchases to a non-production store,
    /// used in restricted hosts or development builds.
    pub test_store_key: Option<String>,
    pub entitlement_id: String,
    /// Receiver of premium-state sync events (typically a database writer).
    pub sink: Option<Arc<dyn StatusSink>>,
    /// Optional expiration correction, e.g. sandbox acceleration.
    pub expiration_calculator: Option<Arc<dyn ExpirationCalculator>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ios_api_key: None,
            android_api_key: None,
            test_store_key: None,
            entitlement_id: DEFAULT_ENTITLEMENT_ID.to_owned(),
            sink: None,
            expiration_calculator: None,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys are credentials; log presence only.
        f.debug_struct("Config")
            .field("ios_api_key", &self.ios_api_key.is_some())
            .field("android_api_key", &self.android_api_key.is_some())
            .field("test_store_key", &self.test_store_key.is_some())
            .field("entitlement_id", &self.entitlement_id)
            .field("sink", &self.sink.is_some())
            .field(
                "expiration_calculator",
                &self.expiration_calculator.is_some(),
            )
            .finish()
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn ios_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.ios_api_key = Some(key.into());
        self
    }

    pub fn android_api_key(mut self, key: impl Into<String>) -> Self {
        self.config.android_api_key = Some(key.into());
        self
    }

    pub fn test_store_key(mut self, key: impl Into<String>) -> Self {
        self.config.test_store_key = Some(key.into());
        self
    }

    pub fn entitlement_id(mut self, id: impl Into<String>) -> Self {
        self.config.entitlement_id = id.into();
        self
    }

    pub fn sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.config.sink = Some(sink);
        self
    }

    pub fn expiration_calculator(mut self, calculator: Arc<dyn ExpirationCalculator>) -> Self {
        self.config.expiration_calculator = Some(calculator);
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
