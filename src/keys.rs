//! API key resolution for the current platform, with a test-store
//! fallback for sandbox and development environments.

use std::env;

use crate::config::Config;
use crate::env::{EnvContext, Platform};

/// Lowest-priority fallback sources for platform keys.
pub const IOS_KEY_ENV: &str = "PAYWALL_IOS_API_KEY";
pub const ANDROID_KEY_ENV: &str = "PAYWALL_ANDROID_API_KEY";

/// Keys copied from documentation templates still contain this marker.
const PLACEHOLDER_MARKER: &str = "YOUR_";

/// The test-store key is used when one is configured and the environment
/// is a sandbox context. Single definition shared by the resolver and the
/// state manager.
pub fn should_use_test_store(config: &Config, env_ctx: &EnvContext) -> bool {
    present(&config.test_store_key) && env_ctx.is_sandbox()
}

/// Resolve the API key for the current platform.
///
/// Returns the test-store key unconditionally in sandbox/dev contexts,
/// ignoring platform keys. Otherwise the explicitly configured platform
/// key wins over the env-var fallback. Empty or placeholder keys are
/// treated as absent.
pub fn resolve_api_key(config: &Config, env_ctx: &EnvContext) -> Option<String> {
    if should_use_test_store(config, env_ctx) {
        return config.test_store_key.clone();
    }

    let key = match env_ctx.platform {
        Platform::Ios => config
            .ios_api_key
            .clone()
            .or_else(|| env::var(IOS_KEY_ENV).ok()),
        Platform::Android => config
            .android_api_key
            .clone()
            .or_else(|| env::var(ANDROID_KEY_ENV).ok()),
    };

    key.filter(|k| !k.is_empty() && !k.contains(PLACEHOLDER_MARKER))
}

fn present(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(restricted_host: bool, dev_build: bool) -> EnvContext {
        EnvContext {
            platform: Platform::Ios,
            restricted_host,
            dev_build,
        }
    }

    #[test]
    fn test_test_store_key_wins_in_sandbox() {
        let config = Config::builder()
            .ios_api_key("appl_key")
            .android_api_key("goog_key")
            .test_store_key("test_key")
            .build();

        assert_eq!(
            resolve_api_key(&config, &ctx(false, true)).as_deref(),
            Some("test_key")
        );
        assert_eq!(
            resolve_api_key(&config, &ctx(true, false)).as_deref(),
            Some("test_key")
        );
        assert!(should_use_test_store(&config, &ctx(false, true)));
    }

    #[test]
    fn test_test_store_key_ignored_in_production() {
        let config = Config::builder()
            .ios_api_key("appl_key")
            .test_store_key("test_key")
            .build();

        assert!(!should_use_test_store(&config, &ctx(false, false)));
        assert_eq!(
            resolve_api_key(&config, &ctx(false, false)).as_deref(),
            Some("appl_key")
        );
    }

    #[test]
    fn test_platform_selects_key() {
        let config = Config::builder()
            .ios_api_key("appl_key")
            .android_api_key("goog_key")
            .build();

        let ios = EnvContext {
            platform: Platform::Ios,
            restricted_host: false,
            dev_build: false,
        };
        let android = EnvContext {
            platform: Platform::Android,
            ..ios
        };

        assert_eq!(resolve_api_key(&config, &ios).as_deref(), Some("appl_key"));
        assert_eq!(
            resolve_api_key(&config, &android).as_deref(),
            Some("goog_key")
        );
    }

    #[test]
    fn test_placeholder_and_empty_keys_are_absent() {
        let placeholder = Config::builder().ios_api_key("YOUR_IOS_API_KEY").build();
        assert_eq!(resolve_api_key(&placeholder, &ctx(false, false)), None);

        let empty = Config::builder().ios_api_key("").build();
        assert_eq!(resolve_api_key(&empty, &ctx(false, false)), None);
    }

    #[test]
    fn test_empty_test_store_key_does_not_enable_test_store() {
        let config = Config::builder().test_store_key("").build();
        assert!(!should_use_test_store(&config, &ctx(false, true)));
        assert_eq!(resolve_api_key(&config, &ctx(false, true)), None);
    }

    #[test]
    fn test_env_var_is_lowest_priority_fallback() {
        env::set_var(ANDROID_KEY_ENV, "goog_env_key");

        let android = EnvContext {
            platform: Platform::Android,
            restricted_host: false,
            dev_build: false,
        };

        let unconfigured = Config::default();
        assert_eq!(
            resolve_api_key(&unconfigured, &android).as_deref(),
            Some("goog_env_key")
        );

        let explicit = Config::builder().android_api_key("goog_explicit").build();
        assert_eq!(
            resolve_api_key(&explicit, &android).as_deref(),
            Some("goog_explicit")
        );

        env::remove_var(ANDROID_KEY_ENV);
    }
}
