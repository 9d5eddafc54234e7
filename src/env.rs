//! Runtime environment detection.
//!
//! Host restriction and build mode decide whether the test-store path is
//! available. The context is an explicit struct passed into constructors so
//! tests can pin any combination instead of mutating process globals.

use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Ios,
    Android,
}

/// Snapshot of the execution context, taken once at construction.
#[derive(Debug, Clone, Copy)]
pub struct EnvContext {
    pub platform: Platform,
    /// Host lacks native purchase capability (e.g. a generic client shell).
    pub restricted_host: bool,
    /// Development build rather than a release/store build.
    pub dev_build: bool,
}

impl EnvContext {
    /// Detect the context from the process environment.
    ///
    /// `PAYWALL_PLATFORM` selects the platform (defaults to iOS),
    /// `PAYWALL_RESTRICTED_HOST` marks a restricted host, and a dev build is
    /// either a debug-assertions build or `PAYWALL_ENV=dev|development`.
    pub fn detect() -> Self {
        dotenvy::dotenv().ok();

        let platform = match env::var("PAYWALL_PLATFORM") {
            Ok(v) if v.eq_ignore_ascii_case("android") => Platform::Android,
            _ => Platform::Ios,
        };

        let restricted_host = env::var("PAYWALL_RESTRICTED_HOST")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let dev_build = cfg!(debug_assertions)
            || env::var("PAYWALL_ENV")
                .map(|v| v == "dev" || v == "development")
                .unwrap_or(false);

        Self {
            platform,
            restricted_host,
            dev_build,
        }
    }

    /// Sandbox context: a restricted host or a development build.
    pub fn is_sandbox(&self) -> bool {
        self.restricted_host || self.dev_build
    }
}
