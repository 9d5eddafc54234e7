//! Entitlement extraction and expiration resolution.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{CustomerInfo, PeriodType};

/// Normalized view of an active entitlement. Reconstructed on every query
/// from raw customer info, never cached.
#[derive(Debug, Clone, Serialize)]
pub struct EntitlementRecord {
    pub identifier: String,
    pub product_identifier: String,
    pub is_sandbox: bool,
    pub will_renew: bool,
    pub period_type: PeriodType,
    pub latest_purchase_date: Option<DateTime<Utc>>,
    pub original_purchase_date: Option<DateTime<Utc>>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub unsubscribe_detected_at: Option<DateTime<Utc>>,
    pub billing_issue_detected_at: Option<DateTime<Utc>>,
}

/// Look up the named entitlement among the *active* entitlements.
/// Absence is `None`, never an error.
pub fn premium_entitlement(
    info: &CustomerInfo,
    entitlement_id: &str,
) -> Option<EntitlementRecord> {
    let entitlement = info.active_entitlements.get(entitlement_id)?;
    Some(EntitlementRecord {
        identifier: entitlement.identifier.clone(),
        product_identifier: entitlement.product_identifier.clone(),
        is_sandbox: entitlement.is_sandbox,
        will_renew: entitlement.will_renew,
        period_type: entitlement.period_type,
        latest_purchase_date: entitlement.latest_purchase_date,
        original_purchase_date: entitlement.original_purchase_date,
        expiration_date: entitlement.expiration_date,
        unsubscribe_detected_at: entitlement.unsubscribe_detected_at,
        billing_issue_detected_at: entitlement.billing_issue_detected_at,
    })
}

pub type CalculatorError = Box<dyn std::error::Error + Send + Sync>;

/// Optional expiration-correction collaborator, keyed by product id and
/// the raw timestamp. Absence or failure is non-fatal.
pub trait ExpirationCalculator: Send + Sync {
    fn calculate(
        &self,
        product_id: &str,
        raw: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, CalculatorError>;
}

/// Resolve the entitlement's expiration as an ISO-8601 string.
///
/// The correction collaborator gets first shot; on failure the raw
/// normalized timestamp is returned without propagating the error.
pub fn expiration_date(
    record: &EntitlementRecord,
    calculator: Option<&dyn ExpirationCalculator>,
) -> Option<String> {
    let raw = record.expiration_date?;

    if let Some(calc) = calculator {
        match calc.calculate(&record.product_identifier, raw) {
            Ok(corrected) => return Some(corrected.to_rfc3339()),
            Err(e) => tracing::debug!(
                "Expiration correction failed for {}: {}",
                record.product_identifier,
                e
            ),
        }
    }

    Some(raw.to_rfc3339())
}

/// Nominal subscription period and its sandbox renewal window, matched
/// against product identifier substrings. Longer markers come first so
/// e.g. "two_month" is not shadowed by "monthly" products.
const ACCELERATED_WINDOWS: &[(&str, i64, i64)] = &[
    ("two_month", 60, 10),
    ("2month", 60, 10),
    ("quarterly", 90, 15),
    ("3month", 90, 15),
    ("six_month", 180, 30),
    ("6month", 180, 30),
    ("weekly", 7, 3),
    ("monthly", 30, 5),
    ("yearly", 365, 60),
    ("annual", 365, 60),
];

/// Sandbox stores compress renewal periods to minutes, so the expiration
/// a backend reports is nominal-period distant while the sandbox renews
/// within minutes. This calculator rebases the expiration onto the
/// accelerated window: anchor = raw - nominal period, corrected =
/// anchor + sandbox window. Products without a recognizable period
/// marker pass through unchanged.
pub struct SandboxAcceleration;

impl ExpirationCalculator for SandboxAcceleration {
    fn calculate(
        &self,
        product_id: &str,
        raw: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, CalculatorError> {
        let lowered = product_id.to_ascii_lowercase();
        let Some((_, nominal_days, sandbox_minutes)) = ACCELERATED_WINDOWS
            .iter()
            .find(|(marker, _, _)| lowered.contains(marker))
        else {
            return Ok(raw);
        };

        let anchor = raw - Duration::days(*nominal_days);
        Ok(anchor + Duration::minutes(*sandbox_minutes))
    }
}
