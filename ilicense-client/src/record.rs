//! License payload parsing.
//!
//! The signed payload is a UTF-8 JSON object:
//!
//! ```json
//! {
//!   "license_code": "LIC-001",
//!   "customer_code": "CUST-001",
//!   "customer_name": "Acme",
//!   "product_code": "PRD-001",
//!   "product_name": "Demo Product",
//!   "issuer_code": "ISS-001",
//!   "issuer_name": "Demo Issuer",
//!   "issue_at": "2026-01-01T00:00:00+08:00",
//!   "expire_at": "2027-01-01T00:00:00+08:00",
//!   "modules": ["base", "advanced"],
//!   "max_instances": 10
//! }
//! ```
//!
//! `modules` is a JSON array of strings; the legacy comma-joined string form
//! is rejected. `max_instances` is optional and informational.

use crate::error::{ValidationError, ValidationResult};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

const SECS_PER_DAY: i64 = 24 * 60 * 60;

/// Wire shape of the signed payload.
#[derive(Debug, Deserialize)]
struct LicensePayload {
    license_code: String,
    customer_code: String,
    customer_name: String,
    product_code: String,
    product_name: String,
    issuer_code: String,
    issuer_name: String,
    issue_at: DateTime<FixedOffset>,
    expire_at: DateTime<FixedOffset>,
    #[serde(default)]
    modules: Vec<String>,
    #[serde(default)]
    max_instances: Option<u32>,
}

/// A verified license descriptor.
///
/// `is_expired` and `days_left` are derived from `expire_at` at the moment
/// the record was parsed, or adopted by a [`crate::LicenseManager`]; they are
/// never read from the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LicenseRecord {
    pub license_code: String,
    pub customer_code: String,
    pub customer_name: String,
    pub product_code: String,
    pub product_name: String,
    pub issuer_code: String,
    pub issuer_name: String,
    #[serde(rename = "issue_at")]
    pub issued_at: DateTime<FixedOffset>,
    pub expire_at: DateTime<FixedOffset>,
    pub modules: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,
    is_expired: bool,
    days_left: i64,
}

impl LicenseRecord {
    /// Parses a verified payload, deriving expiry state against `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PayloadFormat`] if the bytes are not UTF-8,
    /// not JSON, or miss a required field (including `expire_at`).
    pub fn parse_at(payload: &[u8], now: DateTime<Utc>) -> ValidationResult<Self> {
        let text = std::str::from_utf8(payload)
            .map_err(|e| ValidationError::PayloadFormat(format!("payload is not UTF-8: {e}")))?;

        let wire: LicensePayload = serde_json::from_str(text)
            .map_err(|e| ValidationError::PayloadFormat(e.to_string()))?;

        Ok(Self::from_wire(wire, now))
    }

    /// Parses a verified payload against the system clock.
    ///
    /// # Errors
    ///
    /// See [`LicenseRecord::parse_at`].
    pub fn parse(payload: &[u8]) -> ValidationResult<Self> {
        Self::parse_at(payload, Utc::now())
    }

    fn from_wire(wire: LicensePayload, now: DateTime<Utc>) -> Self {
        let mut record = Self {
            license_code: wire.license_code,
            customer_code: wire.customer_code,
            customer_name: wire.customer_name,
            product_code: wire.product_code,
            product_name: wire.product_name,
            issuer_code: wire.issuer_code,
            issuer_name: wire.issuer_name,
            issued_at: wire.issue_at,
            expire_at: wire.expire_at,
            modules: wire.modules,
            max_instances: wire.max_instances,
            is_expired: false,
            days_left: 0,
        };
        record.refresh_at(now);
        record
    }

    /// Recomputes `is_expired` and `days_left` against `now`.
    pub(crate) fn refresh_at(&mut self, now: DateTime<Utc>) {
        self.is_expired = self.is_expired_at(now);
        self.days_left = self.days_left_at(now);
    }

    /// Whether the license had expired when it was parsed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired
    }

    /// Whole days from parse time to expiry, truncated toward zero. Negative
    /// once expired by a full day or more.
    #[must_use]
    pub fn days_left(&self) -> i64 {
        self.days_left
    }

    /// Whether the license is expired at `now`. Expiry is inclusive: a
    /// license whose `expire_at` equals `now` is expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.with_timezone(&Utc) <= now
    }

    /// Whole days between `now` and expiry, truncated toward zero.
    #[must_use]
    pub fn days_left_at(&self, now: DateTime<Utc>) -> i64 {
        (self.expire_at.with_timezone(&Utc) - now).num_seconds() / SECS_PER_DAY
    }

    /// Returns true if `module` is one of the entitled modules.
    #[must_use]
    pub fn has_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| m == module)
    }
}
