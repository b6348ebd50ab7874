//! Activation-code validation: decode, verify, then parse.
//!
//! This is the single trust boundary. The payload bytes are only handed to
//! the parser after the signature over them has been verified against the
//! configured public key.

use crate::clock::{Clock, SystemClock};
use crate::envelope;
use crate::error::{LicenseResult, ValidationError, ValidationResult};
use crate::record::LicenseRecord;
use crate::verifier::PublicKeyVerifier;
use chrono::{DateTime, Utc};
use rsa::RsaPublicKey;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Turns activation-code text into a trusted [`LicenseRecord`].
pub trait Validate: Send + Sync + fmt::Debug {
    /// Validates `activation_code`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::LicenseError::Validation`] wrapping the failing stage.
    fn validate(&self, activation_code: &str) -> LicenseResult<LicenseRecord>;
}

/// RSA-backed activation-code validator.
#[derive(Debug, Clone)]
pub struct LicenseValidator {
    verifier: PublicKeyVerifier,
    clock: Arc<dyn Clock>,
}

impl LicenseValidator {
    /// Creates a validator trusting `public_key`.
    #[must_use]
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            verifier: PublicKeyVerifier::new(public_key),
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates a validator from PEM public-key text.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::KeyLoad`] for malformed PEM or non-RSA keys.
    pub fn from_pem(pem: &str) -> ValidationResult<Self> {
        Ok(Self {
            verifier: PublicKeyVerifier::from_pem(pem)?,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the clock used to derive expiry state.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Validates `activation_code`, deriving expiry state against `now`.
    ///
    /// # Errors
    ///
    /// Returns the first failing stage as a [`ValidationError`].
    pub fn validate_at(
        &self,
        activation_code: &str,
        now: DateTime<Utc>,
    ) -> ValidationResult<LicenseRecord> {
        let env = envelope::decode(activation_code)?;
        debug!(
            payload_len = env.payload.len(),
            signature_len = env.signature.len(),
            "decoded activation envelope"
        );

        if !self.verifier.verify(&env.payload, &env.signature)? {
            return Err(ValidationError::SignatureMismatch);
        }
        info!("signature verification successful");

        LicenseRecord::parse_at(&env.payload, now)
    }
}

impl Validate for LicenseValidator {
    fn validate(&self, activation_code: &str) -> LicenseResult<LicenseRecord> {
        info!("starting license validation");
        match self.validate_at(activation_code, self.clock.now()) {
            Ok(record) => {
                info!(customer = %record.customer_name, "license validation successful");
                Ok(record)
            }
            Err(e) => {
                warn!(error = %e, "license validation failed");
                Err(e.into())
            }
        }
    }
}
