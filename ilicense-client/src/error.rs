//! Error types for activation-code validation and the license lifecycle.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the decode → verify → parse pipeline.
///
/// Every variant is terminal for the `validate` call that produced it; no
/// partially parsed record ever accompanies one of these.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The activation code is not valid base64url or its envelope framing is broken.
    #[error("malformed activation code: {0}")]
    MalformedCode(String),

    /// The signature bytes cannot be a signature for the configured key.
    #[error("malformed signature: {0}")]
    SignatureFormat(String),

    /// The configured public key is not a PEM-wrapped RSA SubjectPublicKeyInfo.
    #[error("failed to load public key: {0}")]
    KeyLoad(String),

    /// The signed payload is not a well-formed license descriptor.
    #[error("invalid license payload: {0}")]
    PayloadFormat(String),

    /// The signature is well-formed but does not match the payload.
    #[error("signature verification failed")]
    SignatureMismatch,
}

/// Licensing errors surfaced by the manager and validator.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// Activation-code validation failed at some stage.
    #[error("license validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No license has been adopted.
    #[error("system not activated")]
    NotActivated,

    /// The license expired at the given instant.
    #[error("license expired: {expire_at}")]
    Expired {
        /// RFC 3339 expiry timestamp.
        expire_at: String,
    },

    /// The current license does not grant the module.
    #[error("unauthorized module: {0}")]
    ModuleNotAuthorized(String),

    /// The activation code could not be written to (or read from) storage.
    #[error("failed to persist license at {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be read or parsed.
    #[error("invalid license configuration: {0}")]
    Config(String),
}

impl LicenseError {
    /// Returns true if this error came out of activation-code validation.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type for validation stages.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
