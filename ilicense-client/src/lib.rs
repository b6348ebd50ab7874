//! Offline license activation for ilicense.
//!
//! This crate handles:
//! - Activation-code decoding (length-prefixed envelope, base64url text)
//! - RSA-SHA256 (PKCS#1 v1.5) signature verification against a configured key
//! - License payload parsing with derived expiry state
//! - The current-license lifecycle: startup load, activation, module checks,
//!   periodic expiry warnings and persistence to a local file
//!
//! # Design Principles
//!
//! - **Offline**: a license is trusted locally, no license server is contacted
//! - **Single trust boundary**: nothing in the payload is acted on before its
//!   signature verifies
//! - **Atomic adoption**: the current license is replaced whole, never mutated
//!
//! # Activation Code Format
//!
//! `base64url(be_u32(len(payload)) || payload || be_u32(len(sig)) || sig)`,
//! unpadded, where `payload` is the license JSON and `sig` its signature.

mod clock;
mod config;
mod envelope;
mod error;
mod event;
mod manager;
mod record;
#[cfg(feature = "scheduler")]
mod scheduler;
mod store;
mod validator;
mod verifier;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{LicenseConfig, StartupPolicy};
pub use envelope::{decode, encode, ActivationEnvelope};
pub use error::{LicenseError, LicenseResult, ValidationError, ValidationResult};
pub use event::{LicenseEvent, LicenseEventListener, LoggingListener, NoopListener};
pub use manager::{resolve_startup, LicenseManager, LicenseState, LicenseStatus, StartupOutcome};
pub use record::LicenseRecord;
pub use store::ActivationStore;
pub use validator::{LicenseValidator, Validate};
pub use verifier::{load_public_key, verify, PublicKeyVerifier};

#[cfg(feature = "channel")]
pub use event::ChannelListener;
#[cfg(feature = "scheduler")]
pub use scheduler::{spawn_configured_check, spawn_periodic_check};
