//! Shared test helpers for license tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use ilicense_client::{encode, Clock, LicenseEventListener, LicenseRecord};
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::{EncodePublicKey, LineEnding};
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::{LazyLock, Mutex};

const TEST_KEY_BITS: usize = 2048;

/// Issuer key used by most tests.
pub static ISSUER_KEY: LazyLock<RsaPrivateKey> = LazyLock::new(generate_key);

/// An unrelated key, for wrong-key tests.
pub static OTHER_KEY: LazyLock<RsaPrivateKey> = LazyLock::new(generate_key);

fn generate_key() -> RsaPrivateKey {
    let mut rng = rand::thread_rng();
    RsaPrivateKey::new(&mut rng, TEST_KEY_BITS).expect("RSA key generation")
}

pub fn public_key(private: &RsaPrivateKey) -> RsaPublicKey {
    RsaPublicKey::from(private)
}

/// PEM text (`-----BEGIN PUBLIC KEY-----`) for the public half of `private`.
pub fn public_pem(private: &RsaPrivateKey) -> String {
    public_key(private)
        .to_public_key_pem(LineEnding::LF)
        .expect("PEM encoding")
}

/// Signs `payload` SHA256withRSA.
pub fn sign(private: &RsaPrivateKey, payload: &[u8]) -> Vec<u8> {
    SigningKey::<Sha256>::new(private.clone()).sign(payload).to_vec()
}

/// A full license payload expiring at `expire_at` granting `modules`.
pub fn payload_json(customer: &str, expire_at: DateTime<Utc>, modules: &[&str]) -> String {
    serde_json::json!({
        "license_code": "LIC-001",
        "customer_code": "CUST-001",
        "customer_name": customer,
        "product_code": "PRD-001",
        "product_name": "Demo Product",
        "issuer_code": "ISS-001",
        "issuer_name": "Demo Issuer",
        "issue_at": (expire_at - Duration::days(365)).to_rfc3339(),
        "expire_at": expire_at.to_rfc3339(),
        "modules": modules,
        "max_instances": 10
    })
    .to_string()
}

/// Signs `payload` with `private` and frames it as activation-code text.
pub fn sign_code(private: &RsaPrivateKey, payload: &str) -> String {
    let signature = sign(private, payload.as_bytes());
    encode(payload.as_bytes(), &signature)
}

/// Activation code for "Demo Customer" expiring `days` from now.
pub fn code_expiring_in(days: i64, modules: &[&str]) -> String {
    let payload = payload_json("Demo Customer", Utc::now() + Duration::days(days), modules);
    sign_code(&ISSUER_KEY, &payload)
}

/// A clock that tests can move forward.
#[derive(Debug)]
pub struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, by: Duration) {
        *self.0.lock().unwrap() += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// Records every notification as `"<event>:<customer>"` (plus days for
/// expiring-soon).
#[derive(Debug, Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events().iter().filter(|e| e.starts_with(prefix)).count()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl LicenseEventListener for RecordingListener {
    fn on_activated(&self, license: &LicenseRecord) {
        self.push(format!("activated:{}", license.customer_name));
    }

    fn on_expired(&self, license: &LicenseRecord) {
        self.push(format!("expired:{}", license.customer_name));
    }

    fn on_expiring_soon(&self, license: &LicenseRecord, days_left: i64) {
        self.push(format!("expiring_soon:{}:{days_left}", license.customer_name));
    }
}

/// A listener that panics on every event.
#[derive(Debug, Default)]
pub struct PanickingListener;

impl LicenseEventListener for PanickingListener {
    fn on_activated(&self, _license: &LicenseRecord) {
        panic!("listener failure");
    }

    fn on_expired(&self, _license: &LicenseRecord) {
        panic!("listener failure");
    }

    fn on_expiring_soon(&self, _license: &LicenseRecord, _days_left: i64) {
        panic!("listener failure");
    }
}
