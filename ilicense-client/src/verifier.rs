//! RSA signature verification for activation codes.
//!
//! Codes are signed `SHA256withRSA`: RSASSA-PKCS1-v1_5 over a SHA-256 digest
//! of the raw payload bytes. The public key always comes from configuration,
//! never from the activation code itself.

use crate::error::{ValidationError, ValidationResult};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::sha2::Sha256;
use rsa::signature::Verifier;
use rsa::traits::PublicKeyParts;
use rsa::RsaPublicKey;

/// Parses PEM text wrapping an X.509 SubjectPublicKeyInfo RSA key.
///
/// Header/footer lines (`-----BEGIN PUBLIC KEY-----` and friends) and all
/// whitespace are stripped before the body is base64-decoded, so a bare
/// base64 body is accepted too.
///
/// # Errors
///
/// Returns [`ValidationError::KeyLoad`] if the body is not base64 or does
/// not hold an RSA SubjectPublicKeyInfo.
pub fn load_public_key(pem: &str) -> ValidationResult<RsaPublicKey> {
    let body: String = pem
        .lines()
        .filter(|line| !line.trim_start().starts_with("-----"))
        .flat_map(str::chars)
        .filter(|c| !c.is_whitespace())
        .collect();

    if body.is_empty() {
        return Err(ValidationError::KeyLoad("public key PEM is empty".to_string()));
    }

    let der = BASE64
        .decode(body.as_bytes())
        .map_err(|e| ValidationError::KeyLoad(format!("invalid base64 in PEM body: {e}")))?;

    RsaPublicKey::from_public_key_der(&der)
        .map_err(|e| ValidationError::KeyLoad(format!("not an RSA public key: {e}")))
}

/// Verifies `signature` over `payload`.
///
/// Returns `Ok(false)` for a well-formed signature that does not match.
///
/// # Errors
///
/// Returns [`ValidationError::SignatureFormat`] if the signature length does
/// not equal the key's modulus size.
pub fn verify(payload: &[u8], signature: &[u8], public_key: &RsaPublicKey) -> ValidationResult<bool> {
    PublicKeyVerifier::new(public_key.clone()).verify(payload, signature)
}

/// A loaded public key ready to check activation-code signatures.
#[derive(Debug, Clone)]
pub struct PublicKeyVerifier {
    public_key: RsaPublicKey,
    modulus_len: usize,
}

impl PublicKeyVerifier {
    /// Wraps an already-parsed RSA public key.
    #[must_use]
    pub fn new(public_key: RsaPublicKey) -> Self {
        let modulus_len = public_key.size();
        Self {
            public_key,
            modulus_len,
        }
    }

    /// Loads the key from PEM text.
    ///
    /// # Errors
    ///
    /// See [`load_public_key`].
    pub fn from_pem(pem: &str) -> ValidationResult<Self> {
        load_public_key(pem).map(Self::new)
    }

    /// The wrapped public key.
    #[must_use]
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    /// Size in bytes every valid signature must have.
    #[must_use]
    pub fn signature_len(&self) -> usize {
        self.modulus_len
    }

    /// Verifies `signature` over `payload`. See [`verify`].
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::SignatureFormat`] for malformed signature bytes.
    pub fn verify(&self, payload: &[u8], signature: &[u8]) -> ValidationResult<bool> {
        if signature.len() != self.modulus_len {
            return Err(ValidationError::SignatureFormat(format!(
                "expected {} signature bytes, got {}",
                self.modulus_len,
                signature.len()
            )));
        }

        let signature = Signature::try_from(signature)
            .map_err(|e| ValidationError::SignatureFormat(e.to_string()))?;

        let verifying_key = VerifyingKey::<Sha256>::new(self.public_key.clone());
        Ok(verifying_key.verify(payload, &signature).is_ok())
    }
}
