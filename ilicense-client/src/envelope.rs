//! Binary envelope carried inside an activation code.
//!
//! Activation codes use the format:
//!
//! ```text
//! base64url( be_u32(len(payload)) || payload || be_u32(len(signature)) || signature )
//! ```
//!
//! encoded without padding. Whitespace anywhere in the text form is ignored on
//! decode so codes copied out of e-mails or wrapped terminals still parse.

use crate::error::{ValidationError, ValidationResult};
use base64::{
    alphabet,
    engine::{general_purpose::URL_SAFE_NO_PAD, DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
    Engine,
};

/// Size of each big-endian length prefix.
const LEN_PREFIX: usize = 4;

/// Lenient decoder: accepts codes with or without trailing `=` padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A signed payload and its detached signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationEnvelope {
    /// The signed JSON license descriptor.
    pub payload: Vec<u8>,
    /// Signature over `payload`.
    pub signature: Vec<u8>,
}

impl ActivationEnvelope {
    /// Creates an envelope from its two parts.
    #[must_use]
    pub fn new(payload: Vec<u8>, signature: Vec<u8>) -> Self {
        Self { payload, signature }
    }

    /// Encodes the envelope into activation-code text.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(&self.payload, &self.signature)
    }

    /// Decodes activation-code text into an envelope.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MalformedCode`] on an invalid base64url
    /// alphabet or padding, a truncated length prefix, a declared length that
    /// exceeds the remaining buffer, or unexplained trailing bytes.
    pub fn decode(text: &str) -> ValidationResult<Self> {
        decode(text)
    }
}

/// Builds the length-prefixed buffer and base64url-encodes it without padding.
#[must_use]
pub fn encode(payload: &[u8], signature: &[u8]) -> String {
    let mut buf = Vec::with_capacity(2 * LEN_PREFIX + payload.len() + signature.len());
    write_part(&mut buf, payload);
    write_part(&mut buf, signature);
    URL_SAFE_NO_PAD.encode(buf)
}

/// Strips whitespace, base64url-decodes and splits the envelope.
///
/// # Errors
///
/// See [`ActivationEnvelope::decode`].
pub fn decode(text: &str) -> ValidationResult<ActivationEnvelope> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(ValidationError::MalformedCode("activation code is empty".to_string()));
    }

    let bytes = URL_SAFE_LENIENT
        .decode(cleaned.as_bytes())
        .map_err(|e| ValidationError::MalformedCode(format!("invalid base64url: {e}")))?;

    let mut reader = Reader::new(&bytes);
    let payload = reader.read_part("payload")?;
    let signature = reader.read_part("signature")?;

    if reader.remaining() != 0 {
        return Err(ValidationError::MalformedCode(format!(
            "{} unexpected trailing bytes after signature",
            reader.remaining()
        )));
    }

    Ok(ActivationEnvelope {
        payload: payload.to_vec(),
        signature: signature.to_vec(),
    })
}

fn write_part(buf: &mut Vec<u8>, part: &[u8]) {
    // Parts are a JSON descriptor and an RSA signature, far below 2 GiB.
    let len = u32::try_from(part.len()).unwrap_or(u32::MAX);
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(part);
}

/// Cursor over the decoded envelope bytes.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn read_part(&mut self, what: &str) -> ValidationResult<&'a [u8]> {
        if self.remaining() < LEN_PREFIX {
            return Err(ValidationError::MalformedCode(format!(
                "truncated {what} length prefix"
            )));
        }
        let mut prefix = [0u8; LEN_PREFIX];
        prefix.copy_from_slice(&self.buf[self.pos..self.pos + LEN_PREFIX]);
        self.pos += LEN_PREFIX;

        // Issuers frame with a signed 32-bit length; the sign bit is never legal.
        let declared = u32::from_be_bytes(prefix);
        if declared > i32::MAX as u32 {
            return Err(ValidationError::MalformedCode(format!(
                "negative {what} length"
            )));
        }
        let len = declared as usize;
        if len > self.remaining() {
            return Err(ValidationError::MalformedCode(format!(
                "{what} length {len} exceeds remaining {} bytes",
                self.remaining()
            )));
        }

        let part = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(part)
    }
}
