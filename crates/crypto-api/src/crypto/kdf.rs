//! scrypt key derivation: (server secret, salt) → 32-byte AES-256 key.
//!
//! Work factors are fixed at log2(N) = 14, r = 8, p = 1. They are not
//! configurable: changing them changes every derived key and makes all
//! previously issued tokens undecryptable.

use thiserror::Error;
use zeroize::Zeroize;

use super::{Secret, KEY_LEN};

/// scrypt CPU/memory cost, as log2(N).
pub const SCRYPT_LOG_N: u8 = 14;
/// scrypt block size.
pub const SCRYPT_R: u32 = 8;
/// scrypt parallelisation.
pub const SCRYPT_P: u32 = 1;

/// Errors produced by key derivation.
#[derive(Debug, Error)]
pub enum KdfError {
    /// The hex-encoded salt could not be decoded.
    #[error("salt is not valid hex: {0}")]
    InvalidSalt(#[from] hex::FromHexError),

    /// scrypt rejected its parameters or output length.
    #[error("scrypt derivation failed: {0}")]
    Derivation(String),
}

/// The salt as handed to [`derive_key`].
///
/// Tokens carry the salt as hex text; both the encrypt and decrypt paths pass
/// that text through [`SaltInput::Hex`] so it is decoded identically.
#[derive(Debug, Clone, Copy)]
pub enum SaltInput<'a> {
    /// Hex text, decoded to bytes before derivation.
    Hex(&'a str),
    /// Raw salt bytes, used as-is.
    Raw(&'a [u8]),
}

impl<'a> From<&'a str> for SaltInput<'a> {
    fn from(s: &'a str) -> Self {
        SaltInput::Hex(s)
    }
}

impl<'a> From<&'a [u8]> for SaltInput<'a> {
    fn from(b: &'a [u8]) -> Self {
        SaltInput::Raw(b)
    }
}

/// A derived AES-256 key. Lives for one cipher operation; zeroed on drop.
pub struct DerivedKey([u8; KEY_LEN]);

impl DerivedKey {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey([REDACTED])")
    }
}

/// Derive the per-token key from `secret` and `salt`.
///
/// Deterministic: identical inputs always yield the identical key.
///
/// # Errors
///
/// Returns [`KdfError::InvalidSalt`] if a hex salt does not decode, and
/// [`KdfError::Derivation`] if scrypt itself fails.
pub fn derive_key<'a>(
    secret: &Secret,
    salt: impl Into<SaltInput<'a>>,
) -> Result<DerivedKey, KdfError> {
    let decoded;
    let salt_bytes: &[u8] = match salt.into() {
        SaltInput::Hex(s) => {
            decoded = hex::decode(s)?;
            &decoded
        }
        SaltInput::Raw(b) => b,
    };

    let params = scrypt::Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, KEY_LEN)
        .map_err(|e| KdfError::Derivation(e.to_string()))?;

    let mut key = DerivedKey([0u8; KEY_LEN]);
    scrypt::scrypt(secret.expose(), salt_bytes, &params, &mut key.0)
        .map_err(|e| KdfError::Derivation(e.to_string()))?;
    Ok(key)
}
