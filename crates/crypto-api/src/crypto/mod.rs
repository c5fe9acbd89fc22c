//! Token encryption and signature primitives.
//!
//! This module is intentionally free of HTTP dependencies. It provides the
//! operations the request handlers call into.
//!
//! # Token format
//!
//! ```text
//! <hex(iv)>:<hex(ciphertext)>:<hex(tag)>.<hex(salt)>
//! ```
//!
//! A fresh 32-byte salt and 12-byte IV are drawn per token. The AES-256-GCM
//! key is derived from the server [`Secret`] and that salt with scrypt, so
//! the salt travelling inside the token is all the decrypting side needs.

pub mod cipher;
pub mod kdf;
pub mod secret;
pub mod signature;

pub use cipher::CipherEngine;
pub use secret::Secret;

use common::ServiceError;
use thiserror::Error;

/// Byte length of an AES-256 key (32 bytes = 256 bits).
pub const KEY_LEN: usize = 32;

/// Errors surfaced by the crypto layer to its callers.
///
/// Messages are safe to expose: internal causes are logged where they occur
/// and collapsed into these variants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// The payload could not be turned into JSON text.
    #[error("payload cannot be serialised to JSON")]
    NotSerializable,

    /// IV/salt generation, key derivation, or the cipher failed while encrypting.
    #[error("encryption operation failed")]
    EncryptionFailed,

    /// The token does not have the `iv:ciphertext:tag.salt` shape.
    #[error("invalid token format")]
    InvalidTokenFormat,

    /// Authentication failed or the cipher errored. Wrong key and tampering
    /// are intentionally indistinguishable.
    #[error("decryption failed: corrupted data or incorrect key")]
    DecryptionFailed,

    /// The decrypted text is not valid JSON for the requested type.
    #[error("decrypted data is not valid JSON")]
    InvalidJson,

    /// The PEM key could not be parsed as an RSA key.
    #[error("invalid key material")]
    InvalidKey,

    /// The signature is not non-empty hex.
    #[error("invalid signature encoding")]
    InvalidSignature,

    /// The RSA signing operation failed (e.g. key too small for the digest).
    #[error("signing operation failed")]
    SigningFailed,
}

impl From<CryptoError> for ServiceError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::EncryptionFailed => ServiceError::EncryptionFailure,
            CryptoError::DecryptionFailed => ServiceError::DecryptionFailure,
            CryptoError::NotSerializable
            | CryptoError::InvalidTokenFormat
            | CryptoError::InvalidJson
            | CryptoError::InvalidKey
            | CryptoError::InvalidSignature
            | CryptoError::SigningFailed => ServiceError::BadRequest(err.to_string()),
        }
    }
}
