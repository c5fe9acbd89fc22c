//! Common error types shared across crates.

use thiserror::Error;

/// Top-level service error type.
///
/// Variants map to HTTP status codes returned to callers:
/// - [`ServiceError::BadRequest`] → 400
/// - [`ServiceError::DecryptionFailure`] → 422
/// - [`ServiceError::EncryptionFailure`] → 500
/// - [`ServiceError::Internal`] → 500
///
/// Every message carried here is safe to return to the caller. Crypto-layer
/// causes are logged where they occur and never reach this type.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request was malformed — missing field, malformed token, or invalid key encoding.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Decryption failed: wrong key or tampered token. Deliberately uniform.
    #[error("decryption failed: corrupted data or incorrect key")]
    DecryptionFailure,

    /// Encryption failed inside the crypto layer.
    #[error("encryption operation failed")]
    EncryptionFailure,

    /// An unexpected internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the HTTP status code that should be sent for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            ServiceError::BadRequest(_) => 400,
            ServiceError::DecryptionFailure => 422,
            ServiceError::EncryptionFailure => 500,
            ServiceError::Internal(_) => 500,
        }
    }

    /// Short machine-readable code used in [`crate::protocol::ErrorResponse`].
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::BadRequest(_) => "bad_request",
            ServiceError::DecryptionFailure => "decryption_failed",
            ServiceError::EncryptionFailure => "encryption_failed",
            ServiceError::Internal(_) => "internal_error",
        }
    }
}
