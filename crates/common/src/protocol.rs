//! Request and response types exchanged over the public HTTP API.
//!
//! Field names follow the camelCase convention of the browser client.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Encrypt / decrypt endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /security/encrypt`.
///
/// `payload` may be a plain string (encrypted verbatim) or any other JSON
/// value (serialised to JSON text before encryption).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptRequest {
    /// Value to encrypt. Absent is treated the same as `null`.
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Successful response body for `POST /security/encrypt`.
///
/// `encrypted` has the form `<iv>:<ciphertext>:<tag>.<salt>`, all hex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptResponse {
    pub encrypted: String,
}

/// Request body for `POST /security/decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptRequest {
    #[serde(default)]
    pub encrypted: String,
}

/// Successful response body for `POST /security/decrypt`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptResponse {
    pub decrypted: String,
}

/// Successful response body for `POST /security/decrypt-object`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptObjectResponse {
    pub decrypted: serde_json::Value,
}

/// Query string for `GET /security/test`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundTripQuery {
    #[serde(default)]
    pub text: String,
}

/// Response body for `GET /security/test`: the input, its token, and the
/// text recovered from that token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundTripResponse {
    pub original: String,
    pub encrypted: String,
    pub decrypted: String,
}

// ---------------------------------------------------------------------------
// Signature endpoints
// ---------------------------------------------------------------------------

/// Request body for `POST /security/sign`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Data to sign, as UTF-8 text.
    pub data: String,
    /// PEM-encoded RSA private key (PKCS#8 or PKCS#1).
    pub private_key: String,
}

/// Successful response body for `POST /security/sign`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignResponse {
    /// Hex-encoded RSASSA-PKCS1-v1_5 / SHA-256 signature.
    pub signature: String,
}

/// Request body for `POST /security/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub data: String,
    /// PEM-encoded RSA public key (SPKI or PKCS#1).
    pub public_key: String,
    /// Hex-encoded signature.
    pub signature: String,
}

/// Successful response body for `POST /security/verify`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub valid: bool,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<&crate::ServiceError> for ErrorResponse {
    fn from(err: &crate::ServiceError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"OK"` while the process is serving requests.
    pub status: String,
    /// RFC 3339 UTC timestamp with millisecond precision.
    pub timestamp: String,
}
