//! [`Secret`]: the process-wide server secret every token key is derived from.

use serde::Deserialize;
use thiserror::Error;
use zeroize::Zeroize;

/// Minimum accepted secret length, in characters.
pub const MIN_SECRET_LEN: usize = 32;

/// Errors produced while constructing a [`Secret`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    /// No secret was supplied, or it was blank.
    #[error("ENCRYPTION_KEY is required and must not be empty")]
    Missing,

    /// The secret is shorter than [`MIN_SECRET_LEN`] characters.
    #[error("ENCRYPTION_KEY must be at least {MIN_SECRET_LEN} characters, got {0}")]
    TooShort(usize),
}

/// Immutable server secret.
///
/// Built once at startup and shared read-only by every engine clone. The
/// value is zeroed when the last owner drops it and is never printed.
#[derive(Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Secret(String);

impl Secret {
    /// Validate and wrap a secret value.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::Missing`] for an empty or blank value and
    /// [`SecretError::TooShort`] when it has fewer than [`MIN_SECRET_LEN`] characters.
    pub fn new(value: impl Into<String>) -> Result<Self, SecretError> {
        let mut value = value.into();
        if value.trim().is_empty() {
            value.zeroize();
            return Err(SecretError::Missing);
        }
        let len = value.chars().count();
        if len < MIN_SECRET_LEN {
            value.zeroize();
            return Err(SecretError::TooShort(len));
        }
        Ok(Self(value))
    }

    /// Raw bytes fed to the key derivation function.
    pub fn expose(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl TryFrom<String> for Secret {
    type Error = SecretError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl Drop for Secret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret([REDACTED])")
    }
}
