//! Shared application state injected into every Axum handler.

use crate::crypto::{CipherEngine, Secret};

/// Application state shared across all request handlers.
///
/// Cloned per request by Axum; the engine holds its secret behind an `Arc`.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Token encryption engine bound to the process secret.
    pub engine: CipherEngine,
}

impl AppState {
    /// Create a new [`AppState`] around the process secret.
    pub fn new(secret: Secret) -> Self {
        Self {
            engine: CipherEngine::new(secret),
        }
    }
}

#[cfg(test)]
impl Default for AppState {
    /// State with a fixed 32-character secret, for tests.
    fn default() -> Self {
        Self::new(
            Secret::new("12345678901234567890123456789012")
                .expect("test secret satisfies the length rule"),
        )
    }
}
