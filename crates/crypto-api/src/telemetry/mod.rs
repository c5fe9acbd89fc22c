//! Structured logging, with optional OpenTelemetry span export.
//!
//! # Telemetry invariants
//!
//! - **No secret, derived key, plaintext, or token** may appear in any span
//!   attribute or log field. Request paths are logged without query strings.
//! - Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//!   takes precedence when set.

pub mod init;

pub use init::init_telemetry;
