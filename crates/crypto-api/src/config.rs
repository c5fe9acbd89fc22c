//! Configuration loading and validation for the crypto API service.
//!
//! Values are read from environment variables at startup, after an optional
//! `.env` file in the working directory has been merged in. The process will
//! exit with a clear error message if any required variable is missing or invalid.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::crypto::Secret;

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server secret every token key is derived from. **Required**, ≥ 32 characters.
    /// Validated while deserialising.
    pub encryption_key: Secret,

    /// Interface the HTTP server binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated list of origins allowed by CORS.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP gRPC endpoint. Spans are only exported when this is set.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_host() -> String {
    "localhost".into()
}
fn default_port() -> u16 {
    3000
}
fn default_cors_origin() -> String {
    "http://localhost:5173".into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from `.env` and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `ENCRYPTION_KEY` is absent or too short, or if any
    /// other variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        load_env_file(dotenvy::dotenv())?;

        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration (is ENCRYPTION_KEY set?)")?;

        c.validate()?;
        Ok(c)
    }

    /// Origins allowed by CORS, split from [`Config::cors_origin`].
    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        ensure_non_empty(&self.host, "HOST")?;
        if self.port == 0 {
            anyhow::bail!("PORT must be > 0");
        }
        let origins = self.cors_origins();
        if origins.is_empty() {
            anyhow::bail!("CORS_ORIGIN must list at least one origin");
        }
        if origins.iter().any(|o| o == "*") {
            anyhow::bail!("CORS_ORIGIN must not be \"*\": credentials are allowed");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

/// Accept a missing `.env` (normal outside local development) but fail on
/// one that exists and cannot be read or parsed.
fn load_env_file(result: dotenvy::Result<PathBuf>) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(e).context("failed to load .env file"),
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}
