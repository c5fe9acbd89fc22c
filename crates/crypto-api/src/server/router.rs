//! Axum router construction.

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/security/encrypt", post(handlers::encrypt))
        .route("/security/decrypt", post(handlers::decrypt))
        .route("/security/decrypt-object", post(handlers::decrypt_object))
        .route("/security/test", get(handlers::round_trip))
        .route("/security/sign", post(handlers::sign))
        .route("/security/verify", post(handlers::verify))
        .route("/health", get(handlers::health))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .layer(cors)
        .with_state(state)
}

/// CORS policy for the browser client: the configured origins, credentials allowed.
///
/// # Errors
///
/// Returns an error if an origin is not a valid header value.
pub fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o).with_context(|| format!("invalid CORS origin: {o}"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::HEAD,
            Method::PUT,
            Method::PATCH,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true))
}
