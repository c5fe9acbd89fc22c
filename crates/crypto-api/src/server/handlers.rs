//! Axum request handlers for all service endpoints.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{SecondsFormat, Utc};
use common::protocol::{
    DecryptObjectResponse, DecryptRequest, DecryptResponse, EncryptRequest, EncryptResponse,
    ErrorResponse, HealthResponse, RoundTripQuery, RoundTripResponse, SignRequest, SignResponse,
    VerifyRequest, VerifyResponse,
};
use common::ServiceError;
use tracing::{error, warn};

use super::state::AppState;
use crate::crypto::{signature, CryptoError};

/// JSON body extractor whose rejections become `400 bad_request` [`ErrorResponse`]s
/// instead of axum's plain-text 415/422 responses.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// A [`ServiceError`] rendered as a JSON [`ErrorResponse`].
pub struct ApiError(ServiceError);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // The rejection text can quote request values; only the status is logged.
        warn!(status = rejection.status().as_u16(), "request body rejected");
        Self(ServiceError::BadRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.0)
    }
}

/// `POST /security/encrypt` — encrypt a text or JSON payload into a token.
///
/// String payloads are encrypted verbatim; any other JSON value is encrypted
/// as its JSON text. Absent and falsy payloads (`null`, `false`, `0`, `""`)
/// are rejected.
pub async fn encrypt(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EncryptRequest>,
) -> Response {
    if is_falsy(&req.payload) {
        return error_response(ServiceError::BadRequest(
            "field \"payload\" is required".into(),
        ));
    }

    match run_crypto(move || state.engine.encrypt_payload(&req.payload)).await {
        Ok(encrypted) => (StatusCode::OK, Json(EncryptResponse { encrypted })).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /security/decrypt` — recover the text a token was created from.
pub async fn decrypt(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DecryptRequest>,
) -> Response {
    if req.encrypted.is_empty() {
        return error_response(ServiceError::BadRequest(
            "field \"encrypted\" is required".into(),
        ));
    }

    match run_crypto(move || state.engine.decrypt(&req.encrypted)).await {
        Ok(decrypted) => (StatusCode::OK, Json(DecryptResponse { decrypted })).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /security/decrypt-object` — decrypt a token and parse its text as JSON.
///
/// Plaintext that is not JSON is a `400`, never a raw-text fallback.
pub async fn decrypt_object(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<DecryptRequest>,
) -> Response {
    if req.encrypted.is_empty() {
        return error_response(ServiceError::BadRequest(
            "field \"encrypted\" is required".into(),
        ));
    }

    let result = run_crypto(move || {
        state
            .engine
            .decrypt_to_object::<serde_json::Value>(&req.encrypted)
    })
    .await;

    match result {
        Ok(decrypted) => {
            (StatusCode::OK, Json(DecryptObjectResponse { decrypted })).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// `GET /security/test?text=` — encrypt then decrypt `text` in one call.
pub async fn round_trip(
    State(state): State<AppState>,
    Query(query): Query<RoundTripQuery>,
) -> Response {
    if query.text.is_empty() {
        return error_response(ServiceError::BadRequest(
            "query parameter \"text\" is required, e.g. ?text=hello".into(),
        ));
    }

    let result = run_crypto(move || {
        let encrypted = state.engine.encrypt(&query.text)?;
        let decrypted = state.engine.decrypt(&encrypted)?;
        Ok(RoundTripResponse {
            original: query.text,
            encrypted,
            decrypted,
        })
    })
    .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /security/sign` — sign `data` with the supplied RSA private key.
pub async fn sign(ApiJson(req): ApiJson<SignRequest>) -> Response {
    match run_crypto(move || signature::sign_data(&req.data, &req.private_key)).await {
        Ok(signature) => (StatusCode::OK, Json(SignResponse { signature })).into_response(),
        Err(e) => error_response(e),
    }
}

/// `POST /security/verify` — check a signature against an RSA public key.
///
/// A non-matching signature is a `200` with `valid: false`.
pub async fn verify(ApiJson(req): ApiJson<VerifyRequest>) -> Response {
    let result = run_crypto(move || {
        signature::verify_signature(&req.data, &req.public_key, &req.signature)
    })
    .await;

    match result {
        Ok(valid) => (StatusCode::OK, Json(VerifyResponse { valid })).into_response(),
        Err(e) => error_response(e),
    }
}

/// `GET /health` — liveness check.
pub async fn health() -> Response {
    let body = HealthResponse {
        status: "OK".into(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}

/// Run a CPU-bound crypto operation off the async workers.
async fn run_crypto<T, F>(op: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, CryptoError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| {
            error!(error = %e, "crypto worker task failed");
            ServiceError::Internal("crypto worker task failed".into())
        })?
        .map_err(ServiceError::from)
}

/// JavaScript truthiness for a JSON value: `null`, `false`, `0` and `""` are falsy.
fn is_falsy(payload: &serde_json::Value) -> bool {
    match payload {
        serde_json::Value::Null => true,
        serde_json::Value::Bool(b) => !b,
        serde_json::Value::Number(n) => n.as_f64() == Some(0.0),
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => false,
    }
}

fn error_response(err: ServiceError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ErrorResponse::from(&err))).into_response()
}
