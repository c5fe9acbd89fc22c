//! Axum middleware applied to the router.
//!
//! Includes structured request logging and the per-request timeout. CORS,
//! tracing spans and compression are stock `tower-http` layers wired in
//! [`super::router`].

use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use tracing::info;
use uuid::Uuid;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Header carrying an upstream request id (set by API Gateway / ALB).
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-amzn-requestid");

static FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Log a `request_start` and a `request_finish` event for every request.
///
/// Only the path is logged: `/security/test` carries plaintext in its query
/// string. Bodies are never read here.
pub async fn log_requests(req: Request, next: Next) -> Response {
    let headers = req.headers();
    let request_id = header_str(headers, &REQUEST_ID_HEADER)
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let ip = header_str(headers, &FORWARDED_FOR).unwrap_or("").to_owned();

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        ip = %ip,
        user_agent = header_str(headers, &header::USER_AGENT).unwrap_or("-"),
        content_type = header_str(headers, &header::CONTENT_TYPE).unwrap_or("-"),
        "request_start"
    );

    let started = Instant::now();
    let response = next.run(req).await;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        ip = %ip,
        status = response.status().as_u16(),
        duration_ms,
        content_length = header_str(response.headers(), &header::CONTENT_LENGTH).unwrap_or("-"),
        "request_finish"
    );

    response
}

fn header_str<'a>(headers: &'a HeaderMap, name: &HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
