use crate::{config::Config, error::AppError, metrics};
use arc_swap::ArcSwap;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub const ALLOWED_METHODS: &str = "POST";

/// Origin allow-list middleware for browser-facing endpoints
///
/// Rejects requests whose `Origin` header is not configured in
/// `analytics.origins`, and adds CORS headers to successful responses.
pub async fn origin_middleware(
    State(config): State<Arc<ArcSwap<Config>>>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !is_allowed(&config.load(), &origin) {
        metrics::record_request(req.uri().path(), "bad_origin");
        return Err(AppError::BadOrigin(origin));
    }

    let mut response = next.run(req).await;
    if response.status().is_success() {
        add_cors_headers(&mut response, &origin)?;
    }

    Ok(response)
}

fn is_allowed(config: &Config, origin: &str) -> bool {
    config.analytics.origins.iter().any(|allowed| allowed == origin)
}

fn add_cors_headers(response: &mut Response, origin: &str) -> Result<(), AppError> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| AppError::InternalError(format!("Invalid origin header value: {}", e)))?;

    let headers = response.headers_mut();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    Ok(())
}
