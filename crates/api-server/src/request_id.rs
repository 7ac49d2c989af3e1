use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

const HEADER: &str = "x-request-id";

/// Request ID, available to handlers as an extension.
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Reuses an incoming `X-Request-Id` or generates a UUID v4, then echoes it
/// on the response.
pub async fn request_id_middleware(headers: HeaderMap, mut request: Request, next: Next) -> Response {
    let id = headers
        .get(HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.len() <= 128)
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    tracing::debug!(request_id = %id, "{} {}", request.method(), request.uri().path());

    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).await;
    if let Ok(val) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(HEADER, val);
    }

    response
}
