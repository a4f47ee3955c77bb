//! Static shared-secret authentication.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::ApiResponse;

/// Shared-secret middleware.
///
/// Accepts the secret in either the `X-API-Key` header or an
/// `Authorization: Bearer` header. The health endpoint is always open, and
/// when `API_SHARED_SECRET` is unset authentication is skipped entirely
/// (development mode).
pub async fn auth_middleware(headers: HeaderMap, request: Request, next: Next) -> Response {
    if request.uri().path() == "/" {
        return next.run(request).await;
    }

    let secret = match std::env::var("API_SHARED_SECRET") {
        Ok(s) if !s.is_empty() => s,
        _ => return next.run(request).await,
    };

    match extract_api_key(&headers) {
        Some(key) if key == secret => next.run(request).await,
        Some(_) => {
            tracing::warn!("rejected request with invalid API key");
            unauthorized("Invalid API key")
        }
        None => unauthorized("Missing API key"),
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<()>::error(message)),
    )
        .into_response()
}

fn extract_api_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("X-API-Key") {
        if let Ok(key) = value.to_str() {
            if !key.is_empty() {
                return Some(key.to_string());
            }
        }
    }

    if let Some(value) = headers.get("Authorization") {
        if let Ok(auth) = value.to_str() {
            if let Some(token) = auth.strip_prefix("Bearer ") {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_x_api_key_first() {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", HeaderValue::from_static("secret-a"));
        headers.insert("Authorization", HeaderValue::from_static("Bearer secret-b"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("secret-a"));
    }

    #[test]
    fn falls_back_to_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_static("Bearer tok"));
        assert_eq!(extract_api_key(&headers).as_deref(), Some("tok"));
    }

    #[test]
    fn empty_headers_yield_none() {
        let mut headers = HeaderMap::new();
        headers.insert("X-API-Key", HeaderValue::from_static(""));
        assert_eq!(extract_api_key(&headers), None);
    }
}
