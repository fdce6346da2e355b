//! API key authentication middleware
//!
//! Only guards the bridge's own HTTP surface. The directive's scope token is
//! a separate credential and travels inside the JSON body.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

use super::ApiState;

/// Bearer key from the Authorization header
fn bearer_key(req: &Request) -> Option<&str> {
    let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::trim)
}

/// Reject requests without the configured key; open when no key is set
pub async fn require_api_key(
    State(state): State<Arc<ApiState>>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected_key) = &state.api_key else {
        return Ok(next.run(req).await);
    };

    match bearer_key(&req) {
        Some(key) if key == expected_key => Ok(next.run(req).await),
        provided => {
            let path = req.uri().path();
            if provided.is_some() {
                tracing::warn!(path, "rejected request with wrong API key");
            } else {
                tracing::debug!(path, "rejected request without API key");
            }
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_bearer_key() {
        let mut req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_key(&req), None);

        req.headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Bearer bridge-key"));
        assert_eq!(bearer_key(&req), Some("bridge-key"));

        req.headers_mut()
            .insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_key(&req), None);
    }
}
