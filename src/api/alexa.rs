//! Directive endpoint

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    routing::post,
};
use serde_json::{Value, json};

use super::{ApiState, auth::require_api_key};
use crate::alexa::EventEnvelope;

type ApiError = (StatusCode, Json<Value>);

/// Answer one directive
async fn handle_directive(
    State(state): State<Arc<ApiState>>,
    Json(body): Json<Value>,
) -> Result<Json<EventEnvelope>, ApiError> {
    match state.bridge.handle(body).await {
        Ok(event) => Ok(Json(event)),
        Err(e) if e.is_client_error() => {
            tracing::warn!(error = %e, "rejected directive");
            Err((StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))))
        }
        Err(e) => {
            tracing::error!(error = %e, "directive handling failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            ))
        }
    }
}

/// Build the directive router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/alexa", post(handle_directive))
        .layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}
