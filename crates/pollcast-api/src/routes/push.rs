//! Ingest endpoint for the remote service's push publishers.

use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use pollcast_core::AppState;
use pollcast_models::PushEnvelope;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::ValidJson;

pub const PUBLISH_KEY_HEADER: &str = "x-pollcast-publish-key";

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn publish(
    State(state): State<AppState>,
    headers: HeaderMap,
    ValidJson(envelope): ValidJson<PushEnvelope>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let presented = headers
        .get(PUBLISH_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if presented.is_empty()
        || !constant_time_eq(presented.as_bytes(), state.config.publish_key.as_bytes())
    {
        tracing::warn!("push publish rejected: bad publish key");
        return Err(ApiError::Unauthorized);
    }

    if !envelope.topic.accepts(&envelope.payload) {
        return Err(ApiError::BadRequest(format!(
            "{} messages cannot be published on {}",
            envelope.payload.kind(),
            envelope.topic
        )));
    }

    let delivered = state.topic_bus.publish(envelope);
    Ok((StatusCode::ACCEPTED, Json(json!({ "delivered": delivered }))))
}
