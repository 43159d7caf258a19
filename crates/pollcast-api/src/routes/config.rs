use axum::{extract::State, Json};
use pollcast_core::AppState;
use serde_json::{json, Value};

/// Settings browsers need before talking to the API: the content limits for
/// local validation and where to open the push channel.
pub async fn public_config(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "limits": config.limits,
        "realtime": {
            "endpoint": config.realtime.endpoint,
            "authorizerName": config.realtime.authorizer_name,
        },
    }))
}
