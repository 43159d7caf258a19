mod handler;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use pollcast_core::AppState;
use std::collections::BTreeSet;

const MAX_FRAME_SIZE: usize = 16 * 1024;

pub fn gateway_router() -> Router<AppState> {
    Router::new().route("/realtime", get(ws_upgrade))
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_ascii_lowercase()
}

fn default_allowed_origins() -> BTreeSet<String> {
    [
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ]
    .into_iter()
    .map(normalize_origin)
    .collect()
}

fn build_allowed_origins(state: &AppState) -> BTreeSet<String> {
    let mut allowed = default_allowed_origins();
    for origin in state
        .config
        .allowed_origins
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
    {
        allowed.insert(normalize_origin(origin));
    }
    allowed
}

fn is_origin_allowed(headers: &HeaderMap, state: &AppState) -> bool {
    let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) else {
        // Native clients and non-browser callers typically omit Origin.
        return true;
    };

    let normalized = normalize_origin(origin);
    if build_allowed_origins(state).contains(&normalized) {
        return true;
    }

    // Same-origin browser upgrades are always fine: host:port must match.
    if let Some(host) = headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        let origin_no_scheme = origin
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('/')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        return origin_no_scheme == host.trim().to_ascii_lowercase();
    }

    false
}

async fn ws_upgrade(
    State(state): State<AppState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    if !is_origin_allowed(&headers, &state) {
        tracing::warn!("realtime upgrade rejected for origin {:?}", headers.get(header::ORIGIN));
        return StatusCode::FORBIDDEN.into_response();
    }

    ws.max_message_size(MAX_FRAME_SIZE)
        .max_frame_size(MAX_FRAME_SIZE)
        .on_upgrade(move |socket| handler::handle_connection(socket, state))
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollcast_core::{AppConfig, Limits, RealtimeSettings};
    use pollcast_upstream::UpstreamClient;

    fn state(allowed: &[&str]) -> AppState {
        let config = AppConfig {
            limits: Limits::default(),
            session_secret: "secret".into(),
            whitelist: None,
            publish_key: "publish".into(),
            realtime: RealtimeSettings::default(),
            allowed_origins: allowed.iter().map(|o| o.to_string()).collect(),
        };
        AppState::new(config, UpstreamClient::new("http://127.0.0.1:9").unwrap())
    }

    fn headers(origin: &str, host: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::ORIGIN, origin.parse().unwrap());
        headers.insert(header::HOST, host.parse().unwrap());
        headers
    }

    #[test]
    fn configured_origin_is_allowed() {
        let state = state(&["https://polls.example.com/"]);
        assert!(is_origin_allowed(
            &headers("https://Polls.example.com", "bff.internal:8080"),
            &state
        ));
    }

    #[test]
    fn same_origin_is_allowed_and_foreign_origin_is_not() {
        let state = state(&[]);
        assert!(is_origin_allowed(
            &headers("https://polls.example.com", "polls.example.com"),
            &state
        ));
        assert!(!is_origin_allowed(
            &headers("https://evil.example.net", "polls.example.com"),
            &state
        ));
    }

    #[test]
    fn missing_origin_is_allowed() {
        assert!(is_origin_allowed(&HeaderMap::new(), &state(&[])));
    }
}
