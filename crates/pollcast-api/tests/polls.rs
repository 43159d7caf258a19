use axum::{
    body::Body,
    extract::Path,
    http::{HeaderMap, Request, StatusCode},
    routing::{get, post},
    Json, Router,
};
use pollcast_core::{AppConfig, AppState, Limits, RealtimeSettings};
use pollcast_upstream::UpstreamClient;
use serde_json::{json, Value};
use tower::ServiceExt;

const SECRET: &str = "test-secret";
const PUBLISH_KEY: &str = "publish-key";
const POLL_ID: &str = "lunch0000001";
const OPTION_ID: &str = "pizza0000001";

fn poll_json(poll_id: &str, prompt: &str, options: &[&str], duration: u64) -> Value {
    let options: Vec<Value> = options
        .iter()
        .enumerate()
        .map(|(i, text)| {
            json!({
                "optionId": format!("opt{:09}", i),
                "pollId": poll_id,
                "text": text,
                "updatedAt": "2024-03-01T12:00:00Z",
                "votes": 0,
                "isMyVote": false
            })
        })
        .collect();
    json!({
        "pollId": poll_id,
        "userId": "google-1",
        "prompt": prompt,
        "createdAt": "2024-03-01T12:00:00Z",
        "duration": duration,
        "isArchived": false,
        "options": options
    })
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer id-token")
}

fn remote() -> Router {
    Router::new()
        .route(
            "/polls",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                if !has_bearer(&headers) {
                    return (StatusCode::UNAUTHORIZED, Json(json!({"message": "Unauthorized"})));
                }
                let options: Vec<&str> = body["options"]
                    .as_array()
                    .map(|opts| opts.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                let prompt = body["prompt"].as_str().unwrap_or_default();
                let duration = body["duration"].as_u64().unwrap_or_default();
                (
                    StatusCode::CREATED,
                    Json(poll_json("gen000000001", prompt, &options, duration)),
                )
            })
            .get(|| async { Json(json!([poll_json(POLL_ID, "Lunch?", &[], 3600)])) }),
        )
        .route(
            "/polls/{poll_id}",
            get(|Path(poll_id): Path<String>| async move {
                if poll_id == "missing00000" {
                    return (
                        StatusCode::NOT_FOUND,
                        Json(json!({"message": "Not found", "cause": "poll not found"})),
                    );
                }
                (StatusCode::OK, Json(poll_json(&poll_id, "Lunch?", &["Pizza"], 3600)))
            })
            .patch(|Json(body): Json<Value>| async move {
                let duration = if body["duration"] == -1 { 42 } else { body["duration"].as_u64().unwrap_or(0) };
                Json(json!({ "duration": duration }))
            })
            .delete(|| async { StatusCode::NO_CONTENT }),
        )
        .route(
            "/public/polls/{poll_id}",
            get(|Path(poll_id): Path<String>| async move {
                Json(poll_json(&poll_id, "Lunch?", &["Pizza"], 3600))
            }),
        )
        .route(
            "/polls/{poll_id}/{option_id}",
            post(|| async { (StatusCode::ACCEPTED, Json(json!({"requestId": "req-1"}))) }),
        )
        .route(
            "/public/polls/{poll_id}/{option_id}",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"message": "Internal server error", "cause": "boom"})),
                )
            }),
        )
}

async fn app() -> (Router, AppState) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, remote()).await.unwrap();
    });

    let config = AppConfig {
        limits: Limits::default(),
        session_secret: SECRET.to_string(),
        whitelist: None,
        publish_key: PUBLISH_KEY.to_string(),
        realtime: RealtimeSettings {
            endpoint: "wss://realtime.example.com/mqtt".into(),
            authorizer_name: "pollcast-authorizer".into(),
        },
        allowed_origins: Vec::new(),
    };
    let upstream = UpstreamClient::new(&format!("http://{addr}")).unwrap();
    let state = AppState::new(config, upstream);
    (pollcast_api::build_router().with_state(state.clone()), state)
}

fn session() -> String {
    let token = pollcast_core::auth::create_session_token("google-1", "id-token", SECRET, 600).unwrap();
    format!("Bearer {token}")
}

fn json_request(method: &str, uri: &str, body: Value, auth: bool) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if auth {
        builder = builder.header("authorization", session());
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn read_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn create_lunch_poll() {
    let (app, _) = app().await;
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/polls",
            json!({"prompt": "Lunch?", "options": ["Pizza", "Salad"], "duration": 3600}),
            true,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let poll = read_json(resp).await;
    assert!(!poll["pollId"].as_str().unwrap().is_empty());
    assert_eq!(poll["duration"], 3600);
    assert_eq!(poll["isArchived"], false);
    let options = poll["options"].as_array().unwrap();
    assert_eq!(options.len(), 2);
    assert!(options.iter().all(|o| o["votes"] == 0));
}

#[tokio::test]
async fn create_requires_session() {
    let (app, _) = app().await;
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/polls",
            json!({"prompt": "Lunch?", "options": ["Pizza", "Salad"], "duration": 3600}),
            false,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_reports_validation_issues() {
    let (app, _) = app().await;
    let resp = app
        .oneshot(json_request(
            "POST",
            "/api/polls",
            json!({"prompt": "Lunch?", "options": ["Pizza"], "duration": 3600}),
            true,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = read_json(resp).await;
    assert_eq!(body["message"], "Poll should have at least 2 options");
    assert_eq!(body["statusCode"], 400);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (app, _) = app().await;
    let resp = app
        .oneshot(json_request("POST", "/api/polls", json!({"prompt": 5}), true))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn close_now_is_accepted() {
    let (app, _) = app().await;
    let uri = format!("/api/polls/{POLL_ID}");
    let resp = app
        .oneshot(json_request("PATCH", &uri, json!({"duration": -1}), true))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["duration"], 42);
}

#[tokio::test]
async fn duration_outside_range_is_rejected() {
    let (app, _) = app().await;
    let uri = format!("/api/polls/{POLL_ID}");
    let resp = app
        .clone()
        .oneshot(json_request("PATCH", &uri, json!({"duration": 0}), true))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(json_request("PATCH", &uri, json!({"duration": 5}), true))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        read_json(resp).await["message"],
        "Poll duration should be at least 60 seconds"
    );
}

#[tokio::test]
async fn archive_answers_no_content() {
    let (app, _) = app().await;
    let uri = format!("/api/polls/{POLL_ID}");
    let resp = app
        .oneshot(json_request("DELETE", &uri, json!({"isArchived": true}), true))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn upstream_errors_pass_through() {
    let (app, _) = app().await;
    let req = Request::builder()
        .uri("/api/polls/missing00000")
        .header("authorization", session())
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(read_json(resp).await["message"], "Not found. poll not found");
}

#[tokio::test]
async fn anonymous_get_uses_public_route() {
    let (app, _) = app().await;
    let req = Request::builder()
        .uri("/api/polls/missing00000")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    // The public route has no "missing" poll special case.
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_poll_id_is_bad_request() {
    let (app, _) = app().await;
    let req = Request::builder()
        .uri("/api/polls/NOT-AN-ID")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn signed_in_vote_is_accepted() {
    let (app, _) = app().await;
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/polls/{POLL_ID}/{OPTION_ID}"))
        .header("authorization", session())
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(read_json(resp).await["requestId"], "req-1");
}

#[tokio::test]
async fn failed_vote_is_generic_server_error() {
    let (app, _) = app().await;
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/polls/{POLL_ID}/{OPTION_ID}"))
        .header("cf-connecting-ip", "203.0.113.9")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        read_json(resp).await["message"],
        "An unknown error occurred while voting on the poll."
    );
}

#[tokio::test]
async fn list_my_polls_requires_session() {
    let (app, _) = app().await;
    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/polls").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/polls")
        .header("authorization", session())
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn push_ingest_checks_key_and_topic() {
    let (app, state) = app().await;
    let mut rx = state.topic_bus.register_session("viewer");
    state
        .topic_bus
        .subscribe("viewer", pollcast_models::Topic::poll(POLL_ID));

    let counted = json!({
        "topic": format!("poll/{POLL_ID}"),
        "payload": {
            "type": "voteCounted",
            "data": {
                "pollId": POLL_ID,
                "optionId": OPTION_ID,
                "updatedAt": "2024-03-01T12:10:00Z",
                "votes": 3
            }
        }
    });

    let unkeyed = json_request("POST", "/api/push", counted.clone(), false);
    let resp = app.clone().oneshot(unkeyed).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let mut wrong_topic = counted.clone();
    wrong_topic["topic"] = json!("vote/req-1");
    let mut req = json_request("POST", "/api/push", wrong_topic, false);
    req.headers_mut()
        .insert("x-pollcast-publish-key", PUBLISH_KEY.parse().unwrap());
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let mut req = json_request("POST", "/api/push", counted, false);
    req.headers_mut()
        .insert("x-pollcast-publish-key", PUBLISH_KEY.parse().unwrap());
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    assert_eq!(read_json(resp).await["delivered"], 1);

    let envelope = rx.recv().await.unwrap();
    assert_eq!(envelope.payload.kind(), "voteCounted");
}

#[tokio::test]
async fn public_config_exposes_limits_and_realtime() {
    let (app, _) = app().await;
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/config")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = read_json(resp).await;
    assert_eq!(body["limits"]["max_options"], 10);
    assert_eq!(body["limits"]["nano_id_length"], 12);
    assert_eq!(body["realtime"]["endpoint"], "wss://realtime.example.com/mqtt");
    assert_eq!(body["realtime"]["authorizerName"], "pollcast-authorizer");
}
