use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use assessor_server::{create_server, AppState};

fn app() -> Router {
    create_server(AppState::in_memory().unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_reports_enrichment_off() {
    let (status, body) = send(&app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["enrichment"], false);
}

#[tokio::test]
async fn test_talk_rejects_blank_message() {
    let body = json!({ "userId": 1, "message": "   " }).to_string();
    let (status, body) = send(&app(), post_json("/chat/talk", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["message"], "Mensagem obrigatória");
    assert_eq!(body["error"]["details"]["field"], "message");
}

#[tokio::test]
async fn test_talk_rejects_malformed_body() {
    let (status, body) = send(&app(), post_json("/chat/talk", "{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "MALFORMED_BODY");
}

#[tokio::test]
async fn test_talk_rejects_missing_user() {
    let body = json!({ "message": "oi" }).to_string();
    let (status, _) = send(&app(), post_json("/chat/talk", &body)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_talk_returns_turn() {
    let body = json!({ "userId": 7, "message": "Quero dormir melhor" }).to_string();
    let (status, body) = send(&app(), post_json("/chat/talk", &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"]["role"], "assistant");
    assert_eq!(body["updatedHistory"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["futureSuggestions"].as_array().map(Vec::len), Some(3));
    let context = body["contextLog"].as_array().unwrap();
    assert_eq!(context.last().unwrap()["title"], "Estilo");
}

#[tokio::test]
async fn test_feed_limit_bounds() {
    let app = app();
    for uri in [
        "/matching/feed?userId=1&limit=0",
        "/matching/feed?userId=1&limit=51",
    ] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert_eq!(body["error"]["code"], "VAL_003");
    }

    let (status, _) = send(&app, get("/matching/feed?limit=5")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_feed_falls_back_to_synthetic_cards() {
    let (status, body) = send(&app(), get("/matching/feed?userId=1&limit=3")).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert!(!items.is_empty());
    assert!(items.len() <= 3);
    for item in items {
        assert!(item["match"].as_u64().unwrap() <= 100);
        assert!(!item["tags"].as_array().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_interactions() {
    let app = app();

    let bogus = json!({ "userId": 1, "candidateId": 2, "type": "superlike" }).to_string();
    let (status, _) = send(&app, post_json("/matching/interactions", &bogus)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let like = json!({ "userId": 1, "candidateId": 2, "type": "like", "score": 80 }).to_string();
    let (status, body) = send(&app, post_json("/matching/interactions", &like)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], true);

    let own = json!({ "userId": 1, "candidateId": 1, "type": "pass" }).to_string();
    let (status, body) = send(&app, post_json("/matching/interactions", &own)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["recorded"], false);
}

#[tokio::test]
async fn test_check_in_plan() {
    let (status, body) = send(&app(), get("/engagement/checkins?userId=3")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["checkIns"].is_array());
}

#[tokio::test]
async fn test_profiles() {
    let app = app();
    let (status, body) = send(&app, get("/profiles/5")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], 5);

    let (status, body) = send(&app, get("/profiles/0")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["field"], "id");
}

#[tokio::test]
async fn test_timeline_limit_bounds() {
    let app = app();
    for uri in ["/timeline?userId=1&limit=2", "/timeline?userId=1&limit=21"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", uri);
        assert_eq!(body["error"]["code"], "VAL_003");
    }
}

#[tokio::test]
async fn test_timeline_lists_chat_activity() {
    let app = app();
    let talk = json!({ "userId": 4, "message": "Hoje estou animado com o curso" }).to_string();
    let (status, _) = send(&app, post_json("/chat/talk", &talk)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, get("/timeline?userId=4")).await;
    assert_eq!(status, StatusCode::OK);
    let events = body["events"].as_array().unwrap();
    assert!(!events.is_empty());
    assert!(events.len() <= 8);
    assert!(events
        .iter()
        .any(|e| e["description"] == "Hoje estou animado com o curso" && e["mood"] == "energizado"));
    assert!(body["habits"].is_array());
    assert!(!body["emotionalPatterns"]["triggers"].as_array().unwrap().is_empty());
}
