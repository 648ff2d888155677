use axum::body::Body;
use axum::http::{Request, StatusCode};
use scriptorium::config::Config;
use scriptorium::{api, AppState};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> axum::Router {
    let state = Arc::new(AppState::new(Config::default()));
    api::build_router(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let response = app()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn creating_a_note_then_publishing_round_trips_through_http() {
    let router = app();

    let create_req = Request::builder()
        .method("POST")
        .uri("/notes")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"title": "First Note", "initial_content": "# Heading\n\nHello."}).to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(create_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let note = json_body(response).await;
    let note_id = note["id"].as_str().unwrap().to_string();

    let collection_req = Request::builder()
        .method("POST")
        .uri("/collections")
        .header("content-type", "application/json")
        .body(Body::from(json!({"name": "engineering", "description": null}).to_string()))
        .unwrap();
    let response = router.clone().oneshot(collection_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let collection = json_body(response).await;
    let collection_id = collection["id"].as_str().unwrap().to_string();

    let publish_req = Request::builder()
        .method("POST")
        .uri("/publish")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "note_id": note_id,
                "collections": [collection_id],
                "label": null,
                "client_token": "http-test-token",
            })
            .to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(publish_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let published = json_body(response).await;
    assert!(published["version_id"].as_str().is_some());

    let versions_req = Request::builder()
        .uri(format!("/notes/{note_id}/versions"))
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(versions_req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["versions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn fetching_a_missing_version_returns_404() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/versions/ver_0000000000000000000000000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert_eq!(body["error"]["type"], "NotFound");
}
