mod common;

use axum::body::to_bytes;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use seccode_api::models::PlanTier;

async fn record_completion(
    app: &Router,
    token: &str,
    slug: &str,
    content_type: &str,
) -> StatusCode {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/completions")
                .header("content-type", "application/json")
                .header("authorization", token)
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "contentSlug": slug,
                        "contentType": content_type,
                        "success": true
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap()
        .status()
}

async fn list_completions(app: &Router, token: &str) -> Vec<serde_json::Value> {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/completions")
                .header("authorization", token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_recording_the_same_completion_twice_keeps_one_row() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());
    let token = common::bearer_token(&user_id, PlanTier::Free);

    // Two completions of the same lab: upsert, never a duplicate
    assert_eq!(
        record_completion(&app, &token, "use-after-free-lab", "lab").await,
        StatusCode::CREATED
    );
    assert_eq!(
        record_completion(&app, &token, "use-after-free-lab", "lab").await,
        StatusCode::CREATED
    );

    let completions = list_completions(&app, &token).await;
    let matching: Vec<_> = completions
        .iter()
        .filter(|c| c["content_slug"] == "use-after-free-lab")
        .collect();

    assert_eq!(matching.len(), 1, "upsert must keep a single row");
    assert_eq!(matching[0]["success"], true);
    assert_eq!(matching[0]["content_type"], "lab");
}

#[tokio::test]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_puzzle_completions_cannot_be_recorded_directly() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());
    let token = common::bearer_token(&user_id, PlanTier::Free);

    assert_eq!(
        record_completion(&app, &token, "format-string-puzzle", "puzzle").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_completions_are_scoped_to_the_requesting_user() {
    let app = common::create_test_app().await;
    let user_a = format!("test-user-{}", Uuid::new_v4());
    let user_b = format!("test-user-{}", Uuid::new_v4());
    let token_a = common::bearer_token(&user_a, PlanTier::Free);
    let token_b = common::bearer_token(&user_b, PlanTier::Free);

    assert_eq!(
        record_completion(&app, &token_a, "double-free-project", "project").await,
        StatusCode::CREATED
    );

    let completions_b = list_completions(&app, &token_b).await;
    assert!(completions_b
        .iter()
        .all(|c| c["content_slug"] != "double-free-project"));
}
