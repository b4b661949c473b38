mod common;

use axum::body::to_bytes;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::json;
use serial_test::serial;
use tower::ServiceExt;
use uuid::Uuid;

use seccode_api::models::PlanTier;

async fn start_content(
    app: &Router,
    token: &str,
    slug: &str,
    content_type: &str,
) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/content/start")
                .header("content-type", "application/json")
                .header("authorization", token)
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "contentSlug": slug,
                        "contentType": content_type
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_free_user_is_blocked_after_weekly_puzzle_quota() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());
    let token = common::bearer_token(&user_id, PlanTier::Free);

    // 7 puzzles per week are allowed; the check precedes the increment so
    // the 7th start is the last one counted
    for n in 1..=7 {
        let (status, body) = start_content(&app, &token, &format!("puzzle-{}", n), "puzzle").await;
        assert_eq!(status, StatusCode::OK, "start {} should be allowed", n);
        assert_eq!(body["allowed"], true);
        assert_eq!(body["currentUsage"], n);
    }

    // The 8th attempt is blocked with the structured upgrade payload and
    // must not consume anything
    let (status, body) = start_content(&app, &token, "puzzle-8", "puzzle").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["allowed"], false);
    assert_eq!(body["limitReached"], true);
    assert_eq!(body["limitType"], "puzzles");
    assert_eq!(body["currentUsage"], 7);
    assert_eq!(body["limit"], 7);

    // Labs are gated independently of puzzles
    let (status, body) = start_content(&app, &token, "lab-1", "lab").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["allowed"], true);
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_pro_user_bypasses_the_gate_and_is_never_counted() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());
    let token = common::bearer_token(&user_id, PlanTier::Pro);

    for n in 1..=10 {
        let (status, body) = start_content(&app, &token, &format!("puzzle-{}", n), "puzzle").await;
        assert_eq!(status, StatusCode::OK, "pro start {} should be allowed", n);
        assert_eq!(body["allowed"], true);
    }

    // Usage endpoint shows untracked usage and no limits for pro
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/usage")
                .header("authorization", token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["puzzles"]["used"], 0);
    assert!(json["puzzles"]["limit"].is_null());
}

#[tokio::test]
#[serial]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_usage_endpoint_reports_current_week_counts() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());
    let token = common::bearer_token(&user_id, PlanTier::Free);

    let (status, _) = start_content(&app, &token, "project-1", "project").await;
    assert_eq!(status, StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/v1/usage")
                .header("authorization", token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["projects"]["used"], 1);
    assert_eq!(json["projects"]["limit"], 2);
    assert_eq!(json["puzzles"]["used"], 0);
    // Week key is a plain date, comparable as a string
    assert!(json["weekStart"]
        .as_str()
        .unwrap()
        .chars()
        .all(|c| c.is_ascii_digit() || c == '-'));
}
