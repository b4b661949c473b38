mod common;

use axum::body::to_bytes;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

use seccode_api::models::PlanTier;

#[tokio::test]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_execute_requires_auth() {
    let app = common::create_test_app().await;

    // No Authorization header: must be rejected before any sandbox work
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/execute")
                .header("content-type", "application/json")
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "language": "c",
                        "source": "int main() { return 0; }",
                        "testCases": []
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires MongoDB and Redis (.env.test)"]
async fn test_empty_source_is_rejected() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/execute")
                .header("content-type", "application/json")
                .header(
                    "authorization",
                    common::bearer_token(&user_id, PlanTier::Free),
                )
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "language": "cpp",
                        "source": "",
                        "testCases": []
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "requires MongoDB and Redis (.env.test); expects no sandbox configured"]
async fn test_bare_run_degrades_without_a_runner() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/execute")
                .header("content-type", "application/json")
                .header(
                    "authorization",
                    common::bearer_token(&user_id, PlanTier::Free),
                )
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "language": "c",
                        "source": "int main() { return 0; }",
                        "testCases": []
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    // Degraded, not crashed: a renderable body with a non-success exit code
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["exitCode"], 1);
    assert!(json["stderr"].as_str().unwrap().contains("runner"));
    assert!(json.get("testResults").is_none());
    assert!(json.get("allTestsPassed").is_none());
}

#[tokio::test]
#[ignore = "requires MongoDB and Redis (.env.test); expects no sandbox configured"]
async fn test_graded_submission_never_reports_partial_results_when_runner_is_down() {
    let app = common::create_test_app().await;
    let user_id = format!("test-user-{}", Uuid::new_v4());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/execute")
                .header("content-type", "application/json")
                .header(
                    "authorization",
                    common::bearer_token(&user_id, PlanTier::Free),
                )
                .body(Body::from(
                    serde_json::to_string(&json!({
                        "language": "c",
                        "source": "int main() { return 0; }",
                        "contentSlug": "integer-overflow-check",
                        "contentType": "puzzle",
                        "testCases": [
                            { "input": "2147483647 1", "expectedOutput": "OVERFLOW" },
                            { "input": "100 200", "expectedOutput": "300" }
                        ]
                    }))
                    .unwrap(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["exitCode"], 1);
    assert!(json.get("testResults").is_none());
    assert!(json.get("allTestsPassed").is_none());
}
