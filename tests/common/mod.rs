#![allow(dead_code)]

use axum::Router;
use std::sync::Arc;

use seccode_api::middlewares::auth::{JwtClaims, JwtService};
use seccode_api::models::PlanTier;
use seccode_api::{config::Config, create_router, services::AppState};

pub async fn create_test_app() -> Router {
    // Initialize tracing for tests
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    // Load test environment from .env.test
    dotenvy::from_filename(".env.test").ok();

    // Load test configuration
    let config = Config::load().expect("Failed to load test configuration");

    // Connect to test databases
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("Failed to connect to test MongoDB");

    let redis_client =
        redis::Client::open(config.redis_uri.clone()).expect("Failed to create test Redis client");

    // Create app state (connection is established inside)
    let app_state = Arc::new(
        AppState::new(config, mongo_client, redis_client)
            .await
            .expect("Failed to initialize test app state"),
    );

    // Build test router (same as main app)
    create_router(app_state)
}

/// Bearer token for a test user, signed with the test JWT secret.
pub fn bearer_token(user_id: &str, plan: PlanTier) -> String {
    dotenvy::from_filename(".env.test").ok();
    let config = Config::load().expect("Failed to load test configuration");
    let service = JwtService::new(&config.jwt_secret);

    let now = chrono::Utc::now().timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        plan,
        exp: (now + 3600) as usize,
        iat: now as usize,
    };

    let token = service
        .generate_token(claims)
        .expect("Failed to sign test token");
    format!("Bearer {}", token)
}
