#![allow(dead_code)]

use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;
pub mod utils;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // CORS for the web frontend
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any); // TODO: restrict to specific origins in production

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Everything under /api/v1 requires a valid JWT; unauthenticated
        // traffic never reaches the sandbox
        .nest(
            "/api/v1",
            api_routes(app_state.clone())
                .layer(cors)
                .layer(middleware::from_fn_with_state(
                    app_state.clone(),
                    middlewares::auth::auth_middleware,
                )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware)) // Apply CSP to all responses
        .layer(middleware::from_fn(
            middlewares::trace::trace_context_middleware,
        ))
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn api_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    // Sandbox round trips are expensive; the execute route carries its own
    // rate limit on top of auth
    let execute_route = Router::new()
        .route("/execute", post(handlers::execute::execute_code))
        .route_layer(middleware::from_fn_with_state(
            app_state,
            middlewares::rate_limit::submit_rate_limit_middleware,
        ));

    Router::new()
        .merge(execute_route)
        .route("/content/start", post(handlers::content::start_content))
        .route("/usage", get(handlers::content::get_usage))
        .route(
            "/completions",
            get(handlers::completions::list_completions)
                .post(handlers::completions::record_completion),
        )
}
