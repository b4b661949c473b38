use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use redis::aio::ConnectionManager;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::services::AppState;

// Submission-specific rate limits. This is an abuse control on request
// volume, independent of the weekly entitlement gate.
const SUBMIT_RATE_LIMIT_PER_USER: u32 = 30; // submissions per minute
const SUBMIT_RATE_LIMIT_PER_IP: u32 = 60; // submissions per minute
const SUBMIT_RATE_WINDOW_SECONDS: u64 = 60;

fn extract_client_ip_from(headers: &HeaderMap, extensions: &axum::http::Extensions) -> String {
    // Preferred order: X-Forwarded-For, Forwarded, X-Real-IP, ConnectInfo
    if let Some(v) = headers.get("x-forwarded-for") {
        if let Ok(s) = v.to_str() {
            // x-forwarded-for can be a comma separated list; take first
            return s.split(',').next().unwrap_or(s).trim().to_string();
        }
    }

    if let Some(v) = headers.get("forwarded") {
        if let Ok(s) = v.to_str() {
            // forwarded: for=1.2.3.4; proto=http; by=...
            for part in s.split(';') {
                let p = part.trim();
                if p.starts_with("for=") {
                    let val = p.trim_start_matches("for=").trim().trim_matches('\"');
                    return val.to_string();
                }
            }
        }
    }

    if let Some(v) = headers.get("x-real-ip") {
        if let Ok(s) = v.to_str() {
            return s.trim().to_string();
        }
    }

    // Fall back to ConnectInfo socket address if available
    if let Some(ci) = extensions.get::<ConnectInfo<SocketAddr>>() {
        return ci.0.ip().to_string();
    }

    "unknown".to_string()
}

/// Rate limit for POST /api/v1/execute: sandbox round trips are the most
/// expensive thing this service does, so both the user and the source IP
/// are capped.
pub async fn submit_rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if std::env::var("RATE_LIMIT_DISABLED").unwrap_or_default() == "1" {
        tracing::debug!("Rate limiting disabled via RATE_LIMIT_DISABLED=1");
        return Ok(next.run(request).await);
    }

    let headers = request.headers();
    let extensions = request.extensions();
    let client_ip = extract_client_ip_from(headers, extensions);

    // Extract user_id from JWT claims if available
    let user_id = request
        .extensions()
        .get::<super::auth::JwtClaims>()
        .map(|claims| claims.sub.clone());

    if let Some(uid) = &user_id {
        // Allow overriding per-user limit via env SUBMIT_RATE_LIMIT_PER_USER
        let user_limit = std::env::var("SUBMIT_RATE_LIMIT_PER_USER")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(SUBMIT_RATE_LIMIT_PER_USER);

        let allowed = check_rate_limit(
            &state.redis,
            &format!("ratelimit:submit:user:{}", uid),
            user_limit,
            SUBMIT_RATE_WINDOW_SECONDS,
        )
        .await
        .map_err(|e| {
            tracing::error!("Rate limit check failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        if !allowed {
            tracing::warn!("Submission rate limit exceeded for user: {}", uid);
            return Err(StatusCode::TOO_MANY_REQUESTS);
        }
    }

    let ip_limit = std::env::var("SUBMIT_RATE_LIMIT_PER_IP")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(SUBMIT_RATE_LIMIT_PER_IP);

    let allowed = check_rate_limit(
        &state.redis,
        &format!("ratelimit:submit:ip:{}", client_ip),
        ip_limit,
        SUBMIT_RATE_WINDOW_SECONDS,
    )
    .await
    .map_err(|e| {
        tracing::error!("Rate limit check failed: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !allowed {
        tracing::warn!("Submission rate limit exceeded for IP: {}", client_ip);
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    Ok(next.run(request).await)
}

/// Check rate limit using Redis with Lua script for atomicity
async fn check_rate_limit(
    redis: &ConnectionManager,
    key: &str,
    limit: u32,
    window_seconds: u64,
) -> anyhow::Result<bool> {
    let mut conn = redis.clone();

    // Lua script for atomic increment with sliding window
    let lua_script = r#"
        local key = KEYS[1]
        local limit = tonumber(ARGV[1])
        local window = tonumber(ARGV[2])

        local current = redis.call('GET', key)

        if current == false then
            redis.call('SET', key, 1, 'EX', window)
            return 1
        end

        current = tonumber(current)

        if current >= limit then
            return 0
        end

        redis.call('INCR', key)
        return 1
    "#;

    let allowed: u32 = redis::Script::new(lua_script)
        .key(key)
        .arg(limit)
        .arg(window_seconds)
        .invoke_async(&mut conn)
        .await?;

    Ok(allowed == 1)
}
