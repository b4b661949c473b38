use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::extractors::AppJson;
use crate::middlewares::auth::JwtClaims;
use crate::models::usage::UsageKind;
use crate::models::{ContentType, PlanTier};
use crate::services::{
    entitlement_service::{free_limit, EntitlementService},
    usage_service::UsageService,
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartContentRequest {
    pub content_slug: String,
    pub content_type: ContentType,
}

/// POST /api/v1/content/start
///
/// The entitlement gate, consulted before the user may open gated content.
/// An allowed attempt consumes one unit of the week's quota; a blocked
/// attempt has no side effects and returns the payload the UI renders as
/// the upgrade prompt.
pub async fn start_content(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
    AppJson(req): AppJson<StartContentRequest>,
) -> Result<Response, (StatusCode, String)> {
    let kind = req.content_type.usage_kind();
    tracing::info!(
        "Content start requested: user={}, slug={}, kind={:?}",
        claims.sub,
        req.content_slug,
        kind
    );

    let gate = EntitlementService::new(state.mongo.clone());
    let decision = gate
        .check_and_consume(&claims.sub, claims.plan, kind)
        .await
        .map_err(|e| {
            tracing::error!("Entitlement check failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let mut body = serde_json::to_value(&decision)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    if decision.allowed {
        Ok((StatusCode::OK, Json(body)).into_response())
    } else {
        body["limitReached"] = json!(true);
        Ok((StatusCode::FORBIDDEN, Json(body)).into_response())
    }
}

/// GET /api/v1/usage
///
/// Current week's consumption plus the plan limits, for the quota display.
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<JwtClaims>,
) -> Result<Response, (StatusCode, String)> {
    let usage = UsageService::new(state.mongo.clone());
    let counter = usage.get_counter(&claims.sub).await.map_err(|e| {
        tracing::error!("Failed to read usage counter: {}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let limit_of = |kind: UsageKind| -> serde_json::Value {
        match claims.plan {
            PlanTier::Pro => serde_json::Value::Null,
            PlanTier::Free => json!(free_limit(kind)),
        }
    };

    Ok((
        StatusCode::OK,
        Json(json!({
            "weekStart": counter.week_start,
            "plan": claims.plan,
            "puzzles": { "used": counter.puzzles_completed, "limit": limit_of(UsageKind::Puzzles) },
            "labs": { "used": counter.labs_completed, "limit": limit_of(UsageKind::Labs) },
            "projects": { "used": counter.projects_started, "limit": limit_of(UsageKind::Projects) },
        })),
    )
        .into_response())
}
